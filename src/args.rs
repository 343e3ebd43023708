use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "jitscope",
    author,
    version,
    about = "HotSpot LogCompilation analyser",
    long_about = "Reads a -XX:+LogCompilation file, resolves the compiled members against a class path \
                  and correlates the compiler's decisions with javap bytecode."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Class directory or jar; repeat or use the platform path separator
    #[arg(long, global = true, value_name = "PATH", value_delimiter = path_separator())]
    pub classpath: Vec<PathBuf>,

    /// javap executable used for bytecode disassembly
    #[arg(long, global = true, value_name = "PATH")]
    pub javap: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// One row per resolved member with its latest compilation
    Report(ReportCmd),

    /// Bytecode of one member annotated with the JIT's decisions
    Annotate(AnnotateCmd),

    /// Intrinsics used by each compiled member
    Intrinsics(LogArg),

    /// Aggregate compilation statistics and parse summary
    Stats(LogArg),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Report(_) => "report",
            Commands::Annotate(_) => "annotate",
            Commands::Intrinsics(_) => "intrinsics",
            Commands::Stats(_) => "stats",
        }
    }

    pub fn log(&self) -> &PathBuf {
        match self {
            Commands::Report(cmd) => &cmd.log.log,
            Commands::Annotate(cmd) => &cmd.log.log,
            Commands::Intrinsics(cmd) | Commands::Stats(cmd) => &cmd.log,
        }
    }
}

#[derive(Debug, Args)]
pub struct LogArg {
    /// HotSpot compilation log
    pub log: PathBuf,
}

#[derive(Debug, Args)]
pub struct ReportCmd {
    #[command(flatten)]
    pub log: LogArg,

    /// Only members with an emitted nmethod
    #[arg(long)]
    pub compiled_only: bool,
}

#[derive(Debug, Args)]
pub struct AnnotateCmd {
    #[command(flatten)]
    pub log: LogArg,

    /// Member in log form, e.g. "java/lang/String hashCode ()I"
    #[arg(long, conflicts_with = "compile_id", required_unless_present = "compile_id")]
    pub member: Option<String>,

    /// Member owning this compile id
    #[arg(long)]
    pub compile_id: Option<String>,

    /// Compilation index within the member; defaults to the latest
    #[arg(long)]
    pub index: Option<usize>,
}

const fn path_separator() -> char {
    if cfg!(windows) {
        ';'
    } else {
        ':'
    }
}
