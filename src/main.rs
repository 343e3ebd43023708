//! jitscope CLI
//!
//! ```bash
//! # Tabular member report
//! jitscope --classpath target/classes report hotspot_pid4242.log
//!
//! # Annotated bytecode of one member's latest compilation
//! jitscope --classpath target/classes annotate hotspot.log --member "com/example/Widget spin (I)I"
//!
//! # Aggregate statistics as JSON
//! jitscope --json stats hotspot.log
//! ```

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use jitscope::args::Cli;
use jitscope::runner;

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = runner::resolve_config(&cli)?;
    init_tracing(&config.log_level);

    let output = runner::run(&cli, config)?;
    print!("{}", output);
    Ok(())
}
