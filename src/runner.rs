//! Subcommand execution.
//!
//! Every command loads the log through a [`LogProcessor`] first, then renders
//! its view of the model as text or JSON. Rendering returns a `String` so the
//! binary decides where output goes.

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use jit_core::{
    build_report, intrinsics_by_member, render_json, render_table, BytecodeAnnotationBuilder, JitConfig,
    JitListener, LineAnnotation, LogProcessor, ParseOutcome, ParseSession,
};
use jit_model::{JitDataModel, JitStats, MemberId, VmVersion};

use crate::args::{AnnotateCmd, Cli, Commands, ReportCmd};

/// Config file (if any), then environment, then command-line flags.
pub fn resolve_config(cli: &Cli) -> Result<JitConfig> {
    let mut config = match &cli.config {
        Some(path) => JitConfig::load(path)?,
        None => JitConfig::from_env(),
    };
    if !cli.classpath.is_empty() {
        config = config.with_class_locations(cli.classpath.clone());
    }
    if let Some(javap) = &cli.javap {
        config.javap_path = javap.clone();
    }
    Ok(config)
}

/// Surfaces parse progress through `tracing`.
struct TracingListener;

impl JitListener for TracingListener {
    fn on_log_message(&self, message: &str) {
        info!("{}", message);
    }

    fn on_fragment_detected(&self) {
        warn!("log is truncated; results are partial");
    }
}

pub struct LoadedLog {
    pub model: Arc<JitDataModel>,
    pub session: Arc<ParseSession>,
    pub outcome: ParseOutcome,
}

/// Parse `path` on the background parser thread and wait for it.
pub fn load_log(session: Arc<ParseSession>, path: &Path) -> Result<LoadedLog> {
    let model = Arc::new(JitDataModel::new());
    let mut processor = LogProcessor::new(Arc::clone(&model), Arc::clone(&session), Arc::new(TracingListener));
    processor.start(path)?;
    let outcome = processor
        .wait()
        .ok_or_else(|| anyhow!("log parser did not start"))??;
    Ok(LoadedLog {
        model,
        session,
        outcome,
    })
}

pub fn run(cli: &Cli, config: JitConfig) -> Result<String> {
    let session = Arc::new(ParseSession::new(config));
    let loaded = load_log(session, cli.command.log())?;
    info!(command = cli.command.name(), "rendering");
    match &cli.command {
        Commands::Report(cmd) => report(&loaded, cmd, cli.json),
        Commands::Annotate(cmd) => annotate(&loaded, cmd, cli.json),
        Commands::Intrinsics(_) => intrinsics(&loaded, cli.json),
        Commands::Stats(_) => stats(&loaded, cli.json),
    }
}

pub fn report(loaded: &LoadedLog, cmd: &ReportCmd, json: bool) -> Result<String> {
    let rows = build_report(&loaded.model, cmd.compiled_only);
    if json {
        render_json(&rows)
    } else {
        Ok(render_table(&rows))
    }
}

// ============================================================================
// Annotate
// ============================================================================

#[derive(Debug, Serialize)]
struct AnnotatedInstruction {
    offset: u32,
    instruction: String,
    annotations: Vec<LineAnnotation>,
}

#[derive(Debug, Serialize)]
struct AnnotatedMember {
    class: String,
    member: String,
    compile_id: String,
    compiler: Option<String>,
    mismatch: bool,
    instructions: Vec<AnnotatedInstruction>,
}

fn select_member(loaded: &LoadedLog, cmd: &AnnotateCmd) -> Result<MemberId> {
    match (&cmd.member, &cmd.compile_id) {
        (_, Some(compile_id)) => loaded
            .model
            .member_for_compile_id(compile_id)
            .ok_or_else(|| anyhow!("no member recorded for compile id {}", compile_id)),
        (Some(signature), None) => loaded
            .model
            .find_member_by_log_signature(signature, loaded.session.resolver().as_ref())
            .map_err(|e| anyhow!("member '{}' not found: {}", signature, e)),
        (None, None) => bail!("either --member or --compile-id is required"),
    }
}

pub fn annotate(loaded: &LoadedLog, cmd: &AnnotateCmd, json: bool) -> Result<String> {
    let member_id = select_member(loaded, cmd)?;
    let member = loaded
        .model
        .member(member_id)
        .ok_or_else(|| anyhow!("member {} vanished from the model", member_id.0))?;
    let index = match cmd.index {
        Some(index) => index,
        None => member
            .compilations()
            .len()
            .checked_sub(1)
            .ok_or_else(|| anyhow!("{} was never compiled", member.signature()))?,
    };

    let resolver = loaded.session.resolver();
    let provider = loaded.session.bytecode_provider();
    let mut builder = BytecodeAnnotationBuilder::new();
    let annotations = builder
        .build_for_member(&loaded.model, member_id, index, resolver.as_ref(), provider.as_ref())
        .with_context(|| format!("failed to annotate {}", member.signature()))?;

    let bytecode = loaded
        .model
        .class_bytecode(member.class_id(), provider.as_ref())
        .and_then(|class| class.member_bytecode(member.signature(), resolver.as_ref()).cloned())
        .ok_or_else(|| anyhow!("bytecode for {} is unavailable", member.signature()))?;

    let compilation = &member.compilations()[index];
    let annotated = AnnotatedMember {
        class: member.signature().class_name.clone(),
        member: member.signature().to_string(),
        compile_id: compilation.compile_id.clone(),
        compiler: compilation.compiler.clone(),
        mismatch: annotations.is_mismatch(),
        instructions: bytecode
            .instructions
            .iter()
            .map(|instruction| AnnotatedInstruction {
                offset: instruction.offset,
                instruction: instruction.to_string(),
                annotations: annotations.annotations_at(instruction.offset).to_vec(),
            })
            .collect(),
    };

    if json {
        return serde_json::to_string_pretty(&annotated).context("failed to serialise annotations");
    }

    let mut out = String::new();
    writeln!(
        out,
        "{} {}  [compile {}, {}]",
        annotated.class,
        annotated.member,
        annotated.compile_id,
        annotated.compiler.as_deref().unwrap_or("?")
    )?;
    if annotated.mismatch {
        writeln!(out, "  warning: log and class file disagree; annotations are partial")?;
    }
    for instruction in &annotated.instructions {
        writeln!(out, "  {}", instruction.instruction)?;
        for annotation in &instruction.annotations {
            writeln!(
                out,
                "        [{}] {}",
                annotation.annotation_type,
                annotation.text.replace('\n', "; ")
            )?;
        }
    }
    Ok(out)
}

// ============================================================================
// Intrinsics and stats
// ============================================================================

#[derive(Debug, Serialize)]
struct MemberIntrinsics {
    class: String,
    member: String,
    intrinsics: BTreeMap<String, String>,
}

pub fn intrinsics(loaded: &LoadedLog, json: bool) -> Result<String> {
    let members = loaded.model.compiled_members();
    let by_id: BTreeMap<MemberId, _> = members.iter().map(|(id, m)| (*id, m)).collect();
    let found: Vec<MemberIntrinsics> = intrinsics_by_member(&members)
        .into_iter()
        .filter_map(|(id, intrinsics)| {
            let member = by_id.get(&id)?;
            Some(MemberIntrinsics {
                class: member.signature().class_name.clone(),
                member: member.signature().to_string(),
                intrinsics,
            })
        })
        .collect();

    if json {
        return serde_json::to_string_pretty(&found).context("failed to serialise intrinsics");
    }
    let mut out = String::new();
    for entry in &found {
        writeln!(out, "{} {}", entry.class, entry.member)?;
        for (id, target) in &entry.intrinsics {
            writeln!(out, "  {} -> {}", id, target)?;
        }
    }
    if found.is_empty() {
        writeln!(out, "no intrinsics found")?;
    }
    Ok(out)
}

#[derive(Debug, Serialize)]
struct StatsView<'a> {
    parse: &'a ParseOutcome,
    vm: Option<VmVersion>,
    stats: JitStats,
    events: usize,
    code_cache_events: usize,
}

pub fn stats(loaded: &LoadedLog, json: bool) -> Result<String> {
    let view = StatsView {
        parse: &loaded.outcome,
        vm: loaded.model.vm_version(),
        stats: loaded.model.stats(),
        events: loaded.model.events().len(),
        code_cache_events: loaded.model.code_cache_events().len(),
    };
    if json {
        return serde_json::to_string_pretty(&view).context("failed to serialise stats");
    }

    let parse = view.parse;
    let stats = &view.stats;
    let mut out = String::new();
    if let Some(release) = view.vm.as_ref().and_then(|vm| vm.release.as_deref()) {
        writeln!(out, "VM release:        {}", release)?;
    }
    writeln!(out, "Lines read:        {}", parse.lines)?;
    writeln!(out, "Units:             {}", parse.units)?;
    writeln!(out, "Unit errors:       {}", parse.errors)?;
    writeln!(out, "Unresolved units:  {}", parse.unresolved)?;
    if parse.truncated {
        writeln!(out, "Log truncated:     yes")?;
    }
    writeln!(out, "Classes loaded:    {}", stats.classes_loaded)?;
    writeln!(out, "Compiled (C1/C2):  {}/{}", stats.count_c1, stats.count_c2)?;
    writeln!(out, "OSR / C2N:         {}/{}", stats.count_osr, stats.count_c2n)?;
    writeln!(out, "Native bytes:      {}", stats.total_native_bytes)?;
    writeln!(out, "Compile time ms:   {}", stats.total_compile_time_ms)?;
    writeln!(out, "Max compile ms:    {}", stats.max_compile_time_ms)?;
    if let Some(average) = stats.average_compile_time_ms() {
        writeln!(out, "Avg compile ms:    {}", average)?;
    }
    writeln!(out, "Timeline events:   {}", view.events)?;
    writeln!(out, "Code cache events: {}", view.code_cache_events)?;
    Ok(out)
}
