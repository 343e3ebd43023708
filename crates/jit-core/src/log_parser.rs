//! HotSpot LogCompilation driver.
//!
//! Reads a log line by line, frames units with a [`TagProcessor`] and routes
//! each completed unit into the [`JitDataModel`]. A unit that cannot be
//! applied is reported through [`JitListener::on_error`] and parsing goes on.
//! A `<fragment>` marker ends the parse with the partial model intact.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use jit_model::{CodeCacheEventKind, JitDataModel, ModelError, VmVersion};
use jit_resolver::{ClassResolver, MemberSignatureParts, SignatureError};
use jit_tags::names::{
    ATTR_COMPILE_ID, ATTR_METHOD, TAG_CODE_CACHE, TAG_CODE_CACHE_FULL, TAG_MAKE_NOT_ENTRANT, TAG_NMETHOD,
    TAG_SWEEPER, TAG_TASK, TAG_TASK_QUEUED, TAG_UNCOMMON_TRAP, TAG_VM_VERSION,
};
use jit_tags::{Tag, TagProcessor};

use crate::errors::LogParseError;
use crate::journal::{dictionary_of, parse_tags};
use crate::session::ParseSession;

/// Wrapper lines that enclose units but are not units themselves.
const CONTAINER_PREFIXES: &[&str] = &[
    "<hotspot_log",
    "</hotspot_log>",
    "<tty>",
    "</tty>",
    "<tty_done",
    "<compilation_log",
    "</compilation_log>",
    "<destroy_vm",
];

/// Parse progress callbacks, invoked on the parsing thread.
pub trait JitListener: Send + Sync {
    fn on_log_message(&self, _message: &str) {}
    fn on_error(&self, _error: &LogParseError) {}
    fn on_read_complete(&self, _outcome: &ParseOutcome) {}
    fn on_fragment_detected(&self) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl JitListener for NoopListener {}

/// Summary of one parse run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseOutcome {
    pub lines: usize,
    /// Completed top-level units.
    pub units: usize,
    /// Units reported through [`JitListener::on_error`].
    pub errors: usize,
    /// Units with no handler.
    pub skipped: usize,
    /// Units dropped because their class or member could not be resolved.
    pub unresolved: usize,
    /// Class-load notification lines seen.
    pub class_loads: usize,
    /// The log ended in a fragment or an unclosed unit.
    pub truncated: bool,
    /// The stop signal ended the parse early.
    pub stopped: bool,
}

/// Class name from a `-verbose:class` line, JDK 8 or unified-logging style.
pub fn parse_class_load_line(line: &str) -> Option<&str> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("[Loaded ") {
        return rest.split_whitespace().next().map(|name| name.trim_end_matches(']'));
    }
    let (_, rest) = line.split_once("][class,load] ")?;
    rest.split_whitespace().next()
}

fn is_container_line(line: &str) -> bool {
    CONTAINER_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

pub struct HotSpotLogParser {
    model: Arc<JitDataModel>,
    session: Arc<ParseSession>,
    processor: TagProcessor,
}

impl HotSpotLogParser {
    pub fn new(model: Arc<JitDataModel>, session: Arc<ParseSession>) -> Self {
        Self {
            model,
            session,
            processor: TagProcessor::new(),
        }
    }

    pub fn parse_file(&mut self, path: &Path, stop: &AtomicBool, listener: &dyn JitListener) -> Result<ParseOutcome> {
        let file = File::open(path).with_context(|| format!("failed to open log {}", path.display()))?;
        info!(path = %path.display(), "parsing log");
        listener.on_log_message(&format!("Reading {}", path.display()));
        self.parse_reader(BufReader::new(file), stop, listener)
            .with_context(|| format!("failed to read log {}", path.display()))
    }

    /// Parse until EOF, a fragment marker or the stop signal.
    pub fn parse_reader<R: BufRead>(&mut self, reader: R, stop: &AtomicBool, listener: &dyn JitListener) -> Result<ParseOutcome> {
        self.processor.reset();
        let resolver = self.session.resolver();
        let mut outcome = ParseOutcome::default();

        for (index, raw) in reader.split(b'\n').enumerate() {
            if stop.load(Ordering::Relaxed) {
                info!(line = index + 1, "parse stopped");
                outcome.stopped = true;
                break;
            }
            let raw = raw.with_context(|| format!("I/O error at line {}", index + 1))?;
            outcome.lines += 1;
            let line = String::from_utf8_lossy(&raw);
            self.process_line(index + 1, line.trim(), resolver.as_ref(), listener, &mut outcome);

            if self.processor.is_fragment() {
                info!(line = index + 1, "fragment marker; log is truncated");
                outcome.truncated = true;
                listener.on_fragment_detected();
                break;
            }
        }

        if !outcome.truncated && !outcome.stopped && self.processor.has_open_tag() {
            let open = self.processor.top_tag().map(|t| t.name().to_string()).unwrap_or_default();
            info!(tag = %open, "log ended inside an open unit");
            outcome.truncated = true;
        }

        info!(
            lines = outcome.lines,
            units = outcome.units,
            errors = outcome.errors,
            unresolved = outcome.unresolved,
            "parse finished"
        );
        listener.on_read_complete(&outcome);
        Ok(outcome)
    }

    fn process_line(
        &mut self,
        number: usize,
        line: &str,
        resolver: &dyn ClassResolver,
        listener: &dyn JitListener,
        outcome: &mut ParseOutcome,
    ) {
        if line.is_empty() || is_container_line(line) {
            return;
        }
        if let Some(class) = parse_class_load_line(line) {
            outcome.class_loads += 1;
            if let Err(e) = self.model.build_meta_class(class, resolver) {
                debug!(class, error = %e, "loaded class not resolvable");
            }
            return;
        }

        for unit in self.processor.process_line(line) {
            outcome.units += 1;
            trace!(line = number, tag = %unit.name(), "unit complete");
            match self.route(number, unit, resolver) {
                Ok(true) => {}
                Ok(false) => outcome.skipped += 1,
                Err(RouteError::Unresolved(e)) => {
                    debug!(line = number, error = %e, "unit dropped");
                    outcome.unresolved += 1;
                }
                Err(RouteError::Parse(e)) => {
                    warn!(error = %e, "log unit not applied");
                    outcome.errors += 1;
                    listener.on_error(&e);
                }
            }
        }
    }

    /// Apply one unit. `Ok(false)` means the unit has no handler.
    fn route(&self, line: usize, unit: Tag, resolver: &dyn ClassResolver) -> Result<bool, RouteError> {
        let name = unit.name().to_string();
        let wrap = |error: ModelError| {
            if error.is_resolution_miss() {
                RouteError::Unresolved(error)
            } else {
                RouteError::Parse(LogParseError::Unit {
                    line,
                    tag: name.clone(),
                    error,
                })
            }
        };

        match name.as_str() {
            TAG_VM_VERSION => self.model.set_vm_version(VmVersion::from_tag(&unit)),
            TAG_TASK_QUEUED => {
                self.model.record_task_queued(Arc::new(unit), resolver).map_err(wrap)?;
            }
            TAG_NMETHOD => {
                self.model.record_nmethod(Arc::new(unit), resolver).map_err(wrap)?;
            }
            TAG_TASK => {
                check_task_dictionary(line, &unit).map_err(RouteError::Parse)?;
                self.model.record_task(Arc::new(unit), resolver).map_err(wrap)?;
            }
            TAG_CODE_CACHE => self.model.record_code_cache_sample(&unit, CodeCacheEventKind::Sample),
            TAG_SWEEPER => self.model.record_code_cache_sample(&unit, CodeCacheEventKind::Sweeper),
            TAG_CODE_CACHE_FULL => self.model.record_code_cache_sample(&unit, CodeCacheEventKind::CacheFull),
            TAG_MAKE_NOT_ENTRANT | TAG_UNCOMMON_TRAP if unit.attribute(ATTR_COMPILE_ID).is_none() => {
                return Ok(false);
            }
            TAG_MAKE_NOT_ENTRANT => {
                self.model.record_make_not_entrant(Arc::new(unit)).map_err(wrap)?;
            }
            TAG_UNCOMMON_TRAP => {
                self.model.record_for_compile_id(Arc::new(unit)).map_err(wrap)?;
            }
            other => {
                debug!(tag = other, "no handler for unit");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

enum RouteError {
    Unresolved(ModelError),
    Parse(LogParseError),
}

/// Every top-level `parse` must name a method the task's dictionary defines
/// completely.
fn check_task_dictionary(line: usize, task: &Tag) -> Result<(), LogParseError> {
    let dictionary = dictionary_of(task);
    let compile_id = task.attribute(ATTR_COMPILE_ID).unwrap_or_default().to_string();
    for parse in parse_tags(task) {
        let Some(id) = parse.attribute(ATTR_METHOD) else {
            continue;
        };
        let missing = match dictionary.method(id) {
            None => Some(id.to_string()),
            Some(method) => match MemberSignatureParts::from_dictionary_method(method, &dictionary) {
                Err(SignatureError::MissingDictionaryId { missing, .. }) => Some(missing),
                _ => None,
            },
        };
        if let Some(missing) = missing {
            return Err(LogParseError::MissingDictionaryId {
                line,
                compile_id,
                missing,
            });
        }
    }
    Ok(())
}

// ============================================================================
// Background processing
// ============================================================================

/// Owns the single background parse thread.
pub struct LogProcessor {
    model: Arc<JitDataModel>,
    session: Arc<ParseSession>,
    listener: Arc<dyn JitListener>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<ParseOutcome>>>,
}

impl LogProcessor {
    pub fn new(model: Arc<JitDataModel>, session: Arc<ParseSession>, listener: Arc<dyn JitListener>) -> Self {
        Self {
            model,
            session,
            listener,
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Stop any running parse, reset the model and parse `path` on a new thread.
    pub fn start(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        if let Some(Err(e)) = self.stop() {
            debug!(error = %e, "previous parse ended with an error");
        }
        self.model.reset();
        self.stop.store(false, Ordering::SeqCst);

        let path = path.into();
        let model = Arc::clone(&self.model);
        let session = Arc::clone(&self.session);
        let listener = Arc::clone(&self.listener);
        let stop = Arc::clone(&self.stop);
        let handle = thread::Builder::new()
            .name("jit-log-parser".to_string())
            .spawn(move || {
                let mut parser = HotSpotLogParser::new(model, session);
                parser.parse_file(&path, &stop, listener.as_ref())
            })
            .context("failed to spawn log parser thread")?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Signal the running parse to stop and wait for it.
    pub fn stop(&mut self) -> Option<Result<ParseOutcome>> {
        self.stop.store(true, Ordering::SeqCst);
        self.join()
    }

    /// Wait for the running parse to finish on its own.
    pub fn wait(&mut self) -> Option<Result<ParseOutcome>> {
        self.join()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn model(&self) -> &Arc<JitDataModel> {
        &self.model
    }

    fn join(&mut self) -> Option<Result<ParseOutcome>> {
        let handle = self.handle.take()?;
        Some(
            handle
                .join()
                .unwrap_or_else(|_| Err(anyhow!("log parser thread panicked"))),
        )
    }
}

impl Drop for LogProcessor {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
