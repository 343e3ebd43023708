//! Log driver, bytecode annotation and journal queries over the JIT model.
//!
//! [`HotSpotLogParser`] feeds a LogCompilation file into a
//! [`jit_model::JitDataModel`]; [`LogProcessor`] runs it on a background
//! thread. Once a log is loaded, [`BytecodeAnnotationBuilder`] correlates a
//! member's last compile task with its javap bytecode, and the finders answer
//! narrower questions about the same task.

pub mod annotation;
pub mod config;
pub mod errors;
pub mod finders;
pub mod journal;
pub mod log_parser;
pub mod report;
pub mod session;

pub use annotation::{
    elimination_shape, BCAnnotationType, BytecodeAnnotationBuilder, BytecodeAnnotations, EliminationShape,
    LineAnnotation, ELIMINATION_SHAPES,
};
pub use config::JitConfig;
pub use errors::{AnnotationError, LogParseError};
pub use finders::{intrinsics_by_member, InlineDecision, InliningFinder, IntrinsicFinder, TrapInfo, UncommonTrapFinder};
pub use journal::{last_task, parse_tags, visit_parse_tags_of_last_task, JournalVisitable};
pub use log_parser::{parse_class_load_line, HotSpotLogParser, JitListener, LogProcessor, NoopListener, ParseOutcome};
pub use report::{build_report, render_json, render_table, ReportRow};
pub use session::ParseSession;
