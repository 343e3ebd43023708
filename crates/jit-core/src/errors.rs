use std::fmt;

use jit_model::{MemberId, ModelError};

/// A log unit that could not be applied. Parsing continues with the next unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogParseError {
    Unit {
        line: usize,
        tag: String,
        error: ModelError,
    },
    /// A task's top-level `parse` refers to a method id its dictionary lacks.
    MissingDictionaryId {
        line: usize,
        compile_id: String,
        missing: String,
    },
}

impl fmt::Display for LogParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogParseError::Unit { line, tag, error } => {
                write!(f, "line {}: <{}> not applied: {}", line, tag, error)
            }
            LogParseError::MissingDictionaryId {
                line,
                compile_id,
                missing,
            } => write!(
                f,
                "line {}: task {} references undefined dictionary id {}",
                line, compile_id, missing
            ),
        }
    }
}

impl std::error::Error for LogParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LogParseError::Unit { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Why a member's bytecode could not be annotated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    UnknownMember(MemberId),
    NoCompilation { member: String, index: usize },
    /// The compilation has no `task` with parse tags.
    NoTask { member: String, compile_id: String },
    BytecodeUnavailable { class: String },
    MemberBytecodeMissing { member: String },
    /// A log decision points at an instruction that cannot carry it.
    SanityCheck {
        member: String,
        bci: u32,
        instruction: String,
        tag: String,
        expected: &'static str,
    },
}

impl fmt::Display for AnnotationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationError::UnknownMember(id) => write!(f, "unknown member {}", id.0),
            AnnotationError::NoCompilation { member, index } => {
                write!(f, "{} has no compilation #{}", member, index)
            }
            AnnotationError::NoTask { member, compile_id } => {
                write!(f, "{} compile {} has no task in the log", member, compile_id)
            }
            AnnotationError::BytecodeUnavailable { class } => {
                write!(f, "bytecode for {} is unavailable", class)
            }
            AnnotationError::MemberBytecodeMissing { member } => {
                write!(f, "no bytecode found for {}", member)
            }
            AnnotationError::SanityCheck {
                member,
                bci,
                instruction,
                tag,
                expected,
            } => write!(
                f,
                "{}: <{}> at bci {} expects {} but found '{}'",
                member, tag, bci, expected, instruction
            ),
        }
    }
}

impl std::error::Error for AnnotationError {}
