use std::fmt;

use jit_resolver::{ResolveError, SignatureError};

/// Why a log unit could not be applied to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    MissingAttribute { tag: String, attribute: &'static str },
    Signature(SignatureError),
    /// The member's class could not be loaded; the unit is dropped.
    UnresolvedClass { class: String, error: ResolveError },
    /// The class loaded but none of its members matched.
    MemberNotFound { signature: String },
    UnknownCompileId(String),
}

impl ModelError {
    /// Resolution misses are expected in partial class paths and are not
    /// reported as parse errors.
    pub fn is_resolution_miss(&self) -> bool {
        matches!(
            self,
            ModelError::UnresolvedClass { .. } | ModelError::MemberNotFound { .. } | ModelError::UnknownCompileId(_)
        )
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::MissingAttribute { tag, attribute } => {
                write!(f, "<{}> is missing attribute '{}'", tag, attribute)
            }
            ModelError::Signature(e) => write!(f, "{}", e),
            ModelError::UnresolvedClass { class, error } => {
                write!(f, "class {} unavailable: {}", class, error)
            }
            ModelError::MemberNotFound { signature } => write!(f, "no member matches {}", signature),
            ModelError::UnknownCompileId(id) => write!(f, "no member recorded for compile_id {}", id),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Signature(e) => Some(e),
            ModelError::UnresolvedClass { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<SignatureError> for ModelError {
    fn from(e: SignatureError) -> Self {
        ModelError::Signature(e)
    }
}
