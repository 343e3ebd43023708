//! Error types for signature parsing, class-file decoding and class resolution.

use std::fmt;

use jit_types::DescriptorError;

/// A member signature could not be turned into [`MemberSignatureParts`](crate::MemberSignatureParts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// Text did not have the expected `class name (params)return` shape.
    Malformed { text: String, reason: String },
    /// A `method` tag referenced an id missing from its task dictionary.
    MissingDictionaryId { method_id: String, missing: String },
    Descriptor(DescriptorError),
}

impl SignatureError {
    pub fn malformed(text: impl Into<String>, reason: impl Into<String>) -> Self {
        SignatureError::Malformed {
            text: text.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureError::Malformed { text, reason } => {
                write!(f, "malformed signature '{}': {}", text, reason)
            }
            SignatureError::MissingDictionaryId { method_id, missing } => write!(
                f,
                "method {} references id {} which is not defined in its task",
                method_id, missing
            ),
            SignatureError::Descriptor(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SignatureError {}

impl From<DescriptorError> for SignatureError {
    fn from(e: DescriptorError) -> Self {
        SignatureError::Descriptor(e)
    }
}

/// Malformed `.class` file contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassParseError {
    UnexpectedEof,
    InvalidMagic,
    UnsupportedConstant { tag: u8 },
    InvalidConstantIndex { index: u16 },
    InvalidDescriptor(String),
}

impl fmt::Display for ClassParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassParseError::UnexpectedEof => write!(f, "unexpected end of class file"),
            ClassParseError::InvalidMagic => write!(f, "invalid class file magic header"),
            ClassParseError::UnsupportedConstant { tag } => {
                write!(f, "unsupported constant pool tag {}", tag)
            }
            ClassParseError::InvalidConstantIndex { index } => {
                write!(f, "invalid constant pool index {}", index)
            }
            ClassParseError::InvalidDescriptor(d) => write!(f, "malformed descriptor: {}", d),
        }
    }
}

impl std::error::Error for ClassParseError {}

/// A class or type name could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No class file for this name on the search path.
    ClassNotFound(String),
    /// Unqualified name that is neither primitive, a type variable, nor in `java.lang`.
    UnknownType(String),
    /// The class file was found but could not be decoded.
    ClassFile { class: String, error: ClassParseError },
    Io { path: String, message: String },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::ClassNotFound(name) => write!(f, "class not found: {}", name),
            ResolveError::UnknownType(name) => write!(f, "cannot resolve type name '{}'", name),
            ResolveError::ClassFile { class, error } => {
                write!(f, "failed to parse class {}: {}", class, error)
            }
            ResolveError::Io { path, message } => write!(f, "I/O error on {}: {}", path, message),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::ClassFile { error, .. } => Some(error),
            _ => None,
        }
    }
}
