//! Signature model and class resolution.
//!
//! This crate provides:
//! - [`signature`]: [`MemberSignatureParts`] and the three dialect parsers
//! - [`loader`]: the [`ClassResolver`] seam with class-path and in-memory implementations
//! - [`classfile`]: the `.class` reader behind [`ClassPathLoader`]
//! - [`matching`]: type-name resolution and member matching
//!
//! # Matching
//!
//! javap headers carry unqualified names, type variables and varargs, log
//! signatures carry descriptors, and class files carry erased types. Matching
//! resolves every name through [`resolve_type_name`] before comparing, and a
//! name that cannot be resolved rejects only the candidate being tested.

pub mod classfile;
pub mod errors;
pub mod loader;
pub mod matching;
pub mod runtime;
pub mod signature;

pub use classfile::parse_class;
pub use errors::{ClassParseError, ResolveError, SignatureError};
pub use loader::{ClassPathLoader, ClassResolver, StaticClassResolver};
pub use matching::{find_matching_member, member_matches, params_match, resolve_type_name};
pub use runtime::{MemberKind, ResolvedClass, RuntimeMember};
pub use signature::MemberSignatureParts;
