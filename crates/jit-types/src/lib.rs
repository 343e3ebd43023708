//! Shared types for the jitscope workspace.
//!
//! This crate provides the Java type-name grammar and modifier model used by
//! every other crate, breaking what would otherwise be circular dependencies
//! between the signature resolver, the bytecode loader and the data model.
//!
//! - [`type_parsing`]: descriptors, source names, generic-aware splitting
//! - [`modifiers`]: `java.lang.reflect.Modifier` bit model
//! - [`env_utils`]: environment-variable helpers for configuration

pub mod env_utils;
pub mod modifiers;
pub mod type_parsing;

pub use modifiers::Modifier;
pub use type_parsing::{
    is_java_identifier, package_of, simple_name_of, split_top_level_whitespace, split_type_params,
    strip_generics, DescriptorError, MethodDescriptor, Primitive, TypeDesc,
};
