//! jitscope: HotSpot LogCompilation analyser.
//!
//! The library crates do the work:
//!
//! - **jit-tags**: line-oriented tag framing and per-task dictionaries
//! - **jit-resolver**: member signatures and class-path resolution
//! - **jit-bytecode**: javap disassembly parsing
//! - **jit-model**: packages, members, compile history and statistics
//! - **jit-core**: log driver, bytecode annotation, finders and reports
//!
//! This crate adds the command-line surface on top.

pub mod args;
pub mod runner;
