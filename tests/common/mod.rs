#![allow(dead_code)]
//! Shared test utilities for integration tests.
//!
//! - `fixtures`: inline HotSpot logs, javap text and class-file assembly
//! - `setup`: temporary class directories and log files

pub mod fixtures;
pub mod setup;

pub use fixtures::{SPIN_LOG, TRUNCATED_LOG, WIDGET_JAVAP};
pub use setup::{write_class_dir, write_fake_javap, write_log, LogWorkspace};
