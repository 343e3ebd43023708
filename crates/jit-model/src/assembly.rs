//! Native assembly attachment.
//!
//! Decoding disassembler output is the provider's business; the model only
//! stores the blocks it is handed for each member's mangled name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyBlock {
    pub title: String,
    pub lines: Vec<String>,
}

pub trait AssemblyProvider: Send + Sync {
    /// Blocks for a mangled member key such as `java.lang.String::hashCode`.
    fn blocks_for(&self, mangled_name: &str) -> Vec<AssemblyBlock>;
}

/// Provider with nothing to offer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssembly;

impl AssemblyProvider for NoAssembly {
    fn blocks_for(&self, _mangled_name: &str) -> Vec<AssemblyBlock> {
        Vec::new()
    }
}

/// Pre-decoded blocks keyed by mangled name.
#[derive(Debug, Clone, Default)]
pub struct MapAssemblyProvider {
    blocks: BTreeMap<String, Vec<AssemblyBlock>>,
}

impl MapAssemblyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mangled_name: impl Into<String>, block: AssemblyBlock) {
        self.blocks.entry(mangled_name.into()).or_default().push(block);
    }
}

impl AssemblyProvider for MapAssemblyProvider {
    fn blocks_for(&self, mangled_name: &str) -> Vec<AssemblyBlock> {
        self.blocks.get(mangled_name).cloned().unwrap_or_default()
    }
}
