//! Timeline entries and VM identification.

use serde::{Deserialize, Serialize};

use jit_tags::names::{TAG_INFO, TAG_NAME, TAG_RELEASE};
use jit_tags::Tag;

use crate::package::MemberId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JitEventKind {
    Queued,
    NMethodC1,
    NMethodC2,
    NMethodC2N,
    NMethodOsr,
}

/// One queue or compile event on the session timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JitEvent {
    pub stamp_ms: u64,
    pub kind: JitEventKind,
    pub member: MemberId,
    pub compile_id: String,
    pub level: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeCacheEventKind {
    Compilation,
    /// Periodic `code_cache` report.
    Sample,
    Sweeper,
    CacheFull,
}

/// A code-cache sample: either an nmethod landing in the cache or a
/// `code_cache`/`sweeper`/`code_cache_full` report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeCacheEvent {
    pub stamp_ms: u64,
    pub kind: CodeCacheEventKind,
    pub native_size: Option<u64>,
    pub address: Option<String>,
    pub free_bytes: Option<u64>,
}

/// Identification from the log's `vm_version` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmVersion {
    pub name: Option<String>,
    pub release: Option<String>,
    pub info: Option<String>,
}

impl VmVersion {
    pub fn from_tag(tag: &Tag) -> Self {
        let text = |name: &str| {
            tag.first_named_child(name)
                .and_then(Tag::text)
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
        };
        Self {
            name: text(TAG_NAME),
            release: text(TAG_RELEASE),
            info: text(TAG_INFO),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_version_from_tag() {
        let mut root = Tag::new("vm_version", vec![], false);
        let mut name = Tag::new("name", vec![], false);
        name.append_text("Java HotSpot(TM) 64-Bit Server VM");
        let mut release = Tag::new("release", vec![], false);
        release.append_text(" 25.0-b70 ");
        root.add_child(name);
        root.add_child(release);

        let vm = VmVersion::from_tag(&root);
        assert_eq!(vm.name.as_deref(), Some("Java HotSpot(TM) 64-Bit Server VM"));
        assert_eq!(vm.release.as_deref(), Some("25.0-b70"));
        assert_eq!(vm.info, None);
    }
}
