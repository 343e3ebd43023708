//! One compile event of a member.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use jit_tags::names::{
    ATTR_BYTES, ATTR_COMPILER, ATTR_COMPILE_KIND, ATTR_INSTS_BYTES, ATTR_LEVEL, ATTR_SIZE, ATTR_STAMP,
    COMPILER_C1, COMPILER_C2, COMPILE_KIND_C2N, COMPILE_KIND_OSR,
};
use jit_tags::Tag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompileKind {
    Standard,
    /// On-stack replacement of a running loop.
    Osr,
    /// Native method wrapper; never queued.
    C2n,
}

impl CompileKind {
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some(COMPILE_KIND_OSR) => CompileKind::Osr,
            Some(COMPILE_KIND_C2N) => CompileKind::C2n,
            _ => CompileKind::Standard,
        }
    }
}

/// Everything the log reported about one `compile_id`.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub compile_id: String,
    /// Position in the owning member's history.
    pub index: usize,
    pub task_queued: Option<Arc<Tag>>,
    pub nmethod: Option<Arc<Tag>>,
    pub task: Option<Arc<Tag>>,
    pub task_done_attrs: BTreeMap<String, String>,
    /// `C1` or `C2`.
    pub compiler: Option<String>,
    pub kind: CompileKind,
    pub level: Option<u32>,
    pub queued_stamp: Option<u64>,
    pub compile_start_stamp: Option<u64>,
    pub emitted_stamp: Option<u64>,
    pub bytecode_size: Option<u64>,
    pub native_size: Option<u64>,
}

impl Compilation {
    pub fn new(compile_id: impl Into<String>, index: usize) -> Self {
        Self {
            compile_id: compile_id.into(),
            index,
            task_queued: None,
            nmethod: None,
            task: None,
            task_done_attrs: BTreeMap::new(),
            compiler: None,
            kind: CompileKind::Standard,
            level: None,
            queued_stamp: None,
            compile_start_stamp: None,
            emitted_stamp: None,
            bytecode_size: None,
            native_size: None,
        }
    }

    /// Fill compiler, kind and level from any tag that carries them.
    /// Values already known are kept.
    pub fn absorb_common_attributes(&mut self, tag: &Tag) {
        if self.level.is_none() {
            self.level = tag.attribute(ATTR_LEVEL).and_then(|l| l.parse().ok());
        }
        if self.compiler.is_none() {
            self.compiler = compiler_name(tag.attribute(ATTR_COMPILER), self.level);
        }
        if self.kind == CompileKind::Standard {
            self.kind = CompileKind::from_attribute(tag.attribute(ATTR_COMPILE_KIND));
        }
    }

    pub fn set_task_queued(&mut self, tag: Arc<Tag>) {
        self.absorb_common_attributes(&tag);
        self.queued_stamp = tag.attribute(ATTR_STAMP).and_then(parse_stamp_millis);
        self.task_queued = Some(tag);
    }

    pub fn set_nmethod(&mut self, tag: Arc<Tag>) {
        self.absorb_common_attributes(&tag);
        self.emitted_stamp = tag.attribute(ATTR_STAMP).and_then(parse_stamp_millis);
        self.native_size = tag
            .attribute(ATTR_INSTS_BYTES)
            .or_else(|| tag.attribute(ATTR_SIZE))
            .and_then(|s| s.parse().ok());
        self.nmethod = Some(tag);
    }

    pub fn set_task(&mut self, tag: Arc<Tag>, task_done: Option<&Tag>) {
        self.absorb_common_attributes(&tag);
        self.compile_start_stamp = tag.attribute(ATTR_STAMP).and_then(parse_stamp_millis);
        self.bytecode_size = tag.attribute(ATTR_BYTES).and_then(|b| b.parse().ok());
        if let Some(done) = task_done {
            self.task_done_attrs = done.attribute_map();
        }
        self.task = Some(tag);
    }

    pub fn is_osr(&self) -> bool {
        self.kind == CompileKind::Osr
    }

    pub fn is_c2n(&self) -> bool {
        self.kind == CompileKind::C2n
    }

    pub fn queued_to_emitted_millis(&self) -> Option<u64> {
        Some(self.emitted_stamp?.saturating_sub(self.queued_stamp?))
    }

    /// From the `task` start stamp to its `task_done` stamp.
    pub fn compile_duration_millis(&self) -> Option<u64> {
        let done = self
            .task_done_attrs
            .get(ATTR_STAMP)
            .and_then(|s| parse_stamp_millis(s))?;
        Some(done.saturating_sub(self.compile_start_stamp?))
    }
}

/// Upper-cased compiler name, falling back to the tiered level.
fn compiler_name(attribute: Option<&str>, level: Option<u32>) -> Option<String> {
    match (attribute, level) {
        (Some(name), _) if !name.is_empty() => Some(name.to_ascii_uppercase()),
        (_, Some(1..=3)) => Some(COMPILER_C1.to_string()),
        (_, Some(4)) => Some(COMPILER_C2.to_string()),
        _ => None,
    }
}

/// Parse a decimal-seconds stamp (`"1.234"`) into whole milliseconds without
/// going through floating point. Digits past the third decimal are truncated.
pub fn parse_stamp_millis(stamp: &str) -> Option<u64> {
    let stamp = stamp.trim();
    let (seconds, fraction) = stamp.split_once('.').unwrap_or((stamp, ""));
    if seconds.is_empty() && fraction.is_empty() {
        return None;
    }
    if !seconds.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let seconds: u64 = if seconds.is_empty() { 0 } else { seconds.parse().ok()? };
    let mut millis = 0u64;
    let mut digits = fraction.chars();
    for scale in [100, 10, 1] {
        let digit = digits.next().and_then(|c| c.to_digit(10)).unwrap_or(0);
        millis += u64::from(digit) * scale;
    }
    seconds.checked_mul(1000)?.checked_add(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str, pairs: &[(&str, &str)]) -> Arc<Tag> {
        Arc::new(Tag::new(
            name,
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            true,
        ))
    }

    #[test]
    fn test_parse_stamp_exact() {
        assert_eq!(parse_stamp_millis("1.234"), Some(1234));
        assert_eq!(parse_stamp_millis("0.110"), Some(110));
        assert_eq!(parse_stamp_millis("2.01"), Some(2010));
        assert_eq!(parse_stamp_millis("12"), Some(12000));
        assert_eq!(parse_stamp_millis("1.0059"), Some(1005));
        assert_eq!(parse_stamp_millis(".5"), Some(500));
        assert_eq!(parse_stamp_millis("abc"), None);
        assert_eq!(parse_stamp_millis(""), None);
        // 0.1 + 0.2 style float error must not leak in.
        assert_eq!(parse_stamp_millis("0.300"), Some(300));
    }

    #[test]
    fn test_compiler_derivation() {
        assert_eq!(compiler_name(Some("c2"), None).as_deref(), Some("C2"));
        assert_eq!(compiler_name(None, Some(3)).as_deref(), Some("C1"));
        assert_eq!(compiler_name(None, Some(4)).as_deref(), Some("C2"));
        assert_eq!(compiler_name(None, Some(0)), None);
    }

    #[test]
    fn test_lifecycle_timings() {
        let mut c = Compilation::new("7", 0);
        c.set_task_queued(tag("task_queued", &[("compile_id", "7"), ("stamp", "1.000"), ("level", "3")]));
        let done = Tag::new("task_done", vec![("stamp".into(), "1.004".into()), ("nmsize".into(), "96".into())], true);
        c.set_task(tag("task", &[("compile_id", "7"), ("stamp", "1.001"), ("bytes", "33")]), Some(&done));
        c.set_nmethod(tag("nmethod", &[("compile_id", "7"), ("stamp", "1.005"), ("size", "400"), ("insts_bytes", "120")]));

        assert_eq!(c.compiler.as_deref(), Some("C1"));
        assert_eq!(c.level, Some(3));
        assert_eq!(c.bytecode_size, Some(33));
        assert_eq!(c.native_size, Some(120));
        assert_eq!(c.queued_to_emitted_millis(), Some(5));
        assert_eq!(c.compile_duration_millis(), Some(3));
        assert_eq!(c.task_done_attrs.get("nmsize").map(String::as_str), Some("96"));
        assert!(!c.is_osr());
    }

    #[test]
    fn test_native_wrapper() {
        let mut c = Compilation::new("9", 0);
        c.set_nmethod(tag("nmethod", &[("compile_id", "9"), ("compile_kind", "c2n"), ("stamp", "0.5")]));
        assert!(c.is_c2n());
        assert_eq!(c.queued_to_emitted_millis(), None);
    }
}
