//! Read-only queries over a member's last compile task.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;

use jit_model::{MemberId, MetaMember};
use jit_tags::names::{
    ATTR_ACTION, ATTR_BCI, ATTR_ID, ATTR_METHOD, ATTR_REASON, TAG_BC, TAG_CALL, TAG_INLINE_FAIL,
    TAG_INLINE_SUCCESS, TAG_INTRINSIC, TAG_METHOD, TAG_PARSE, TAG_PHASE, TAG_UNCOMMON_TRAP,
};
use jit_tags::{ParseDictionary, Tag};

use crate::journal::{member_matches_method_id, method_display_name, visit_parse_tags_of_last_task, JournalVisitable};

/// Intrinsic id → `holder.method` it replaced.
#[derive(Debug, Default)]
pub struct IntrinsicFinder {
    found: BTreeMap<String, String>,
}

impl IntrinsicFinder {
    pub fn find_intrinsics(member: &MetaMember) -> BTreeMap<String, String> {
        let mut finder = Self::default();
        visit_parse_tags_of_last_task(member, &mut finder);
        finder.found
    }

    fn scan(&mut self, parse: &Tag, dictionary: &ParseDictionary) {
        let mut callee: Option<&str> = None;
        for child in parse.children() {
            match child.name() {
                TAG_CALL => callee = child.attribute(ATTR_METHOD),
                TAG_METHOD => callee = child.attribute(ATTR_ID),
                TAG_INTRINSIC => {
                    if let Some(id) = child.attribute(ATTR_ID) {
                        let target = callee
                            .and_then(|m| method_display_name(m, dictionary))
                            .unwrap_or_else(|| "?".to_string());
                        self.found.insert(id.to_string(), target);
                    }
                    callee = None;
                }
                TAG_PARSE | TAG_PHASE => self.scan(child, dictionary),
                _ => {}
            }
        }
    }
}

impl JournalVisitable for IntrinsicFinder {
    fn visit_parse_tag(&mut self, parse: &Tag, dictionary: &ParseDictionary) {
        self.scan(parse, dictionary);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrapInfo {
    pub bci: u32,
    pub reason: String,
    pub action: String,
}

/// Uncommon traps placed in the member's own bytecode.
pub struct UncommonTrapFinder<'m> {
    member: &'m MetaMember,
    traps: Vec<TrapInfo>,
}

impl<'m> UncommonTrapFinder<'m> {
    pub fn find_traps(member: &'m MetaMember) -> Vec<TrapInfo> {
        let mut finder = Self {
            member,
            traps: Vec::new(),
        };
        visit_parse_tags_of_last_task(member, &mut finder);
        finder.traps
    }

    fn scan(&mut self, tags: &[Tag], dictionary: &ParseDictionary, cursor: &mut Option<u32>) {
        for tag in tags {
            match tag.name() {
                TAG_BC => *cursor = tag.attribute(ATTR_BCI).and_then(|b| b.parse().ok()),
                TAG_PHASE => self.scan(tag.children(), dictionary, cursor),
                TAG_UNCOMMON_TRAP => {
                    let own = tag
                        .attribute(ATTR_METHOD)
                        .map_or(true, |id| member_matches_method_id(self.member, id, dictionary));
                    let bci = tag
                        .attribute(ATTR_BCI)
                        .and_then(|b| b.parse().ok())
                        .or(*cursor);
                    if let (true, Some(bci)) = (own, bci) {
                        self.traps.push(TrapInfo {
                            bci,
                            reason: tag.attribute(ATTR_REASON).unwrap_or_default().to_string(),
                            action: tag.attribute(ATTR_ACTION).unwrap_or_default().to_string(),
                        });
                    }
                }
                _ => {}
            }
        }
    }
}

impl JournalVisitable for UncommonTrapFinder<'_> {
    fn visit_parse_tag(&mut self, parse: &Tag, dictionary: &ParseDictionary) {
        let mut cursor = None;
        self.scan(parse.children(), dictionary, &mut cursor);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineDecision {
    pub callee: String,
    pub inlined: bool,
    pub reason: Option<String>,
}

/// Every inlining decision in the last task, including those made inside
/// already-inlined callees.
#[derive(Debug, Default)]
pub struct InliningFinder {
    decisions: Vec<InlineDecision>,
}

impl InliningFinder {
    pub fn find_inlined_callees(member: &MetaMember) -> Vec<InlineDecision> {
        let mut finder = Self::default();
        visit_parse_tags_of_last_task(member, &mut finder);
        finder.decisions
    }

    fn scan(&mut self, parse: &Tag, dictionary: &ParseDictionary) {
        let mut callee: Option<&str> = None;
        for child in parse.children() {
            match child.name() {
                TAG_CALL => callee = child.attribute(ATTR_METHOD),
                TAG_METHOD => callee = child.attribute(ATTR_ID),
                TAG_INLINE_SUCCESS | TAG_INLINE_FAIL => {
                    if let Some(name) = callee.and_then(|m| method_display_name(m, dictionary)) {
                        self.decisions.push(InlineDecision {
                            callee: name,
                            inlined: child.name() == TAG_INLINE_SUCCESS,
                            reason: child.attribute(ATTR_REASON).map(str::to_string),
                        });
                    }
                    callee = None;
                }
                TAG_PARSE | TAG_PHASE => self.scan(child, dictionary),
                _ => {}
            }
        }
    }
}

impl JournalVisitable for InliningFinder {
    fn visit_parse_tag(&mut self, parse: &Tag, dictionary: &ParseDictionary) {
        self.scan(parse, dictionary);
    }
}

/// Intrinsics of many members at once; members without any are omitted.
pub fn intrinsics_by_member(members: &[(MemberId, MetaMember)]) -> Vec<(MemberId, BTreeMap<String, String>)> {
    members
        .par_iter()
        .map(|(id, member)| (*id, IntrinsicFinder::find_intrinsics(member)))
        .filter(|(_, found)| !found.is_empty())
        .collect()
}
