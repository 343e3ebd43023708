//! Journal walking primitives shared by the annotation engine and finders.

use std::sync::Arc;

use jit_model::MetaMember;
use jit_resolver::MemberSignatureParts;
use jit_tags::names::{TAG_PARSE, TAG_PHASE, TAG_TASK};
use jit_tags::{ParseDictionary, Tag};

/// The most recent `task` in a member's journal.
pub fn last_task(journal: &[Arc<Tag>]) -> Option<&Arc<Tag>> {
    journal.iter().rev().find(|tag| tag.name() == TAG_TASK)
}

/// The `task` recorded for the member's `index`-th compilation.
pub fn task_for_compilation(member: &MetaMember, index: usize) -> Option<Arc<Tag>> {
    member.compilations().get(index).and_then(|c| c.task.clone())
}

/// Topmost `parse` tags of a task, descending through `phase` wrappers.
pub fn parse_tags(task: &Tag) -> Vec<&Tag> {
    let mut found = Vec::new();
    collect_parse_tags(task, &mut found);
    found
}

fn collect_parse_tags<'a>(tag: &'a Tag, found: &mut Vec<&'a Tag>) {
    for child in tag.children() {
        match child.name() {
            TAG_PARSE => found.push(child),
            TAG_PHASE => collect_parse_tags(child, found),
            _ => {}
        }
    }
}

/// Dictionary of a task tag, or an empty one for plain tags.
pub fn dictionary_of(task: &Tag) -> ParseDictionary {
    task.dictionary().cloned().unwrap_or_default()
}

/// Callback for each top-level parse tag of a task.
pub trait JournalVisitable {
    fn visit_parse_tag(&mut self, parse: &Tag, dictionary: &ParseDictionary);
}

/// Feed every top-level parse tag of the member's last task to `visitor`.
/// Returns false when the member has no task in its journal.
pub fn visit_parse_tags_of_last_task(member: &MetaMember, visitor: &mut dyn JournalVisitable) -> bool {
    let Some(task) = last_task(member.journal()) else {
        return false;
    };
    let dictionary = dictionary_of(task);
    for parse in parse_tags(task) {
        visitor.visit_parse_tag(parse, &dictionary);
    }
    true
}

/// Does dictionary method `id` denote `member`?
pub fn member_matches_method_id(member: &MetaMember, id: &str, dictionary: &ParseDictionary) -> bool {
    let Some(method) = dictionary.method(id) else {
        return false;
    };
    match MemberSignatureParts::from_dictionary_method(method, dictionary) {
        Ok(parts) => {
            let own = member.signature();
            parts.class_name == own.class_name
                && parts.member_name == own.member_name
                && parts.param_types == own.param_types
        }
        Err(_) => false,
    }
}

/// `holder.name` of a dictionary method, dotted.
pub fn method_display_name(id: &str, dictionary: &ParseDictionary) -> Option<String> {
    let method = dictionary.method(id)?;
    let parts = MemberSignatureParts::from_dictionary_method(method, dictionary).ok()?;
    let name = if parts.is_constructor() {
        jit_tags::names::INIT_NAME
    } else {
        parts.member_name.as_str()
    };
    Some(format!("{}.{}", parts.class_name, name))
}
