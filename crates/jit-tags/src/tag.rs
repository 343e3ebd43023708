//! Generic tag tree produced by the [`TagProcessor`](crate::TagProcessor).
//!
//! Ownership flows strictly from parent to children. There is no stored parent
//! pointer: while a unit is being built the processor's open-tag stack is the
//! parent chain, and afterwards [`Tag::find_path`] recovers ancestors on demand.

use std::collections::BTreeMap;
use std::fmt;

use crate::dictionary::ParseDictionary;
use crate::names::TAG_TASK;

/// Variant data carried by a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKind {
    Element,
    /// A compile `task`; owns the id lookup for the tags nested inside it.
    Task(Box<ParseDictionary>),
}

/// One node of a LogCompilation document.
///
/// Children are owned and there is no parent link; walk up from a node with
/// [`Tag::find_path`] on its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Tag>,
    text: Option<String>,
    self_closing: bool,
    kind: TagKind,
}

impl Tag {
    /// Create a tag; a `task` tag automatically becomes the task variant.
    pub fn new(name: impl Into<String>, attributes: Vec<(String, String)>, self_closing: bool) -> Self {
        let name = name.into();
        let kind = if name == TAG_TASK {
            TagKind::Task(Box::default())
        } else {
            TagKind::Element
        };
        Self {
            name,
            attributes,
            children: Vec::new(),
            text: None,
            self_closing,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute_map(&self) -> BTreeMap<String, String> {
        self.attributes.iter().cloned().collect()
    }

    /// Insert or replace an attribute, keeping the original position on replace.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn children(&self) -> &[Tag] {
        &self.children
    }

    pub fn add_child(&mut self, child: Tag) {
        self.children.push(child);
    }

    pub fn first_named_child(&self, name: &str) -> Option<&Tag> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn named_children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Tag> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Every descendant (not including `self`) with the given name, depth-first
    /// in document order.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Tag> {
        let mut out = Vec::new();
        collect_named(self, name, &mut out);
        out
    }

    /// Chain of tags from `self` down to the first node satisfying `pred`.
    ///
    /// The last element is the match; every earlier element is its ancestor.
    pub fn find_path<'a, F>(&'a self, pred: F) -> Option<Vec<&'a Tag>>
    where
        F: Fn(&Tag) -> bool + Copy,
    {
        if pred(self) {
            return Some(vec![self]);
        }
        for child in &self.children {
            if let Some(mut path) = child.find_path(pred) {
                path.insert(0, self);
                return Some(path);
            }
        }
        None
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Append a line of text content; successive lines are newline-joined.
    pub fn append_text(&mut self, text: &str) {
        match &mut self.text {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(text);
            }
            None => self.text = Some(text.to_string()),
        }
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    pub fn kind(&self) -> &TagKind {
        &self.kind
    }

    pub fn is_task(&self) -> bool {
        matches!(self.kind, TagKind::Task(_))
    }

    pub fn dictionary(&self) -> Option<&ParseDictionary> {
        match &self.kind {
            TagKind::Task(dictionary) => Some(dictionary),
            TagKind::Element => None,
        }
    }

    pub fn dictionary_mut(&mut self) -> Option<&mut ParseDictionary> {
        match &mut self.kind {
            TagKind::Task(dictionary) => Some(dictionary),
            TagKind::Element => None,
        }
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        write!(f, "{}<{}", indent, self.name)?;
        for (key, value) in &self.attributes {
            write!(f, " {}='{}'", key, escape_attribute(value))?;
        }
        if self.self_closing {
            return writeln!(f, "/>");
        }
        writeln!(f, ">")?;
        if let Some(text) = &self.text {
            for line in text.lines() {
                writeln!(f, "{}  {}", indent, line)?;
            }
        }
        for child in &self.children {
            child.write_tree(f, depth + 1)?;
        }
        writeln!(f, "{}</{}>", indent, self.name)
    }
}

impl fmt::Display for Tag {
    /// Prints one markup token per line, indented by depth, so the output
    /// re-parses to an equal tree.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}

fn collect_named<'a>(tag: &'a Tag, name: &str, out: &mut Vec<&'a Tag>) {
    for child in &tag.children {
        if child.name == name {
            out.push(child);
        }
        collect_named(child, name, out);
    }
}

/// Decode the five predefined XML entities.
pub fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&apos;")
        .replace('"', "&quot;")
}
