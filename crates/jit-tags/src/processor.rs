//! Line-oriented tag state machine.
//!
//! HotSpot writes LogCompilation output one markup token per line, but the
//! format is log output rather than XML: documents are truncated when the VM
//! dies, closing tags can be missing or stray, and text content shares lines
//! with its own closing marker. [`TagProcessor`] consumes one line at a time
//! and hands back each top-level unit as soon as it is complete.

use smallvec::SmallVec;
use tracing::{trace, warn};

use crate::dictionary::ParseDictionary;
use crate::names::TAG_FRAGMENT;
use crate::tag::{unescape, Tag};

/// Units completed by a single line; almost always zero or one.
pub type CompletedUnits = SmallVec<[Tag; 1]>;

/// Incremental tag-tree builder.
///
/// The open-tag stack is the parent chain of the unit in progress: the first
/// entry is the top tag, the last is the current tag.
#[derive(Debug, Default)]
pub struct TagProcessor {
    open: Vec<Tag>,
    fragment: bool,
}

impl TagProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; returns every top-level unit it completed, in order.
    pub fn process_line(&mut self, line: &str) -> CompletedUnits {
        let mut completed = CompletedUnits::new();
        let line = line.trim();
        if line.is_empty() {
            return completed;
        }
        if !line.starts_with('<') && self.open.is_empty() {
            trace!(line, "text outside of any tag");
            return completed;
        }
        self.process_segment(line, &mut completed);
        completed
    }

    pub fn has_open_tag(&self) -> bool {
        !self.open.is_empty()
    }

    /// Innermost open tag.
    pub fn current_tag(&self) -> Option<&Tag> {
        self.open.last()
    }

    /// Root of the unit in progress.
    pub fn top_tag(&self) -> Option<&Tag> {
        self.open.first()
    }

    /// True once a parentless `<fragment>` has been seen (truncated log).
    pub fn is_fragment(&self) -> bool {
        self.fragment
    }

    /// Drop any partial unit and clear the fragment flag.
    pub fn reset(&mut self) {
        self.open.clear();
        self.fragment = false;
    }

    fn process_segment(&mut self, mut rest: &str, completed: &mut CompletedUnits) {
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix("<![CDATA[") {
                let (content, remaining) = match after.find("]]>") {
                    Some(end) => (&after[..end], &after[end + 3..]),
                    None => (after, ""),
                };
                self.append_text(content);
                rest = remaining.trim_start();
            } else if rest.starts_with("<?") || rest.starts_with("<!") {
                let terminator = if rest.starts_with("<?") { "?>" } else { ">" };
                rest = match rest.find(terminator) {
                    Some(end) => rest[end + terminator.len()..].trim_start(),
                    None => "",
                };
            } else if let Some(after) = rest.strip_prefix("</") {
                let Some(end) = after.find('>') else {
                    warn!(line = rest, "unterminated closing tag");
                    return;
                };
                self.close_tag(after[..end].trim(), completed);
                rest = after[end + 1..].trim_start();
            } else if rest.starts_with('<') {
                let Some(end) = find_markup_end(rest) else {
                    warn!(line = rest, "unterminated tag markup");
                    return;
                };
                self.open_markup(&rest[1..end], completed);
                rest = rest[end + 1..].trim_start();
            } else {
                rest = self.consume_text(rest);
            }
        }
    }

    /// Text up to the current tag's own closing marker (if on this line).
    fn consume_text<'a>(&mut self, rest: &'a str) -> &'a str {
        let Some(current) = self.open.last() else {
            trace!(text = rest, "dropping stray text");
            return "";
        };
        let marker = format!("</{}>", current.name());
        match rest.find(&marker) {
            Some(pos) => {
                let text = rest[..pos].trim_end();
                if !text.is_empty() {
                    self.append_text(text);
                }
                &rest[pos..]
            }
            None => {
                self.append_text(rest);
                ""
            }
        }
    }

    fn append_text(&mut self, text: &str) {
        if let Some(current) = self.open.last_mut() {
            current.append_text(text);
        }
    }

    fn open_markup(&mut self, inner: &str, completed: &mut CompletedUnits) {
        let (body, self_closing) = match inner.trim_end().strip_suffix('/') {
            Some(body) => (body, true),
            None => (inner, false),
        };
        let body = body.trim();
        let (name, attribute_text) = match body.find(char::is_whitespace) {
            Some(split) => (&body[..split], &body[split..]),
            None => (body, ""),
        };
        if name.is_empty() {
            warn!(markup = inner, "tag without a name");
            return;
        }

        if name == TAG_FRAGMENT && self.open.is_empty() && !self_closing {
            self.fragment = true;
            return;
        }

        let tag = Tag::new(name, parse_attributes(attribute_text), self_closing);
        if self_closing {
            self.complete(tag, completed);
        } else {
            self.open.push(tag);
        }
    }

    fn close_tag(&mut self, name: &str, completed: &mut CompletedUnits) {
        match self.open.last() {
            Some(current) if current.name() == name => {
                if let Some(tag) = self.open.pop() {
                    self.complete(tag, completed);
                }
            }
            Some(current) => {
                warn!(
                    expected = current.name(),
                    found = name,
                    "ignoring mismatched closing tag"
                );
            }
            None => trace!(name, "ignoring closing tag with nothing open"),
        }
    }

    /// Attach a finished tag to its parent, or emit it as a top-level unit.
    fn complete(&mut self, tag: Tag, completed: &mut CompletedUnits) {
        if ParseDictionary::is_dictionary_tag(tag.name()) {
            if let Some(dictionary) = self
                .open
                .iter_mut()
                .rev()
                .find_map(|open| open.dictionary_mut())
            {
                dictionary.register(&tag);
            }
        }

        match self.open.last_mut() {
            Some(parent) => parent.add_child(tag),
            None => completed.push(tag),
        }
    }
}

/// Index of the `>` ending the markup that starts at `s[0] == '<'`, skipping
/// any `>` inside quoted attribute values.
fn find_markup_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'') | (None, '"') => quote = Some(c),
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}

/// Parse `key='value' key2="value 2"` pairs, decoding entities.
pub fn parse_attributes(text: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        let key_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let key = &rest[..key_end];
        rest = rest[key_end..].trim_start();

        let Some(after_eq) = rest.strip_prefix('=') else {
            if !key.is_empty() {
                attributes.push((key.to_string(), String::new()));
            }
            continue;
        };
        let after_eq = after_eq.trim_start();

        let (value, remaining) = match after_eq.chars().next() {
            Some(q @ ('\'' | '"')) => {
                let body = &after_eq[1..];
                match body.find(q) {
                    Some(end) => (&body[..end], &body[end + 1..]),
                    None => (body, ""),
                }
            }
            _ => {
                let end = after_eq
                    .find(char::is_whitespace)
                    .unwrap_or(after_eq.len());
                (&after_eq[..end], &after_eq[end..])
            }
        };

        if !key.is_empty() {
            attributes.push((key.to_string(), unescape(value)));
        }
        rest = remaining.trim_start();
    }

    attributes
}
