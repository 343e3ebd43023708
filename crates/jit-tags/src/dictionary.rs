//! Per-task id lookup for `type`, `klass` and `method` definitions.

use std::collections::BTreeMap;

use crate::names::{ATTR_ARGUMENTS, ATTR_HOLDER, ATTR_ID, ATTR_NAME, ATTR_RETURN, TAG_KLASS, TAG_METHOD, TAG_TYPE};
use crate::tag::Tag;

/// The `type`/`klass`/`method` definitions seen inside one compile task.
///
/// Ids are only meaningful within the task that declared them, so each task
/// owns its own dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseDictionary {
    types: BTreeMap<String, Tag>,
    klasses: BTreeMap<String, Tag>,
    methods: BTreeMap<String, Tag>,
}

impl ParseDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// True for tag names that define dictionary entries.
    pub fn is_dictionary_tag(name: &str) -> bool {
        matches!(name, TAG_TYPE | TAG_KLASS | TAG_METHOD)
    }

    /// Register a definition by its `id` attribute.
    ///
    /// Returns false when the tag is not a dictionary tag or carries no id.
    pub fn register(&mut self, tag: &Tag) -> bool {
        let Some(id) = tag.attribute(ATTR_ID) else {
            return false;
        };
        let map = match tag.name() {
            TAG_TYPE => &mut self.types,
            TAG_KLASS => &mut self.klasses,
            TAG_METHOD => &mut self.methods,
            _ => return false,
        };
        map.insert(id.to_string(), tag.clone());
        true
    }

    pub fn type_tag(&self, id: &str) -> Option<&Tag> {
        self.types.get(id)
    }

    pub fn klass(&self, id: &str) -> Option<&Tag> {
        self.klasses.get(id)
    }

    pub fn method(&self, id: &str) -> Option<&Tag> {
        self.methods.get(id)
    }

    /// Raw `name` of a `type` or `klass` entry, as written in the log
    /// (`int`, `java/lang/String`, `[Ljava/lang/Object;`).
    pub fn type_or_klass_name(&self, id: &str) -> Option<&str> {
        self.types
            .get(id)
            .or_else(|| self.klasses.get(id))
            .and_then(|tag| tag.attribute(ATTR_NAME))
    }

    /// Raw class name of a method's `holder` klass.
    pub fn holder_name(&self, method: &Tag) -> Option<&str> {
        method
            .attribute(ATTR_HOLDER)
            .and_then(|holder| self.klass(holder))
            .and_then(|klass| klass.attribute(ATTR_NAME))
    }

    /// Ids referenced by a method entry (`holder`, `return`, `arguments`) that
    /// have no definition in this dictionary.
    pub fn missing_method_references(&self, method: &Tag) -> Vec<String> {
        let mut missing = Vec::new();
        if let Some(holder) = method.attribute(ATTR_HOLDER) {
            if self.klass(holder).is_none() {
                missing.push(holder.to_string());
            }
        }
        let mut referenced: Vec<&str> = method.attribute(ATTR_RETURN).into_iter().collect();
        if let Some(arguments) = method.attribute(ATTR_ARGUMENTS) {
            referenced.extend(arguments.split_whitespace());
        }
        for id in referenced {
            if self.type_or_klass_name(id).is_none() {
                missing.push(id.to_string());
            }
        }
        missing
    }

    pub fn len(&self) -> usize {
        self.types.len() + self.klasses.len() + self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str, pairs: &[(&str, &str)]) -> Tag {
        Tag::new(
            name,
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            true,
        )
    }

    #[test]
    fn test_register_and_lookup() {
        let mut dict = ParseDictionary::new();
        assert!(dict.register(&tag("type", &[("id", "1"), ("name", "int")])));
        assert!(dict.register(&tag("klass", &[("id", "2"), ("name", "java/lang/String")])));
        assert!(dict.register(&tag(
            "method",
            &[("id", "3"), ("holder", "2"), ("name", "charAt"), ("return", "1"), ("arguments", "1")]
        )));
        assert!(!dict.register(&tag("bc", &[("id", "4")])));
        assert!(!dict.register(&tag("type", &[("name", "void")])));

        assert_eq!(dict.len(), 3);
        assert_eq!(dict.type_or_klass_name("1"), Some("int"));
        assert_eq!(dict.type_or_klass_name("2"), Some("java/lang/String"));
        let method = dict.method("3").unwrap();
        assert_eq!(dict.holder_name(method), Some("java/lang/String"));
        assert!(dict.missing_method_references(method).is_empty());
    }

    #[test]
    fn test_missing_references() {
        let mut dict = ParseDictionary::new();
        dict.register(&tag("type", &[("id", "1"), ("name", "void")]));
        let method = tag(
            "method",
            &[("id", "3"), ("holder", "9"), ("return", "1"), ("arguments", "1 8")],
        );
        assert_eq!(dict.missing_method_references(&method), vec!["9", "8"]);
    }
}
