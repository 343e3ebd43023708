//! Canonical member signature shared by every dialect.
//!
//! A member reaches the analyser in three spellings:
//! - LogCompilation text: `java/lang/String charAt (I)C`, or a `method` tag
//!   whose ids point into the enclosing task's dictionary
//! - javap header text: `public final java.lang.String getName(int index)`
//! - a resolved [`RuntimeMember`] from a class file
//!
//! All three are normalised into [`MemberSignatureParts`] so they can be
//! compared with [`member_matches`](crate::member_matches).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use jit_tags::names::{
    ATTR_ARGUMENTS, ATTR_FLAGS, ATTR_ID, ATTR_NAME, ATTR_RETURN, CLINIT_NAME, INIT_NAME,
};
use jit_tags::{ParseDictionary, Tag};
use jit_types::modifiers::METHOD_MODIFIER_MASK;
use jit_types::{
    is_java_identifier, split_top_level_whitespace, split_type_params, strip_generics,
    MethodDescriptor, Modifier, Primitive, TypeDesc,
};

use crate::errors::SignatureError;
use crate::runtime::RuntimeMember;

const VOID: &str = "void";
const OBJECT: &str = "java.lang.Object";

/// Normalised description of one method or constructor.
///
/// Type names are source spellings (`int`, `java.lang.String[]`). Names taken
/// from javap text may still be unqualified or refer to type variables; they
/// are resolved lazily during matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberSignatureParts {
    /// `java.lang.reflect.Modifier` bits.
    pub modifier: u32,
    /// Modifier keywords in declaration order.
    pub modifiers: Vec<String>,
    /// Type variable to bound, from a `<T extends ...>` declaration.
    pub generics: BTreeMap<String, String>,
    pub return_type: String,
    /// Method name; constructors use the owning class's dotted name.
    pub member_name: String,
    pub param_types: Vec<String>,
    /// Dotted name of the declaring class.
    pub class_name: String,
}

impl MemberSignatureParts {
    fn empty(class_name: &str) -> Self {
        Self {
            modifier: 0,
            modifiers: Vec::new(),
            generics: BTreeMap::new(),
            return_type: VOID.to_string(),
            member_name: String::new(),
            param_types: Vec::new(),
            class_name: class_name.to_string(),
        }
    }

    /// Parse LogCompilation's inline form, `java/lang/String charAt (I)C`.
    pub fn from_log_signature(text: &str) -> Result<Self, SignatureError> {
        let trimmed = text.trim();
        let (class_token, rest) = trimmed
            .split_once(char::is_whitespace)
            .ok_or_else(|| SignatureError::malformed(text, "expected class, name and descriptor"))?;
        let rest = rest.trim_start();
        let paren = rest
            .find('(')
            .ok_or_else(|| SignatureError::malformed(text, "missing descriptor"))?;
        let name = rest[..paren].trim();
        if name.is_empty() {
            return Err(SignatureError::malformed(text, "missing member name"));
        }

        let class_name = TypeDesc::from_internal_name(class_token)?.to_string();
        let descriptor = MethodDescriptor::parse(&rest[paren..])?;

        let mut parts = Self::empty(&class_name);
        parts.param_types = descriptor.params.iter().map(|p| p.to_string()).collect();
        parts.set_name(name, descriptor.return_type.to_string());
        Ok(parts)
    }

    /// Build from a dictionary `method` tag, resolving `holder`, `return` and
    /// `arguments` ids through the task's [`ParseDictionary`].
    pub fn from_dictionary_method(method: &Tag, dictionary: &ParseDictionary) -> Result<Self, SignatureError> {
        let method_id = method.attribute(ATTR_ID).unwrap_or_default().to_string();
        if let Some(missing) = dictionary.missing_method_references(method).into_iter().next() {
            return Err(SignatureError::MissingDictionaryId { method_id, missing });
        }
        let missing_holder = || SignatureError::MissingDictionaryId {
            method_id: method_id.clone(),
            missing: "holder".to_string(),
        };

        let holder = dictionary.holder_name(method).ok_or_else(missing_holder)?;
        let class_name = TypeDesc::from_internal_name(holder)?.to_string();
        let name = method
            .attribute(ATTR_NAME)
            .ok_or_else(|| SignatureError::malformed(method.to_string(), "method tag has no name"))?;

        let lookup = |id: &str| -> Result<String, SignatureError> {
            let raw = dictionary
                .type_or_klass_name(id)
                .ok_or_else(|| SignatureError::MissingDictionaryId {
                    method_id: method_id.clone(),
                    missing: id.to_string(),
                })?;
            log_type_name(raw)
        };

        let return_type = match method.attribute(ATTR_RETURN) {
            Some(id) => lookup(id)?,
            None => VOID.to_string(),
        };
        let param_types = method
            .attribute(ATTR_ARGUMENTS)
            .map(|ids| ids.split_whitespace().map(lookup).collect::<Result<Vec<_>, _>>())
            .transpose()?
            .unwrap_or_default();

        let mut parts = Self::empty(&class_name);
        parts.param_types = param_types;
        if let Some(flags) = method.attribute(ATTR_FLAGS).and_then(|f| f.parse::<u32>().ok()) {
            parts.set_modifier_bits(flags & METHOD_MODIFIER_MASK);
        }
        parts.set_name(name, return_type);
        Ok(parts)
    }

    /// Parse a javap member header.
    ///
    /// Handles modifiers, a `<T extends ...>` declaration, `throws` clauses,
    /// varargs, `final` and annotated parameters, optional parameter names,
    /// static initialisers and return-less constructor headers.
    pub fn from_bytecode_signature(text: &str, class_name: &str) -> Result<Self, SignatureError> {
        let mut line = text.trim();
        line = line.strip_suffix(';').unwrap_or(line).trim_end();

        let mut parts = Self::empty(class_name);

        if line == "static {}" || line.ends_with(" static {}") {
            parts.set_modifier_bits(Modifier::Static.bit());
            parts.member_name = CLINIT_NAME.to_string();
            return Ok(parts);
        }

        let open = find_top_level(line, '(')
            .ok_or_else(|| SignatureError::malformed(text, "missing parameter list"))?;
        let close = matching_paren(line, open)
            .ok_or_else(|| SignatureError::malformed(text, "unbalanced parameter list"))?;

        let head = split_top_level_whitespace(&line[..open]);
        let (name, prefix) = head
            .split_last()
            .ok_or_else(|| SignatureError::malformed(text, "missing member name"))?;

        let mut return_type = None;
        for token in prefix {
            if token.starts_with('@') || *token == "default" {
                continue;
            }
            if let Some(modifier) = Modifier::from_keyword(token) {
                parts.modifier |= modifier.bit();
                parts.modifiers.push(modifier.keyword().to_string());
            } else if token.starts_with('<') {
                parts.generics = parse_generics_declaration(token);
            } else if return_type.is_none() {
                return_type = Some(normalize_varargs(token));
            } else {
                return Err(SignatureError::malformed(text, format!("unexpected token '{}'", token)));
            }
        }

        parts.param_types = split_type_params(&line[open + 1..close])
            .into_iter()
            .map(parameter_type)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| SignatureError::malformed(text, reason))?;

        match return_type {
            Some(return_type) => {
                parts.member_name = name.to_string();
                parts.return_type = return_type;
            }
            None => {
                // Constructor: javap prints the qualified class name.
                parts.member_name = if class_name.is_empty() {
                    name.to_string()
                } else {
                    class_name.to_string()
                };
                if parts.class_name.is_empty() {
                    parts.class_name = name.to_string();
                }
            }
        }
        Ok(parts)
    }

    /// Build from a resolved class-file member.
    pub fn from_runtime_member(member: &RuntimeMember, class_name: &str) -> Self {
        let mut parts = Self::empty(class_name);
        parts.set_modifier_bits(member.modifiers);
        parts.member_name = member.name.clone();
        parts.return_type = member.return_type.to_string();
        // Varargs stay in array form; `...` is only a source spelling.
        parts.param_types = member.params.iter().map(|p| p.to_string()).collect();
        parts
    }

    pub fn is_constructor(&self) -> bool {
        !self.class_name.is_empty() && self.member_name == self.class_name
    }

    pub fn is_static_initializer(&self) -> bool {
        self.member_name == CLINIT_NAME
    }

    /// Assembly-decoder key, e.g. `java.lang.String::hashCode`.
    pub fn mangled_name(&self) -> String {
        let name = if self.is_constructor() {
            INIT_NAME
        } else {
            self.member_name.as_str()
        };
        format!("{}::{}", self.class_name, name)
    }

    /// Ordering key used by sorted member lists.
    pub fn sort_key(&self) -> (&str, &[String]) {
        (&self.member_name, &self.param_types)
    }

    fn set_name(&mut self, log_name: &str, return_type: String) {
        if log_name == INIT_NAME {
            self.member_name = self.class_name.clone();
            self.return_type = VOID.to_string();
        } else {
            if log_name == CLINIT_NAME && self.modifier == 0 {
                self.set_modifier_bits(Modifier::Static.bit());
            }
            self.member_name = log_name.to_string();
            self.return_type = return_type;
        }
    }

    fn set_modifier_bits(&mut self, bits: u32) {
        self.modifier = bits;
        self.modifiers = Modifier::from_bits(bits)
            .into_iter()
            .map(|m| m.keyword().to_string())
            .collect();
    }
}

impl fmt::Display for MemberSignatureParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{} ", modifier)?;
        }
        if self.is_static_initializer() {
            return write!(f, "{{}}");
        }
        if !self.is_constructor() {
            write!(f, "{} ", self.return_type)?;
        }
        write!(f, "{}({})", self.member_name, self.param_types.join(", "))
    }
}

/// Source spelling of a raw dictionary `type`/`klass` name.
fn log_type_name(raw: &str) -> Result<String, SignatureError> {
    if let Some(primitive) = Primitive::from_name(raw) {
        return Ok(primitive.name().to_string());
    }
    Ok(TypeDesc::from_internal_name(raw)?.to_string())
}

/// `T...` to `T[]`.
fn normalize_varargs(token: &str) -> String {
    match token.strip_suffix("...") {
        Some(component) => format!("{}[]", component.trim_end()),
        None => token.to_string(),
    }
}

/// Type of one javap parameter, dropping annotations, `final` and any name.
fn parameter_type(param: &str) -> Result<String, String> {
    let tokens: Vec<&str> = split_top_level_whitespace(param)
        .into_iter()
        .filter(|t| !t.starts_with('@') && *t != "final")
        .collect();

    // A trailing plain identifier after a type token is the parameter name.
    let type_tokens = match tokens.as_slice() {
        [] => return Err(format!("empty parameter in '{}'", param)),
        [ty] => vec![*ty],
        [rest @ .., last] if is_java_identifier(last) => rest.to_vec(),
        all => all.to_vec(),
    };

    // Tokens left over are a split spelling such as `String ...` or `int []`.
    Ok(normalize_varargs(&type_tokens.concat()))
}

/// `<T extends java.lang.Comparable<? super T>, U>` to `{T: java.lang.Comparable, U: java.lang.Object}`.
fn parse_generics_declaration(token: &str) -> BTreeMap<String, String> {
    let inner = token
        .strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .unwrap_or(token);
    split_type_params(inner)
        .into_iter()
        .filter_map(|decl| {
            let mut words = decl.splitn(2, " extends ");
            let var = words.next()?.trim();
            if var.is_empty() {
                return None;
            }
            let bound = words
                .next()
                .and_then(|b| b.split('&').next())
                .map(|b| strip_generics(b.trim()))
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| OBJECT.to_string());
            Some((var.to_string(), bound))
        })
        .collect()
}

fn find_top_level(s: &str, target: char) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            c if c == target && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in s[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_parameter_names() {
        let parts = MemberSignatureParts::from_bytecode_signature(
            "public final java.lang.String getName(int index)",
            "com.example.Person",
        )
        .unwrap();
        assert_eq!(parts.modifiers, vec!["public", "final"]);
        assert_eq!(parts.return_type, "java.lang.String");
        assert_eq!(parts.member_name, "getName");
        assert_eq!(parts.param_types, vec!["int"]);
        assert_eq!(parts.modifier, Modifier::Public.bit() | Modifier::Final.bit());
    }

    #[test]
    fn test_generics_declaration_and_params() {
        let parts = MemberSignatureParts::from_bytecode_signature(
            "public static <T extends java.lang.Comparable<? super T>, U> void sort(java.util.List<T>, java.util.Map<U, T> lookup) throws java.io.IOException;",
            "com.example.Sorter",
        )
        .unwrap();
        assert_eq!(parts.generics.get("T").map(String::as_str), Some("java.lang.Comparable"));
        assert_eq!(parts.generics.get("U").map(String::as_str), Some("java.lang.Object"));
        assert_eq!(parts.return_type, "void");
        assert_eq!(parts.member_name, "sort");
        assert_eq!(parts.param_types, vec!["java.util.List<T>", "java.util.Map<U, T>"]);
    }

    #[test]
    fn test_varargs_final_and_annotations() {
        let parts = MemberSignatureParts::from_bytecode_signature(
            "public static java.lang.String format(final java.lang.String fmt, @Nullable java.lang.Object... args)",
            "java.lang.String",
        )
        .unwrap();
        assert_eq!(parts.param_types, vec!["java.lang.String", "java.lang.Object[]"]);
    }

    #[test]
    fn test_constructor_and_static_initializer() {
        let ctor = MemberSignatureParts::from_bytecode_signature("public com.example.Widget(int, long);", "com.example.Widget")
            .unwrap();
        assert!(ctor.is_constructor());
        assert_eq!(ctor.member_name, "com.example.Widget");
        assert_eq!(ctor.return_type, "void");
        assert_eq!(ctor.param_types, vec!["int", "long"]);
        assert_eq!(ctor.to_string(), "public com.example.Widget(int, long)");

        let clinit = MemberSignatureParts::from_bytecode_signature("static {};", "com.example.Widget").unwrap();
        assert!(clinit.is_static_initializer());
        assert_eq!(clinit.modifiers, vec!["static"]);
    }

    #[test]
    fn test_interface_default_method() {
        let parts = MemberSignatureParts::from_bytecode_signature(
            "public default void forEach(java.util.function.Consumer<? super T>)",
            "java.lang.Iterable",
        )
        .unwrap();
        assert_eq!(parts.modifiers, vec!["public"]);
        assert_eq!(parts.member_name, "forEach");
        assert_eq!(parts.param_types, vec!["java.util.function.Consumer<? super T>"]);
    }

    #[test]
    fn test_log_signature() {
        let parts = MemberSignatureParts::from_log_signature("java/lang/String charAt (I)C").unwrap();
        assert_eq!(parts.class_name, "java.lang.String");
        assert_eq!(parts.member_name, "charAt");
        assert_eq!(parts.return_type, "char");
        assert_eq!(parts.param_types, vec!["int"]);

        let ctor = MemberSignatureParts::from_log_signature("java/util/ArrayList <init> (I)V").unwrap();
        assert!(ctor.is_constructor());
        assert_eq!(ctor.member_name, "java.util.ArrayList");

        let clinit = MemberSignatureParts::from_log_signature("com/example/Widget <clinit> ()V").unwrap();
        assert_eq!(clinit.member_name, "<clinit>");
        assert_eq!(clinit.mangled_name(), "com.example.Widget::<clinit>");

        let arrays =
            MemberSignatureParts::from_log_signature("java/util/Arrays copyOf ([Ljava/lang/Object;I)[Ljava/lang/Object;")
                .unwrap();
        assert_eq!(arrays.param_types, vec!["java.lang.Object[]", "int"]);
        assert_eq!(arrays.return_type, "java.lang.Object[]");
    }

    #[test]
    fn test_log_signature_errors() {
        assert!(MemberSignatureParts::from_log_signature("garbage").is_err());
        assert!(MemberSignatureParts::from_log_signature("a/B name (Q)V").is_err());
        assert!(MemberSignatureParts::from_log_signature("a/B name").is_err());
    }

    fn tag(name: &str, pairs: &[(&str, &str)]) -> Tag {
        Tag::new(
            name,
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            true,
        )
    }

    #[test]
    fn test_dictionary_method() {
        let mut dict = ParseDictionary::new();
        dict.register(&tag("type", &[("id", "1"), ("name", "int")]));
        dict.register(&tag("type", &[("id", "2"), ("name", "void")]));
        dict.register(&tag("klass", &[("id", "3"), ("name", "java/lang/String")]));
        dict.register(&tag("klass", &[("id", "4"), ("name", "[Ljava/lang/Object;")]));
        let method = tag(
            "method",
            &[("id", "5"), ("holder", "3"), ("name", "valueOf"), ("return", "3"), ("arguments", "4 1"), ("flags", "9")],
        );
        dict.register(&method);

        let parts = MemberSignatureParts::from_dictionary_method(&method, &dict).unwrap();
        assert_eq!(parts.class_name, "java.lang.String");
        assert_eq!(parts.member_name, "valueOf");
        assert_eq!(parts.return_type, "java.lang.String");
        assert_eq!(parts.param_types, vec!["java.lang.Object[]", "int"]);
        assert_eq!(parts.modifiers, vec!["public", "static"]);

        let ctor = tag("method", &[("id", "6"), ("holder", "3"), ("name", "<init>"), ("return", "2")]);
        let parts = MemberSignatureParts::from_dictionary_method(&ctor, &dict).unwrap();
        assert!(parts.is_constructor());
    }

    #[test]
    fn test_dictionary_method_missing_id() {
        let dict = ParseDictionary::new();
        let method = tag("method", &[("id", "5"), ("holder", "3"), ("name", "x"), ("return", "1")]);
        let err = MemberSignatureParts::from_dictionary_method(&method, &dict).unwrap_err();
        assert_eq!(
            err,
            SignatureError::MissingDictionaryId {
                method_id: "5".to_string(),
                missing: "3".to_string()
            }
        );
    }

    #[test]
    fn test_runtime_member_varargs_spelling() {
        let member = RuntimeMember::method(
            "format",
            Modifier::Public.bit() | Modifier::Static.bit(),
            vec![TypeDesc::class("java.lang.String"), TypeDesc::array_of(TypeDesc::class("java.lang.Object"))],
            TypeDesc::class("java.lang.String"),
        )
        .with_varargs();
        let parts = MemberSignatureParts::from_runtime_member(&member, "java.lang.String");
        assert_eq!(parts.param_types, vec!["java.lang.String", "java.lang.Object[]"]);
        assert_eq!(
            parts.to_string(),
            "public static java.lang.String format(java.lang.String, java.lang.Object[])"
        );
    }
}
