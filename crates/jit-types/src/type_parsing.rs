//! Java type-name parsing utilities.
//!
//! The same Java type shows up in three spellings across a JIT analysis:
//! - field/method descriptors from class files and LogCompilation
//!   (`[Ljava/lang/String;`, `(IJ)V`)
//! - `Class.getName()` encodings (`[Ljava.lang.String;`, `I`)
//! - source names as printed by javap (`java.lang.String[]`, `int`)
//!
//! [`TypeDesc`] is the common currency. Its `Display` form is the source name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Java primitive types plus `void`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Primitive {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl Primitive {
    pub const ALL: [Primitive; 9] = [
        Primitive::Boolean,
        Primitive::Byte,
        Primitive::Char,
        Primitive::Short,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
        Primitive::Void,
    ];

    /// Source keyword, e.g. `int`.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Char => "char",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Void => "void",
        }
    }

    /// Descriptor letter, e.g. `I`.
    pub fn descriptor(self) -> char {
        match self {
            Primitive::Boolean => 'Z',
            Primitive::Byte => 'B',
            Primitive::Char => 'C',
            Primitive::Short => 'S',
            Primitive::Int => 'I',
            Primitive::Long => 'J',
            Primitive::Float => 'F',
            Primitive::Double => 'D',
            Primitive::Void => 'V',
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    pub fn from_descriptor(letter: char) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.descriptor() == letter)
    }
}

/// A resolved Java type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeDesc {
    Primitive(Primitive),
    /// Fully qualified, dot-separated class name (nested classes keep `$`).
    Class(String),
    Array(Box<TypeDesc>),
}

impl TypeDesc {
    pub fn class(name: impl Into<String>) -> Self {
        TypeDesc::Class(name.into())
    }

    pub fn array_of(component: TypeDesc) -> Self {
        TypeDesc::Array(Box::new(component))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeDesc::Array(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeDesc::Primitive(Primitive::Void))
    }

    pub fn component(&self) -> Option<&TypeDesc> {
        match self {
            TypeDesc::Array(inner) => Some(inner),
            _ => None,
        }
    }

    /// Source spelling, e.g. `java.lang.String[][]`.
    pub fn source_name(&self) -> String {
        self.to_string()
    }

    /// Descriptor spelling, e.g. `[[Ljava/lang/String;`.
    pub fn descriptor(&self) -> String {
        match self {
            TypeDesc::Primitive(p) => p.descriptor().to_string(),
            TypeDesc::Class(name) => format!("L{};", name.replace('.', "/")),
            TypeDesc::Array(inner) => format!("[{}", inner.descriptor()),
        }
    }

    /// Parse a single field descriptor, requiring the whole input to be consumed.
    pub fn from_descriptor(descriptor: &str) -> Result<Self, DescriptorError> {
        let (ty, rest) = parse_field_type(descriptor)?;
        if !rest.is_empty() {
            return Err(DescriptorError::TrailingInput(descriptor.to_string()));
        }
        Ok(ty)
    }

    /// Parse a LogCompilation / class-file class name.
    ///
    /// Accepts `java/lang/String`, `java.lang.String` and array encodings such as
    /// `[Ljava/lang/Object;` or `[I`.
    pub fn from_internal_name(name: &str) -> Result<Self, DescriptorError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DescriptorError::Empty);
        }
        if name.starts_with('[') {
            return TypeDesc::from_descriptor(&name.replace('.', "/"));
        }
        Ok(TypeDesc::Class(name.replace('/', ".")))
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Primitive(p) => write!(f, "{}", p.name()),
            TypeDesc::Class(name) => write!(f, "{}", name),
            TypeDesc::Array(inner) => write!(f, "{}[]", inner),
        }
    }
}

/// Parameter and return types of a method descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub params: Vec<TypeDesc>,
    pub return_type: TypeDesc,
}

impl MethodDescriptor {
    /// Parse `(ILjava/lang/String;)V` style descriptors.
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let descriptor = descriptor.trim();
        let body = descriptor
            .strip_prefix('(')
            .ok_or_else(|| DescriptorError::Malformed(descriptor.to_string()))?;
        let close = body
            .find(')')
            .ok_or_else(|| DescriptorError::Malformed(descriptor.to_string()))?;

        let mut params = Vec::new();
        let mut rest = &body[..close];
        while !rest.is_empty() {
            let (ty, remaining) = parse_field_type(rest)?;
            params.push(ty);
            rest = remaining;
        }

        let return_type = TypeDesc::from_descriptor(&body[close + 1..])?;
        Ok(Self {
            params,
            return_type,
        })
    }
}

/// Errors from descriptor parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    Empty,
    Malformed(String),
    UnknownType(char),
    TrailingInput(String),
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorError::Empty => write!(f, "empty descriptor"),
            DescriptorError::Malformed(d) => write!(f, "malformed descriptor: {}", d),
            DescriptorError::UnknownType(c) => write!(f, "unknown descriptor type '{}'", c),
            DescriptorError::TrailingInput(d) => {
                write!(f, "unexpected trailing input in descriptor: {}", d)
            }
        }
    }
}

impl std::error::Error for DescriptorError {}

fn parse_field_type(input: &str) -> Result<(TypeDesc, &str), DescriptorError> {
    let mut chars = input.chars();
    let first = chars.next().ok_or(DescriptorError::Empty)?;
    match first {
        '[' => {
            let (inner, rest) = parse_field_type(&input[1..])?;
            Ok((TypeDesc::Array(Box::new(inner)), rest))
        }
        'L' => {
            let end = input
                .find(';')
                .ok_or_else(|| DescriptorError::Malformed(input.to_string()))?;
            let name = &input[1..end];
            if name.is_empty() {
                return Err(DescriptorError::Malformed(input.to_string()));
            }
            Ok((TypeDesc::Class(name.replace('/', ".")), &input[end + 1..]))
        }
        other => {
            let primitive =
                Primitive::from_descriptor(other).ok_or(DescriptorError::UnknownType(other))?;
            Ok((TypeDesc::Primitive(primitive), &input[1..]))
        }
    }
}

/// Split type parameters respecting nested angle brackets.
///
/// Given "A, B<C, D>, E", returns ["A", "B<C, D>", "E"] by tracking bracket depth.
pub fn split_type_params(s: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                result.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    if start < s.len() && !s[start..].trim().is_empty() {
        result.push(s[start..].trim());
    }

    result
}

/// Split on whitespace that sits outside any `<...>` group.
///
/// `"public <T extends Comparable<? super T>> void"` yields three tokens.
pub fn split_top_level_whitespace(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0i32;
    let mut start: Option<usize> = None;

    for (i, c) in s.char_indices() {
        match c {
            '<' => {
                depth += 1;
                start.get_or_insert(i);
            }
            '>' => {
                depth -= 1;
                start.get_or_insert(i);
            }
            c if c.is_whitespace() && depth == 0 => {
                if let Some(begin) = start.take() {
                    tokens.push(&s[begin..i]);
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if let Some(begin) = start {
        tokens.push(&s[begin..]);
    }
    tokens
}

/// Remove every `<...>` group: `java.util.Map<K, V>[]` becomes `java.util.Map[]`.
pub fn strip_generics(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0i32;
    for c in s.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// True for a plain Java identifier (no package dots, brackets or generics).
pub fn is_java_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Package part of a dotted class name; empty for the default package.
pub fn package_of(fqcn: &str) -> &str {
    fqcn.rsplit_once('.').map(|(pkg, _)| pkg).unwrap_or("")
}

/// Simple name of a dotted class name.
pub fn simple_name_of(fqcn: &str) -> &str {
    fqcn.rsplit_once('.').map(|(_, name)| name).unwrap_or(fqcn)
}
