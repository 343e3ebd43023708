//! Resolved ("reflected") class and member metadata.

use serde::{Deserialize, Serialize};

use jit_types::{Modifier, TypeDesc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    Method,
    Constructor,
}

/// One method or constructor as declared in a class file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeMember {
    /// Method name; for constructors the declaring class's dotted name.
    pub name: String,
    pub kind: MemberKind,
    /// `java.lang.reflect.Modifier` bits.
    pub modifiers: u32,
    pub params: Vec<TypeDesc>,
    pub return_type: TypeDesc,
    pub varargs: bool,
    /// `MethodHandle.invoke`-style members that accept any call shape.
    pub polymorphic_signature: bool,
}

impl RuntimeMember {
    pub fn method(name: impl Into<String>, modifiers: u32, params: Vec<TypeDesc>, return_type: TypeDesc) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method,
            modifiers,
            params,
            return_type,
            varargs: false,
            polymorphic_signature: false,
        }
    }

    pub fn constructor(class_name: impl Into<String>, modifiers: u32, params: Vec<TypeDesc>) -> Self {
        Self {
            name: class_name.into(),
            kind: MemberKind::Constructor,
            modifiers,
            params,
            return_type: TypeDesc::Primitive(jit_types::Primitive::Void),
            varargs: false,
            polymorphic_signature: false,
        }
    }

    pub fn with_varargs(mut self) -> Self {
        self.varargs = true;
        self
    }

    pub fn with_polymorphic_signature(mut self) -> Self {
        self.polymorphic_signature = true;
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == MemberKind::Constructor
    }

    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        modifier.is_set(self.modifiers)
    }
}

/// A class loaded through a [`ClassResolver`](crate::ClassResolver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedClass {
    /// Dotted fully-qualified name.
    pub name: String,
    pub is_interface: bool,
    /// Methods and constructors in class-file order; `<clinit>` included.
    pub members: Vec<RuntimeMember>,
    pub source_file: Option<String>,
}

impl ResolvedClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_interface: false,
            members: Vec::new(),
            source_file: None,
        }
    }

    pub fn with_member(mut self, member: RuntimeMember) -> Self {
        self.members.push(member);
        self
    }

    pub fn methods(&self) -> impl Iterator<Item = &RuntimeMember> {
        self.members.iter().filter(|m| !m.is_constructor())
    }

    pub fn constructors(&self) -> impl Iterator<Item = &RuntimeMember> {
        self.members.iter().filter(|m| m.is_constructor())
    }
}
