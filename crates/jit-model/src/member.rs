//! Methods and constructors with their compile history.

use std::collections::BTreeMap;
use std::sync::Arc;

use jit_resolver::{MemberSignatureParts, RuntimeMember};
use jit_tags::Tag;
use jit_types::TypeDesc;

use crate::assembly::AssemblyBlock;
use crate::compilation::Compilation;
use crate::package::ClassId;

/// Attribute key under which the queue-to-emit delay is stored.
pub const ATTR_COMPILE_MILLIS: &str = "compileMillis";

/// State shared by both member variants.
#[derive(Debug, Clone)]
pub struct MemberCore {
    pub signature: MemberSignatureParts,
    pub runtime: RuntimeMember,
    pub class: ClassId,
    /// Attributes of a `task_queued` still waiting for its `nmethod`.
    pub queued_attrs: BTreeMap<String, String>,
    pub compiled_attrs: BTreeMap<String, String>,
    /// One record per compile event; never overwritten.
    pub compilations: Vec<Compilation>,
    /// Every raw tag recorded for this member, in arrival order.
    pub journal: Vec<Arc<Tag>>,
    pub assembly: Vec<AssemblyBlock>,
    /// `make_not_entrant` count.
    pub decompile_count: u32,
}

impl MemberCore {
    pub fn new(runtime: RuntimeMember, class: ClassId, class_name: &str) -> Self {
        Self {
            signature: MemberSignatureParts::from_runtime_member(&runtime, class_name),
            runtime,
            class,
            queued_attrs: BTreeMap::new(),
            compiled_attrs: BTreeMap::new(),
            compilations: Vec::new(),
            journal: Vec::new(),
            assembly: Vec::new(),
            decompile_count: 0,
        }
    }

    pub fn compilation(&self, compile_id: &str) -> Option<&Compilation> {
        self.compilations.iter().find(|c| c.compile_id == compile_id)
    }

    /// Existing record for `compile_id`, or a new one appended to the history.
    pub fn compilation_mut(&mut self, compile_id: &str) -> &mut Compilation {
        let index = match self.compilations.iter().position(|c| c.compile_id == compile_id) {
            Some(index) => index,
            None => {
                let index = self.compilations.len();
                self.compilations.push(Compilation::new(compile_id, index));
                index
            }
        };
        &mut self.compilations[index]
    }

    pub fn add_to_journal(&mut self, tag: Arc<Tag>) {
        self.journal.push(tag);
    }
}

#[derive(Debug, Clone)]
pub struct MetaMethod {
    pub core: MemberCore,
    pub return_type: TypeDesc,
}

#[derive(Debug, Clone)]
pub struct MetaConstructor {
    pub core: MemberCore,
}

/// A method or constructor known to the model.
#[derive(Debug, Clone)]
pub enum MetaMember {
    Method(MetaMethod),
    Constructor(MetaConstructor),
}

impl MetaMember {
    pub fn new(runtime: RuntimeMember, class: ClassId, class_name: &str) -> Self {
        if runtime.is_constructor() {
            MetaMember::Constructor(MetaConstructor {
                core: MemberCore::new(runtime, class, class_name),
            })
        } else {
            let return_type = runtime.return_type.clone();
            MetaMember::Method(MetaMethod {
                core: MemberCore::new(runtime, class, class_name),
                return_type,
            })
        }
    }

    pub fn core(&self) -> &MemberCore {
        match self {
            MetaMember::Method(m) => &m.core,
            MetaMember::Constructor(c) => &c.core,
        }
    }

    pub fn core_mut(&mut self) -> &mut MemberCore {
        match self {
            MetaMember::Method(m) => &mut m.core,
            MetaMember::Constructor(c) => &mut c.core,
        }
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self, MetaMember::Constructor(_))
    }

    pub fn signature(&self) -> &MemberSignatureParts {
        &self.core().signature
    }

    pub fn class_id(&self) -> ClassId {
        self.core().class
    }

    pub fn modifiers(&self) -> u32 {
        self.core().runtime.modifiers
    }

    pub fn queued_attrs(&self) -> &BTreeMap<String, String> {
        &self.core().queued_attrs
    }

    pub fn compiled_attrs(&self) -> &BTreeMap<String, String> {
        &self.core().compiled_attrs
    }

    pub fn compilations(&self) -> &[Compilation] {
        &self.core().compilations
    }

    pub fn last_compilation(&self) -> Option<&Compilation> {
        self.core().compilations.last()
    }

    pub fn journal(&self) -> &[Arc<Tag>] {
        &self.core().journal
    }

    pub fn assembly(&self) -> &[AssemblyBlock] {
        &self.core().assembly
    }

    pub fn decompile_count(&self) -> u32 {
        self.core().decompile_count
    }

    /// True while the latest queued compile has not been emitted.
    pub fn is_queued(&self) -> bool {
        !self.core().queued_attrs.is_empty()
    }

    pub fn is_compiled(&self) -> bool {
        !self.core().compiled_attrs.is_empty()
    }

    /// Queue-to-emit delay of the latest compiled event.
    pub fn compile_millis(&self) -> Option<u64> {
        self.core()
            .compiled_attrs
            .get(ATTR_COMPILE_MILLIS)
            .and_then(|v| v.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jit_types::Primitive;

    #[test]
    fn test_variant_from_runtime_member() {
        let method = MetaMember::new(
            RuntimeMember::method("size", 1, vec![], TypeDesc::Primitive(Primitive::Int)),
            ClassId(0),
            "a.B",
        );
        assert!(!method.is_constructor());
        assert_eq!(method.signature().return_type, "int");

        let ctor = MetaMember::new(RuntimeMember::constructor("a.B", 1, vec![]), ClassId(0), "a.B");
        assert!(ctor.is_constructor());
        assert!(ctor.signature().is_constructor());
        assert!(!ctor.is_queued());
        assert!(!ctor.is_compiled());
    }

    #[test]
    fn test_compilation_history_appends() {
        let mut member = MetaMember::new(RuntimeMember::constructor("a.B", 1, vec![]), ClassId(0), "a.B");
        let core = member.core_mut();
        core.compilation_mut("1").level = Some(3);
        core.compilation_mut("2");
        core.compilation_mut("1").level = Some(4);

        assert_eq!(member.compilations().len(), 2);
        assert_eq!(member.compilations()[0].level, Some(4));
        assert_eq!(member.compilations()[1].index, 1);
        assert_eq!(member.last_compilation().map(|c| c.compile_id.as_str()), Some("2"));
    }
}
