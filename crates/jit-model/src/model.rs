//! The shared, lock-protected JIT data model.
//!
//! A single parser thread writes through the `record_*` operations while any
//! number of readers poll. Every accessor returns an owned copy so no lock is
//! held while a reader walks the result.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use jit_bytecode::{BytecodeProvider, ClassBC};
use jit_resolver::{member_matches, ClassResolver, MemberSignatureParts, RuntimeMember};
use jit_tags::names::{
    ATTR_ADDRESS, ATTR_COMPILE_ID, ATTR_FREE_CODE_CACHE, ATTR_METHOD, ATTR_STAMP, TAG_TASK_DONE,
};
use jit_tags::Tag;

use crate::assembly::AssemblyProvider;
use crate::compilation::{parse_stamp_millis, CompileKind};
use crate::errors::ModelError;
use crate::events::{CodeCacheEvent, CodeCacheEventKind, JitEvent, JitEventKind, VmVersion};
use crate::member::{MemberCore, MetaMember, ATTR_COMPILE_MILLIS};
use crate::package::{ClassId, MemberId, MetaClass, MetaPackage, PackageId, PackageManager};
use crate::stats::{CompiledEvent, JitStats};

#[derive(Debug, Default)]
struct ModelState {
    packages: PackageManager,
    stats: JitStats,
    events: Vec<JitEvent>,
    code_cache: Vec<CodeCacheEvent>,
    vm_version: Option<VmVersion>,
    compile_ids: HashMap<String, MemberId>,
    unresolved: BTreeSet<String>,
}

/// Package, class and member graph plus session-wide timelines and stats.
#[derive(Debug, Default)]
pub struct JitDataModel {
    state: RwLock<ModelState>,
}

impl JitDataModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear everything in one step; readers see either the old or the empty model.
    pub fn reset(&self) {
        *self.state.write() = ModelState::default();
    }

    // ========================================================================
    // Classes and lookup
    // ========================================================================

    /// Load a class and all its members, or return the existing entry.
    ///
    /// Resolution happens outside the lock. A failure is counted once in
    /// [`JitStats::unresolved_classes`] and remembered so later units do not
    /// retry it.
    pub fn build_meta_class(&self, fqcn: &str, resolver: &dyn ClassResolver) -> Result<ClassId, ModelError> {
        {
            let state = self.state.read();
            if let Some(id) = state.packages.class_by_name(fqcn) {
                return Ok(id);
            }
            if state.unresolved.contains(fqcn) {
                return Err(ModelError::UnresolvedClass {
                    class: fqcn.to_string(),
                    error: jit_resolver::ResolveError::ClassNotFound(fqcn.to_string()),
                });
            }
        }

        match resolver.resolve(fqcn) {
            Ok(resolved) => {
                let mut state = self.state.write();
                if let Some(id) = state.packages.class_by_name(fqcn) {
                    return Ok(id);
                }
                let id = state.packages.add_class(&resolved);
                state.stats.classes_loaded += 1;
                debug!(class = fqcn, members = resolved.members.len(), "class added to model");
                Ok(id)
            }
            Err(error) => {
                let mut state = self.state.write();
                if state.unresolved.insert(fqcn.to_string()) {
                    state.stats.unresolved_classes += 1;
                }
                debug!(class = fqcn, error = %error, "class could not be resolved");
                Err(ModelError::UnresolvedClass {
                    class: fqcn.to_string(),
                    error,
                })
            }
        }
    }

    /// First member of `class` matching `parts`.
    pub fn find_member_with_signature(
        &self,
        class: ClassId,
        parts: &MemberSignatureParts,
        resolver: &dyn ClassResolver,
    ) -> Option<MemberId> {
        let candidates: Vec<(MemberId, RuntimeMember)> = {
            let state = self.state.read();
            let meta = state.packages.class(class)?;
            meta.member_ids()
                .filter_map(|id| {
                    state
                        .packages
                        .member(id)
                        .map(|m| (id, m.core().runtime.clone()))
                })
                .collect()
        };
        candidates
            .into_iter()
            .find(|(_, runtime)| member_matches(parts, runtime, resolver))
            .map(|(id, _)| id)
    }

    /// Load `parts.class_name` if needed, then find the matching member.
    pub fn find_member(&self, parts: &MemberSignatureParts, resolver: &dyn ClassResolver) -> Result<MemberId, ModelError> {
        let class = self.build_meta_class(&parts.class_name, resolver)?;
        self.find_member_with_signature(class, parts, resolver)
            .ok_or_else(|| ModelError::MemberNotFound {
                signature: parts.to_string(),
            })
    }

    pub fn find_member_by_log_signature(&self, text: &str, resolver: &dyn ClassResolver) -> Result<MemberId, ModelError> {
        let parts = MemberSignatureParts::from_log_signature(text)?;
        self.find_member(&parts, resolver)
    }

    fn member_for_tag(&self, tag: &Tag, resolver: &dyn ClassResolver) -> Result<MemberId, ModelError> {
        if let Some(id) = tag
            .attribute(ATTR_COMPILE_ID)
            .and_then(|cid| self.state.read().compile_ids.get(cid).copied())
        {
            return Ok(id);
        }
        let method = tag.attribute(ATTR_METHOD).ok_or_else(|| ModelError::MissingAttribute {
            tag: tag.name().to_string(),
            attribute: ATTR_METHOD,
        })?;
        self.find_member_by_log_signature(method, resolver)
    }

    fn compile_id_of(tag: &Tag) -> Result<String, ModelError> {
        tag.attribute(ATTR_COMPILE_ID)
            .map(str::to_string)
            .ok_or_else(|| ModelError::MissingAttribute {
                tag: tag.name().to_string(),
                attribute: ATTR_COMPILE_ID,
            })
    }

    // ========================================================================
    // Log units
    // ========================================================================

    pub fn record_task_queued(&self, tag: Arc<Tag>, resolver: &dyn ClassResolver) -> Result<MemberId, ModelError> {
        let compile_id = Self::compile_id_of(&tag)?;
        let id = self.member_for_tag(&tag, resolver)?;

        let mut state = self.state.write();
        let state = &mut *state;
        let member = state
            .packages
            .member_mut(id)
            .ok_or_else(|| ModelError::UnknownCompileId(compile_id.clone()))?;
        let core = member.core_mut();
        core.queued_attrs = tag.attribute_map();
        let compilation = core.compilation_mut(&compile_id);
        compilation.set_task_queued(Arc::clone(&tag));
        let event = JitEvent {
            stamp_ms: compilation.queued_stamp.unwrap_or(0),
            kind: JitEventKind::Queued,
            member: id,
            compile_id: compile_id.clone(),
            level: compilation.level,
        };
        core.add_to_journal(tag);

        state.events.push(event);
        state.compile_ids.insert(compile_id, id);
        Ok(id)
    }

    /// Apply an `nmethod`: finalise the compiled attributes, fold the event
    /// into the stats and record timeline and code-cache entries.
    pub fn record_nmethod(&self, tag: Arc<Tag>, resolver: &dyn ClassResolver) -> Result<MemberId, ModelError> {
        let compile_id = Self::compile_id_of(&tag)?;
        let id = self.member_for_tag(&tag, resolver)?;

        let mut state = self.state.write();
        let state = &mut *state;
        let member = state
            .packages
            .member_mut(id)
            .ok_or_else(|| ModelError::UnknownCompileId(compile_id.clone()))?;
        let is_constructor = member.is_constructor();
        let modifiers = member.modifiers();
        let core = member.core_mut();

        let compilation = core.compilation_mut(&compile_id);
        compilation.set_nmethod(Arc::clone(&tag));
        let delay = compilation.queued_to_emitted_millis();
        let stamp = compilation.emitted_stamp.unwrap_or(0);
        let kind = compilation.kind;
        let level = compilation.level;
        let native_size = compilation.native_size;
        let compiler = compilation.compiler.clone();

        let mut compiled = tag.attribute_map();
        if let Some(delay) = delay {
            compiled.insert(ATTR_COMPILE_MILLIS.to_string(), delay.to_string());
        }
        core.compiled_attrs = compiled;
        // The event has left the queue.
        core.queued_attrs.clear();
        core.add_to_journal(Arc::clone(&tag));

        state.stats.record_compiled(&CompiledEvent {
            modifiers,
            is_constructor,
            compiler: compiler.as_deref(),
            kind,
            native_size,
            delay_ms: delay,
        });

        let event_kind = match (kind, compiler.as_deref()) {
            (CompileKind::Osr, _) => JitEventKind::NMethodOsr,
            (CompileKind::C2n, _) => JitEventKind::NMethodC2N,
            (_, Some(c)) if c.eq_ignore_ascii_case(jit_tags::names::COMPILER_C1) => JitEventKind::NMethodC1,
            _ => JitEventKind::NMethodC2,
        };
        state.events.push(JitEvent {
            stamp_ms: stamp,
            kind: event_kind,
            member: id,
            compile_id: compile_id.clone(),
            level,
        });
        state.code_cache.push(CodeCacheEvent {
            stamp_ms: stamp,
            kind: CodeCacheEventKind::Compilation,
            native_size,
            address: tag.attribute(ATTR_ADDRESS).map(str::to_string),
            free_bytes: None,
        });
        state.compile_ids.insert(compile_id, id);
        trace!(member = id.0, delay_ms = ?delay, "nmethod recorded");
        Ok(id)
    }

    /// Attach a completed compile `task` (with its dictionary) to its compilation.
    pub fn record_task(&self, tag: Arc<Tag>, resolver: &dyn ClassResolver) -> Result<MemberId, ModelError> {
        let compile_id = Self::compile_id_of(&tag)?;
        let id = self.member_for_tag(&tag, resolver)?;

        let mut state = self.state.write();
        let state = &mut *state;
        let member = state
            .packages
            .member_mut(id)
            .ok_or_else(|| ModelError::UnknownCompileId(compile_id.clone()))?;
        let core = member.core_mut();
        let done = tag.first_named_child(TAG_TASK_DONE);
        core.compilation_mut(&compile_id)
            .set_task(Arc::clone(&tag), done);
        core.add_to_journal(tag);
        state.compile_ids.insert(compile_id, id);
        Ok(id)
    }

    /// Journal a top-level tag for the member owning its `compile_id`
    /// (runtime `uncommon_trap` and similar).
    pub fn record_for_compile_id(&self, tag: Arc<Tag>) -> Result<MemberId, ModelError> {
        self.journal_by_compile_id(tag, |_| {})
    }

    pub fn record_make_not_entrant(&self, tag: Arc<Tag>) -> Result<MemberId, ModelError> {
        self.journal_by_compile_id(tag, |core| core.decompile_count += 1)
    }

    fn journal_by_compile_id<F>(&self, tag: Arc<Tag>, update: F) -> Result<MemberId, ModelError>
    where
        F: FnOnce(&mut MemberCore),
    {
        let compile_id = Self::compile_id_of(&tag)?;
        let mut state = self.state.write();
        let id = state
            .compile_ids
            .get(&compile_id)
            .copied()
            .ok_or(ModelError::UnknownCompileId(compile_id))?;
        if let Some(member) = state.packages.member_mut(id) {
            let core = member.core_mut();
            update(core);
            core.add_to_journal(tag);
        }
        Ok(id)
    }

    pub fn record_code_cache_sample(&self, tag: &Tag, kind: CodeCacheEventKind) {
        let event = CodeCacheEvent {
            stamp_ms: tag.attribute(ATTR_STAMP).and_then(parse_stamp_millis).unwrap_or(0),
            kind,
            native_size: None,
            address: None,
            free_bytes: tag.attribute(ATTR_FREE_CODE_CACHE).and_then(|f| f.parse().ok()),
        };
        self.state.write().code_cache.push(event);
    }

    pub fn set_vm_version(&self, version: VmVersion) {
        self.state.write().vm_version = Some(version);
    }

    pub fn attach_assembly(&self, provider: &dyn AssemblyProvider) -> usize {
        let mut attached = 0;
        let mut state = self.state.write();
        for member in state.packages.members_mut() {
            let blocks = provider.blocks_for(&member.signature().mangled_name());
            if !blocks.is_empty() {
                attached += 1;
                member.core_mut().assembly = blocks;
            }
        }
        attached
    }

    // ========================================================================
    // Copy-on-read accessors
    // ========================================================================

    pub fn stats(&self) -> JitStats {
        self.state.read().stats.clone()
    }

    pub fn events(&self) -> Vec<JitEvent> {
        self.state.read().events.clone()
    }

    pub fn code_cache_events(&self) -> Vec<CodeCacheEvent> {
        self.state.read().code_cache.clone()
    }

    pub fn vm_version(&self) -> Option<VmVersion> {
        self.state.read().vm_version.clone()
    }

    pub fn root_packages(&self) -> Vec<(PackageId, MetaPackage)> {
        let state = self.state.read();
        state
            .packages
            .root_packages()
            .into_iter()
            .filter_map(|id| state.packages.package(id).map(|p| (id, p.clone())))
            .collect()
    }

    pub fn package(&self, id: PackageId) -> Option<MetaPackage> {
        self.state.read().packages.package(id).cloned()
    }

    pub fn class(&self, id: ClassId) -> Option<MetaClass> {
        self.state.read().packages.class(id).cloned()
    }

    pub fn class_by_name(&self, fqcn: &str) -> Option<ClassId> {
        self.state.read().packages.class_by_name(fqcn)
    }

    /// All classes sorted by name.
    pub fn classes(&self) -> Vec<(ClassId, MetaClass)> {
        let state = self.state.read();
        state
            .packages
            .class_ids()
            .into_iter()
            .filter_map(|id| state.packages.class(id).map(|c| (id, c.clone())))
            .collect()
    }

    pub fn member(&self, id: MemberId) -> Option<MetaMember> {
        self.state.read().packages.member(id).cloned()
    }

    pub fn member_for_compile_id(&self, compile_id: &str) -> Option<MemberId> {
        self.state.read().compile_ids.get(compile_id).copied()
    }

    /// Members with at least one recorded compile event.
    pub fn compiled_members(&self) -> Vec<(MemberId, MetaMember)> {
        self.state
            .read()
            .packages
            .members()
            .filter(|(_, m)| !m.compilations().is_empty() || m.is_queued())
            .map(|(id, m)| (id, m.clone()))
            .collect()
    }

    /// Decoded bytecode for a class, fetched once and cached on the class.
    pub fn class_bytecode(&self, id: ClassId, provider: &dyn BytecodeProvider) -> Option<Arc<ClassBC>> {
        let (name, cell) = {
            let state = self.state.read();
            let class = state.packages.class(id)?;
            (class.name.clone(), Arc::clone(&class.bytecode))
        };
        let loaded = cell.get_or_init(|| match provider.load_class(&name) {
            Ok(bc) => Some(Arc::new(bc)),
            Err(e) => {
                debug!(class = %name, error = %e, "bytecode unavailable");
                None
            }
        });
        loaded.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jit_resolver::{ResolvedClass, StaticClassResolver};
    use jit_types::{Modifier, Primitive, TypeDesc};

    fn resolver() -> StaticClassResolver {
        let int = TypeDesc::Primitive(Primitive::Int);
        StaticClassResolver::new().with_class(
            ResolvedClass::new("com.example.Widget")
                .with_member(RuntimeMember::constructor("com.example.Widget", Modifier::Public.bit(), vec![]))
                .with_member(RuntimeMember::method(
                    "spin",
                    Modifier::Public.bit() | Modifier::Final.bit(),
                    vec![int.clone()],
                    int,
                )),
        )
    }

    fn tag(name: &str, pairs: &[(&str, &str)]) -> Arc<Tag> {
        Arc::new(Tag::new(
            name,
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            true,
        ))
    }

    const SPIN: &str = "com/example/Widget spin (I)I";

    fn compile(model: &JitDataModel, r: &StaticClassResolver, id: &str, compiler: &str, queued: &str, emitted: &str) -> MemberId {
        model
            .record_task_queued(
                tag("task_queued", &[("compile_id", id), ("method", SPIN), ("stamp", queued)]),
                r,
            )
            .unwrap();
        model
            .record_nmethod(
                tag(
                    "nmethod",
                    &[("compile_id", id), ("method", SPIN), ("stamp", emitted), ("compiler", compiler), ("size", "64")],
                ),
                r,
            )
            .unwrap()
    }

    #[test]
    fn test_nmethod_moves_member_from_queued_to_compiled() {
        let model = JitDataModel::new();
        let r = resolver();
        let id = model
            .record_task_queued(
                tag("task_queued", &[("compile_id", "7"), ("method", SPIN), ("stamp", "1.000")]),
                &r,
            )
            .unwrap();
        let member = model.member(id).unwrap();
        assert!(member.is_queued());
        assert!(!member.is_compiled());

        compile(&model, &r, "7", "C2", "1.000", "1.004");
        let member = model.member(id).unwrap();
        assert!(!member.is_queued());
        assert!(member.is_compiled());
        assert!(member.queued_attrs().is_empty());

        // A recompilation queues the member again.
        model
            .record_task_queued(
                tag("task_queued", &[("compile_id", "8"), ("method", SPIN), ("stamp", "2.000")]),
                &r,
            )
            .unwrap();
        let member = model.member(id).unwrap();
        assert!(member.is_queued());
        assert!(member.is_compiled());
    }

    #[test]
    fn test_compile_history_and_stats() {
        let model = JitDataModel::new();
        let r = resolver();
        let a = compile(&model, &r, "1", "C1", "1.000", "1.005");
        let b = compile(&model, &r, "2", "C2", "2.000", "2.010");
        let c = compile(&model, &r, "3", "C2", "3.000", "3.000");
        assert_eq!(a, b);
        assert_eq!(b, c);

        let member = model.member(a).unwrap();
        assert_eq!(member.compilations().len(), 3);
        assert!(!member.is_queued());
        assert!(member.is_compiled());
        assert_eq!(member.compile_millis(), Some(0));
        assert_eq!(member.journal().len(), 6);

        let stats = model.stats();
        assert_eq!(stats.total_compile_time_ms, 15);
        assert_eq!(stats.count_c1, 1);
        assert_eq!(stats.count_c2, 2);
        assert_eq!(stats.count_public, 3);
        assert_eq!(stats.count_final, 3);
        assert_eq!(stats.count_method, 3);
        assert_eq!(stats.classes_loaded, 1);
        assert_eq!(stats.total_native_bytes, 192);

        let events = model.events();
        assert_eq!(events.len(), 6);
        assert_eq!(events[0].kind, JitEventKind::Queued);
        assert_eq!(events[1].kind, JitEventKind::NMethodC1);
        assert_eq!(events[3].kind, JitEventKind::NMethodC2);
        assert_eq!(model.code_cache_events().len(), 3);
    }

    #[test]
    fn test_native_wrapper_without_queue() {
        let model = JitDataModel::new();
        let r = resolver();
        let id = model
            .record_nmethod(
                tag("nmethod", &[("compile_id", "5"), ("compile_kind", "c2n"), ("method", SPIN), ("stamp", "0.2")]),
                &r,
            )
            .unwrap();
        let member = model.member(id).unwrap();
        assert!(member.last_compilation().unwrap().is_c2n());
        assert_eq!(model.stats().count_c2n, 1);
        assert_eq!(model.events()[0].kind, JitEventKind::NMethodC2N);
        assert_eq!(member.compile_millis(), None);
    }

    #[test]
    fn test_unresolved_class_counted_once() {
        let model = JitDataModel::new();
        let r = resolver();
        let unknown = "com/example/Missing run ()V";
        for id in ["1", "2"] {
            let err = model
                .record_task_queued(tag("task_queued", &[("compile_id", id), ("method", unknown)]), &r)
                .unwrap_err();
            assert!(err.is_resolution_miss());
        }
        assert_eq!(model.stats().unresolved_classes, 1);
        assert!(model.root_packages().is_empty());
    }

    #[test]
    fn test_member_not_found() {
        let model = JitDataModel::new();
        let r = resolver();
        let err = model
            .find_member_by_log_signature("com/example/Widget spin (J)I", &r)
            .unwrap_err();
        assert!(matches!(err, ModelError::MemberNotFound { .. }));
        let ctor = model
            .find_member_by_log_signature("com/example/Widget <init> ()V", &r)
            .unwrap();
        assert!(model.member(ctor).unwrap().is_constructor());
    }

    #[test]
    fn test_make_not_entrant_and_reset() {
        let model = JitDataModel::new();
        let r = resolver();
        let id = compile(&model, &r, "4", "C2", "1.0", "1.1");
        model
            .record_make_not_entrant(tag("make_not_entrant", &[("compile_id", "4"), ("thread", "1")]))
            .unwrap();
        assert_eq!(model.member(id).unwrap().decompile_count(), 1);
        assert!(model
            .record_make_not_entrant(tag("make_not_entrant", &[("compile_id", "99")]))
            .is_err());

        model.record_code_cache_sample(
            &tag("sweeper", &[("stamp", "2.0"), ("free_code_cache", "1024")]),
            CodeCacheEventKind::Sweeper,
        );
        model.set_vm_version(VmVersion::default());
        assert_eq!(model.code_cache_events().len(), 2);

        model.reset();
        assert!(model.root_packages().is_empty());
        assert!(model.events().is_empty());
        assert!(model.code_cache_events().is_empty());
        assert_eq!(model.stats(), JitStats::default());
        assert!(model.vm_version().is_none());
        assert!(model.member(id).is_none());
    }

    #[test]
    fn test_class_bytecode_memoized() {
        use jit_bytecode::{BytecodeError, ClassBC};
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Counting(AtomicUsize);
        impl BytecodeProvider for Counting {
            fn load_class(&self, fqcn: &str) -> Result<ClassBC, BytecodeError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(ClassBC::new(fqcn))
            }
        }

        let model = JitDataModel::new();
        let class = model.build_meta_class("com.example.Widget", &resolver()).unwrap();
        let provider = Counting(AtomicUsize::new(0));
        let first = model.class_bytecode(class, &provider).unwrap();
        let second = model.class_bytecode(class, &provider).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_attach_assembly() {
        use crate::assembly::{AssemblyBlock, MapAssemblyProvider};
        let model = JitDataModel::new();
        let r = resolver();
        let id = compile(&model, &r, "1", "C2", "1.0", "1.1");
        let mut provider = MapAssemblyProvider::new();
        provider.insert(
            "com.example.Widget::spin",
            AssemblyBlock {
                title: "[Verified Entry Point]".to_string(),
                lines: vec!["mov rax, rbx".to_string()],
            },
        );
        assert_eq!(model.attach_assembly(&provider), 1);
        assert_eq!(model.member(id).unwrap().assembly().len(), 1);
    }
}
