//! Package tree and class arena.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use jit_bytecode::ClassBC;
use jit_resolver::ResolvedClass;
use jit_types::package_of;

use crate::member::MetaMember;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(pub usize);

#[derive(Debug, Clone)]
pub struct MetaPackage {
    /// Dotted name; the default package is empty.
    pub name: String,
    pub parent: Option<PackageId>,
    /// Child packages keyed by full name, so iteration is sorted.
    pub children: BTreeMap<String, PackageId>,
    /// Classes keyed by fully-qualified name.
    pub classes: BTreeMap<String, ClassId>,
}

/// Lazily decoded bytecode shared by every copy of a [`MetaClass`].
pub type BytecodeCell = Arc<OnceLock<Option<Arc<ClassBC>>>>;

#[derive(Debug, Clone)]
pub struct MetaClass {
    pub name: String,
    pub package: PackageId,
    /// Sorted by signature.
    pub constructors: Vec<MemberId>,
    /// Sorted by signature.
    pub methods: Vec<MemberId>,
    pub is_interface: bool,
    pub source_file: Option<String>,
    pub bytecode: BytecodeCell,
}

impl MetaClass {
    pub fn member_ids(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.constructors.iter().chain(self.methods.iter()).copied()
    }

    pub fn simple_name(&self) -> &str {
        jit_types::simple_name_of(&self.name)
    }
}

/// Index arenas for packages, classes and members.
#[derive(Debug, Default, Clone)]
pub struct PackageManager {
    packages: Vec<MetaPackage>,
    classes: Vec<MetaClass>,
    members: Vec<MetaMember>,
    by_package_name: BTreeMap<String, PackageId>,
    by_class_name: BTreeMap<String, ClassId>,
    roots: BTreeMap<String, PackageId>,
}

impl PackageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a package and every ancestor, linking parent to child.
    pub fn build_package(&mut self, name: &str) -> PackageId {
        if let Some(id) = self.by_package_name.get(name) {
            return *id;
        }

        let mut parent: Option<PackageId> = None;
        let mut prefix = String::new();
        let segments: Vec<&str> = if name.is_empty() { vec![""] } else { name.split('.').collect() };

        for segment in segments {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(segment);

            let id = match self.by_package_name.get(&prefix) {
                Some(id) => *id,
                None => {
                    let id = PackageId(self.packages.len());
                    self.packages.push(MetaPackage {
                        name: prefix.clone(),
                        parent,
                        children: BTreeMap::new(),
                        classes: BTreeMap::new(),
                    });
                    self.by_package_name.insert(prefix.clone(), id);
                    match parent {
                        Some(p) => {
                            self.packages[p.0].children.insert(prefix.clone(), id);
                        }
                        None => {
                            self.roots.insert(prefix.clone(), id);
                        }
                    }
                    id
                }
            };
            parent = Some(id);
        }

        // `segments` is never empty, so the loop always assigned `parent`.
        parent.unwrap_or(PackageId(0))
    }

    /// Add a resolved class and all its members. Returns the existing id if
    /// the class is already present.
    pub fn add_class(&mut self, resolved: &ResolvedClass) -> ClassId {
        if let Some(id) = self.by_class_name.get(&resolved.name) {
            return *id;
        }
        let package = self.build_package(package_of(&resolved.name));
        let class_id = ClassId(self.classes.len());

        let mut constructors = Vec::new();
        let mut methods = Vec::new();
        for runtime in &resolved.members {
            let member_id = MemberId(self.members.len());
            let member = MetaMember::new(runtime.clone(), class_id, &resolved.name);
            if member.is_constructor() {
                constructors.push(member_id);
            } else {
                methods.push(member_id);
            }
            self.members.push(member);
        }
        let members = &self.members;
        let key = |id: &MemberId| {
            let sig = members[id.0].signature();
            (sig.member_name.clone(), sig.param_types.clone())
        };
        constructors.sort_by_key(key);
        methods.sort_by_key(key);

        self.classes.push(MetaClass {
            name: resolved.name.clone(),
            package,
            constructors,
            methods,
            is_interface: resolved.is_interface,
            source_file: resolved.source_file.clone(),
            bytecode: Arc::new(OnceLock::new()),
        });
        self.by_class_name.insert(resolved.name.clone(), class_id);
        self.packages[package.0]
            .classes
            .insert(resolved.name.clone(), class_id);
        class_id
    }

    pub fn package(&self, id: PackageId) -> Option<&MetaPackage> {
        self.packages.get(id.0)
    }

    pub fn package_by_name(&self, name: &str) -> Option<PackageId> {
        self.by_package_name.get(name).copied()
    }

    pub fn class(&self, id: ClassId) -> Option<&MetaClass> {
        self.classes.get(id.0)
    }

    pub fn class_by_name(&self, fqcn: &str) -> Option<ClassId> {
        self.by_class_name.get(fqcn).copied()
    }

    pub fn member(&self, id: MemberId) -> Option<&MetaMember> {
        self.members.get(id.0)
    }

    pub fn member_mut(&mut self, id: MemberId) -> Option<&mut MetaMember> {
        self.members.get_mut(id.0)
    }

    pub fn members(&self) -> impl Iterator<Item = (MemberId, &MetaMember)> {
        self.members.iter().enumerate().map(|(i, m)| (MemberId(i), m))
    }

    pub fn members_mut(&mut self) -> impl Iterator<Item = &mut MetaMember> {
        self.members.iter_mut()
    }

    /// Parentless packages, sorted by name.
    pub fn root_packages(&self) -> Vec<PackageId> {
        self.roots.values().copied().collect()
    }

    /// Every class, sorted by fully-qualified name.
    pub fn class_ids(&self) -> Vec<ClassId> {
        self.by_class_name.values().copied().collect()
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jit_resolver::RuntimeMember;
    use jit_types::{Primitive, TypeDesc};

    #[test]
    fn test_package_dedup() {
        let mut pm = PackageManager::new();
        let first = pm.build_package("a.b.c");
        let second = pm.build_package("a.b.c");
        assert_eq!(first, second);
        assert_eq!(pm.package_count(), 3);

        let roots = pm.root_packages();
        assert_eq!(roots.len(), 1);
        assert_eq!(pm.package(roots[0]).unwrap().name, "a");

        let b = pm.package_by_name("a.b").unwrap();
        assert_eq!(pm.package(first).unwrap().parent, Some(b));
        assert_eq!(
            pm.package(b).unwrap().children.keys().collect::<Vec<_>>(),
            vec!["a.b.c"]
        );
    }

    #[test]
    fn test_sibling_packages_sorted() {
        let mut pm = PackageManager::new();
        pm.build_package("org.zeta");
        pm.build_package("com.example");
        pm.build_package("org.alpha");
        let names: Vec<&str> = pm
            .root_packages()
            .into_iter()
            .map(|id| pm.package(id).unwrap().name.as_str())
            .collect();
        assert_eq!(names, vec!["com", "org"]);
        let org = pm.package_by_name("org").unwrap();
        assert_eq!(
            pm.package(org).unwrap().children.keys().collect::<Vec<_>>(),
            vec!["org.alpha", "org.zeta"]
        );
    }

    #[test]
    fn test_default_package() {
        let mut pm = PackageManager::new();
        let id = pm.add_class(&ResolvedClass::new("Main"));
        let class = pm.class(id).unwrap();
        assert_eq!(pm.package(class.package).unwrap().name, "");
        assert_eq!(pm.root_packages(), vec![class.package]);
    }

    #[test]
    fn test_add_class_sorts_members() {
        let int = TypeDesc::Primitive(Primitive::Int);
        let class = ResolvedClass::new("com.example.Widget")
            .with_member(RuntimeMember::method("zoom", 1, vec![], int.clone()))
            .with_member(RuntimeMember::constructor("com.example.Widget", 1, vec![int.clone()]))
            .with_member(RuntimeMember::method("alpha", 1, vec![int.clone()], int.clone()))
            .with_member(RuntimeMember::constructor("com.example.Widget", 1, vec![]));

        let mut pm = PackageManager::new();
        let id = pm.add_class(&class);
        assert_eq!(pm.add_class(&class), id);

        let meta = pm.class(id).unwrap();
        let names: Vec<&str> = meta
            .methods
            .iter()
            .map(|m| pm.member(*m).unwrap().signature().member_name.as_str())
            .collect();
        assert_eq!(names, vec!["alpha", "zoom"]);
        let ctor_params: Vec<usize> = meta
            .constructors
            .iter()
            .map(|m| pm.member(*m).unwrap().signature().param_types.len())
            .collect();
        assert_eq!(ctor_params, vec![0, 1]);
        assert_eq!(meta.simple_name(), "Widget");
        assert_eq!(pm.class_by_name("com.example.Widget"), Some(id));
    }
}
