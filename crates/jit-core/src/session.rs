//! Explicit per-session context: configuration, class resolver and
//! bytecode provider.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use jit_bytecode::{BytecodeProvider, JavapBytecodeLoader};
use jit_resolver::{ClassPathLoader, ClassResolver};

use crate::config::JitConfig;

pub struct ParseSession {
    config: RwLock<JitConfig>,
    resolver: RwLock<Arc<dyn ClassResolver>>,
    bytecode: RwLock<Arc<dyn BytecodeProvider>>,
}

impl ParseSession {
    /// Session backed by the configured class path and `javap`.
    pub fn new(config: JitConfig) -> Self {
        let resolver: Arc<dyn ClassResolver> = Arc::new(ClassPathLoader::new(config.class_locations.clone()));
        let bytecode: Arc<dyn BytecodeProvider> = Arc::new(JavapBytecodeLoader::new(
            config.javap_path.clone(),
            config.class_locations.clone(),
        ));
        Self::with_providers(config, resolver, bytecode)
    }

    pub fn with_providers(
        config: JitConfig,
        resolver: Arc<dyn ClassResolver>,
        bytecode: Arc<dyn BytecodeProvider>,
    ) -> Self {
        Self {
            config: RwLock::new(config),
            resolver: RwLock::new(resolver),
            bytecode: RwLock::new(bytecode),
        }
    }

    pub fn config(&self) -> JitConfig {
        self.config.read().clone()
    }

    pub fn resolver(&self) -> Arc<dyn ClassResolver> {
        Arc::clone(&self.resolver.read())
    }

    pub fn bytecode_provider(&self) -> Arc<dyn BytecodeProvider> {
        Arc::clone(&self.bytecode.read())
    }

    /// Replace the class search path. The old loader and everything it
    /// cached is dropped once no caller still holds it.
    pub fn set_class_locations(&self, locations: Vec<PathBuf>) {
        info!(locations = locations.len(), "replacing class loader");
        let javap = {
            let mut config = self.config.write();
            config.class_locations = locations.clone();
            config.javap_path.clone()
        };
        *self.resolver.write() = Arc::new(ClassPathLoader::new(locations.clone()));
        *self.bytecode.write() = Arc::new(JavapBytecodeLoader::new(javap, locations));
    }
}

impl std::fmt::Debug for ParseSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseSession")
            .field("config", &*self.config.read())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jit_resolver::{ResolvedClass, StaticClassResolver};

    #[test]
    fn test_set_class_locations_swaps_loader() {
        let resolver = StaticClassResolver::new().with_class(ResolvedClass::new("a.B"));
        let session = ParseSession::with_providers(
            JitConfig::default(),
            Arc::new(resolver),
            Arc::new(jit_bytecode::StaticBytecodeProvider::new()),
        );
        let before = session.resolver();
        assert!(before.class_exists("a.B"));

        let dir = tempfile::tempdir().unwrap();
        session.set_class_locations(vec![dir.path().to_path_buf()]);
        assert!(!session.resolver().class_exists("a.B"));
        assert_eq!(session.config().class_locations, vec![dir.path().to_path_buf()]);
        // Callers holding the old loader keep a working handle.
        assert!(before.class_exists("a.B"));
    }
}
