//! Class loading behind the [`ClassResolver`] seam.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::classfile::parse_class;
use crate::errors::ResolveError;
use crate::runtime::ResolvedClass;

/// Resolves dotted class names to their declared members.
pub trait ClassResolver: Send + Sync {
    fn resolve(&self, fqcn: &str) -> Result<Arc<ResolvedClass>, ResolveError>;

    fn class_exists(&self, fqcn: &str) -> bool {
        self.resolve(fqcn).is_ok()
    }
}

/// Loader over a search path of class directories and `.jar` archives.
///
/// Parsed classes and misses are cached for the loader's lifetime. Replacing
/// the search path means building a new loader; the old cache goes with it.
/// A location that cannot be opened is reported once and dropped from the
/// search; the remaining locations are still searched.
pub struct ClassPathLoader {
    locations: Vec<PathBuf>,
    classes: Mutex<HashMap<String, Arc<ResolvedClass>>>,
    missing: Mutex<HashSet<String>>,
    unusable: Mutex<HashSet<PathBuf>>,
    jars: Mutex<HashMap<PathBuf, zip::ZipArchive<File>>>,
}

impl ClassPathLoader {
    pub fn new(locations: Vec<PathBuf>) -> Self {
        debug!(count = locations.len(), "creating class path loader");
        Self {
            locations,
            classes: Mutex::new(HashMap::new()),
            missing: Mutex::new(HashSet::new()),
            unusable: Mutex::new(HashSet::new()),
            jars: Mutex::new(HashMap::new()),
        }
    }

    pub fn locations(&self) -> &[PathBuf] {
        &self.locations
    }

    /// Number of successfully parsed classes held in the cache.
    pub fn cached_count(&self) -> usize {
        self.classes.lock().len()
    }

    /// Locations dropped from the search after failing to open.
    pub fn unusable_locations(&self) -> Vec<PathBuf> {
        let mut unusable: Vec<PathBuf> = self.unusable.lock().iter().cloned().collect();
        unusable.sort();
        unusable
    }

    fn read_class_bytes(&self, fqcn: &str) -> Option<Vec<u8>> {
        let relative = format!("{}.class", fqcn.replace('.', "/"));
        for location in &self.locations {
            if self.unusable.lock().contains(location) {
                continue;
            }
            let found = if is_archive(location) {
                self.read_from_jar(location, &relative)
            } else {
                read_from_dir(location, &relative)
            };
            match found {
                Ok(Some(bytes)) => {
                    trace!(class = fqcn, location = %location.display(), "class found");
                    return Some(bytes);
                }
                Ok(None) => {}
                Err(LocationError::Unusable(error)) => {
                    warn!(location = %location.display(), %error, "skipping unusable class path entry");
                    self.unusable.lock().insert(location.clone());
                }
                Err(LocationError::Entry(error)) => {
                    warn!(class = fqcn, %error, "failed to read class; trying later locations");
                }
            }
        }
        None
    }

    fn read_from_jar(&self, jar: &Path, entry: &str) -> Result<Option<Vec<u8>>, LocationError> {
        let mut jars = self.jars.lock();
        if !jars.contains_key(jar) {
            let file = File::open(jar).map_err(|e| LocationError::Unusable(io_error(jar, e)))?;
            let archive = zip::ZipArchive::new(file).map_err(|e| {
                LocationError::Unusable(ResolveError::Io {
                    path: jar.display().to_string(),
                    message: e.to_string(),
                })
            })?;
            jars.insert(jar.to_path_buf(), archive);
        }
        let Some(archive) = jars.get_mut(jar) else {
            return Ok(None);
        };
        let mut file = match archive.by_name(entry) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => {
                return Err(LocationError::Entry(ResolveError::Io {
                    path: format!("{}!{}", jar.display(), entry),
                    message: e.to_string(),
                }))
            }
        };
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| LocationError::Entry(io_error(jar, e)))?;
        Ok(Some(bytes))
    }
}

/// Why one search location could not answer a lookup.
enum LocationError {
    /// The location itself cannot be opened.
    Unusable(ResolveError),
    /// The location is fine but this class could not be read from it.
    Entry(ResolveError),
}

impl ClassResolver for ClassPathLoader {
    fn resolve(&self, fqcn: &str) -> Result<Arc<ResolvedClass>, ResolveError> {
        if let Some(class) = self.classes.lock().get(fqcn) {
            return Ok(Arc::clone(class));
        }
        if self.missing.lock().contains(fqcn) {
            return Err(ResolveError::ClassNotFound(fqcn.to_string()));
        }

        let Some(bytes) = self.read_class_bytes(fqcn) else {
            self.missing.lock().insert(fqcn.to_string());
            return Err(ResolveError::ClassNotFound(fqcn.to_string()));
        };
        let class = parse_class(&bytes).map_err(|error| ResolveError::ClassFile {
            class: fqcn.to_string(),
            error,
        })?;

        let class = Arc::new(class);
        self.classes
            .lock()
            .insert(fqcn.to_string(), Arc::clone(&class));
        Ok(class)
    }
}

impl std::fmt::Debug for ClassPathLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassPathLoader")
            .field("locations", &self.locations)
            .field("cached", &self.cached_count())
            .finish()
    }
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("jar") || e.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

fn read_from_dir(dir: &Path, relative: &str) -> Result<Option<Vec<u8>>, LocationError> {
    let path = dir.join(relative);
    if !path.is_file() {
        return Ok(None);
    }
    std::fs::read(&path)
        .map(Some)
        .map_err(|e| LocationError::Entry(io_error(&path, e)))
}

fn io_error(path: &Path, e: std::io::Error) -> ResolveError {
    ResolveError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// In-memory resolver for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticClassResolver {
    classes: HashMap<String, Arc<ResolvedClass>>,
}

impl StaticClassResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, class: ResolvedClass) -> Self {
        self.insert(class);
        self
    }

    pub fn insert(&mut self, class: ResolvedClass) {
        self.classes.insert(class.name.clone(), Arc::new(class));
    }
}

impl ClassResolver for StaticClassResolver {
    fn resolve(&self, fqcn: &str) -> Result<Arc<ResolvedClass>, ResolveError> {
        self.classes
            .get(fqcn)
            .cloned()
            .ok_or_else(|| ResolveError::ClassNotFound(fqcn.to_string()))
    }
}
