//! Session configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! environment variables.
//!
//! | Variable | Field |
//! |---|---|
//! | `JITSCOPE_CLASSPATH` | `class_locations` (platform path-list syntax) |
//! | `JITSCOPE_JAVAP` | `javap_path` |
//! | `JITSCOPE_LOG` | `log_level` |

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use jit_types::env_utils::{env_path_list, env_string};

pub const ENV_CLASSPATH: &str = "JITSCOPE_CLASSPATH";
pub const ENV_JAVAP: &str = "JITSCOPE_JAVAP";
pub const ENV_LOG: &str = "JITSCOPE_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitConfig {
    /// Class directories and jars searched when a class is first referenced.
    pub class_locations: Vec<PathBuf>,
    /// Source roots, carried for viewers; the analyser itself never reads them.
    pub source_locations: Vec<PathBuf>,
    pub javap_path: PathBuf,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Key assembly blocks by mangled member names.
    pub mangled_assembly: bool,
}

impl Default for JitConfig {
    fn default() -> Self {
        Self {
            class_locations: Vec::new(),
            source_locations: Vec::new(),
            javap_path: PathBuf::from("javap"),
            log_level: "info".to_string(),
            mangled_assembly: true,
        }
    }
}

impl JitConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Read a JSON config file and apply environment overrides on top.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: JitConfig = serde_json::from_str(&text)
            .with_context(|| format!("invalid config JSON in {}", path.display()))?;
        Ok(config.with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        let classpath = env_path_list(ENV_CLASSPATH);
        if !classpath.is_empty() {
            self.class_locations = classpath;
        }
        if let Some(javap) = env_string(ENV_JAVAP) {
            self.javap_path = PathBuf::from(javap);
        }
        if let Some(level) = env_string(ENV_LOG) {
            self.log_level = level;
        }
        self
    }

    pub fn with_class_locations(mut self, locations: Vec<PathBuf>) -> Self {
        self.class_locations = locations;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = JitConfig::default();
        assert_eq!(config.javap_path, PathBuf::from("javap"));
        assert_eq!(config.log_level, "info");
        assert!(config.class_locations.is_empty());
    }

    #[test]
    fn test_load_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"class_locations": ["/opt/classes"], "log_level": "debug"}}"#).unwrap();

        let config = JitConfig::load(file.path()).unwrap();
        assert_eq!(config.class_locations, vec![PathBuf::from("/opt/classes")]);
        assert_eq!(config.javap_path, PathBuf::from("javap"));
        assert!(config.mangled_assembly);
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = JitConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid config JSON"));
        assert!(JitConfig::load(Path::new("/nonexistent/jitscope.json")).is_err());
    }
}
