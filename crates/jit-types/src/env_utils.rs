//! Environment variable helpers for layering configuration over defaults.
//!
//! ```
//! use jit_types::env_utils::{env_path_list, env_string_or};
//!
//! let level = env_string_or("JITSCOPE_LOG", "info");
//! let classpath = env_path_list("JITSCOPE_CLASSPATH");
//! assert!(!level.is_empty());
//! let _ = classpath;
//! ```

use std::path::PathBuf;
use std::str::FromStr;

/// Parse an environment variable into a type that implements `FromStr`.
///
/// Returns `None` if the variable is not set or cannot be parsed.
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Non-empty string value of an environment variable.
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get an environment variable as a string with a default value.
pub fn env_string_or(key: &str, default: &str) -> String {
    env_string(key).unwrap_or_else(|| default.to_string())
}

/// Check if an environment variable is set to a truthy value, with a default.
///
/// "1", "true", "yes" and "on" (case-insensitive) are truthy.
pub fn env_bool_or(key: &str, default: bool) -> bool {
    match std::env::var(key).ok() {
        Some(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

/// Split a search-path style variable (`:` on Unix, `;` on Windows).
///
/// Returns an empty vector if the variable is not set.
pub fn env_path_list(key: &str) -> Vec<PathBuf> {
    match std::env::var_os(key) {
        Some(value) => std::env::split_paths(&value)
            .filter(|p| !p.as_os_str().is_empty())
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_parsing() {
        std::env::set_var("JIT_TYPES_TEST_U32", " 42 ");
        let val: Option<u32> = env_var("JIT_TYPES_TEST_U32");
        assert_eq!(val, Some(42));

        let missing: Option<u32> = env_var("JIT_TYPES_NONEXISTENT_1");
        assert_eq!(missing, None);

        std::env::remove_var("JIT_TYPES_TEST_U32");
    }

    #[test]
    fn test_env_string_or() {
        std::env::set_var("JIT_TYPES_TEST_STRING", "debug");
        assert_eq!(env_string_or("JIT_TYPES_TEST_STRING", "info"), "debug");
        assert_eq!(env_string_or("JIT_TYPES_NONEXISTENT_2", "info"), "info");

        std::env::set_var("JIT_TYPES_TEST_BLANK", "   ");
        assert_eq!(env_string("JIT_TYPES_TEST_BLANK"), None);

        std::env::remove_var("JIT_TYPES_TEST_STRING");
        std::env::remove_var("JIT_TYPES_TEST_BLANK");
    }

    #[test]
    fn test_env_bool_or() {
        std::env::set_var("JIT_TYPES_TEST_BOOL", "Yes");
        assert!(env_bool_or("JIT_TYPES_TEST_BOOL", false));
        assert!(env_bool_or("JIT_TYPES_NONEXISTENT_3", true));
        assert!(!env_bool_or("JIT_TYPES_NONEXISTENT_3", false));
        std::env::remove_var("JIT_TYPES_TEST_BOOL");
    }

    #[test]
    fn test_env_path_list() {
        let joined = std::env::join_paths(["/opt/app/classes", "/opt/app/lib/dep.jar"]).unwrap();
        std::env::set_var("JIT_TYPES_TEST_PATHS", &joined);
        let paths = env_path_list("JIT_TYPES_TEST_PATHS");
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/opt/app/classes"),
                PathBuf::from("/opt/app/lib/dep.jar")
            ]
        );
        assert!(env_path_list("JIT_TYPES_NONEXISTENT_4").is_empty());
        std::env::remove_var("JIT_TYPES_TEST_PATHS");
    }
}
