//! Temporary class directories, logs and a stand-in `javap`.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::fixtures::{widget_class_file, WIDGET_JAVAP};

/// Write `com/example/Widget.class` under `root`.
pub fn write_class_dir(root: &Path) -> PathBuf {
    let package = root.join("com/example");
    fs::create_dir_all(&package).unwrap();
    fs::write(package.join("Widget.class"), widget_class_file()).unwrap();
    root.to_path_buf()
}

pub fn write_log(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

/// A shell script that prints the Widget disassembly regardless of arguments.
#[cfg(unix)]
pub fn write_fake_javap(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let listing = dir.join("Widget.javap");
    fs::write(&listing, WIDGET_JAVAP).unwrap();
    let script = dir.join("javap");
    fs::write(&script, format!("#!/bin/sh\ncat '{}'\n", listing.display())).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    script
}

#[cfg(not(unix))]
pub fn write_fake_javap(_dir: &Path) -> PathBuf {
    PathBuf::from("javap")
}

/// A temp dir holding a class directory and one log file.
pub struct LogWorkspace {
    pub dir: TempDir,
    pub classes: PathBuf,
    pub log: PathBuf,
}

impl LogWorkspace {
    pub fn new(log_text: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let classes = write_class_dir(&dir.path().join("classes"));
        let log = write_log(dir.path(), "hotspot.log", log_text);
        Self { dir, classes, log }
    }
}
