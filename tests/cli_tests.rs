mod common;

use assert_cmd::Command;
use predicates::prelude::*;

use common::{write_fake_javap, LogWorkspace, SPIN_LOG, TRUNCATED_LOG};

fn jitscope() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("jitscope").unwrap();
    cmd.env_remove("JITSCOPE_CLASSPATH")
        .env_remove("JITSCOPE_JAVAP")
        .env_remove("JITSCOPE_LOG")
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn test_report_table() {
    let workspace = LogWorkspace::new(SPIN_LOG);
    jitscope()
        .arg("--classpath")
        .arg(&workspace.classes)
        .arg("report")
        .arg(&workspace.log)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("package"))
        .stdout(predicate::str::contains("com.example"))
        .stdout(predicate::str::contains("public int spin(int)"))
        .stdout(predicate::str::contains("C2"));
}

#[test]
fn test_report_json_compiled_only() {
    let workspace = LogWorkspace::new(SPIN_LOG);
    let output = jitscope()
        .arg("--classpath")
        .arg(&workspace.classes)
        .arg("--json")
        .arg("report")
        .arg("--compiled-only")
        .arg(&workspace.log)
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["class"], "Widget");
    assert_eq!(rows[0]["compiler"], "C2");
    assert_eq!(rows[0]["compile_millis"], 10);
    assert_eq!(rows[0]["decompile_count"], 1);
}

#[test]
fn test_stats_without_class_path() {
    let workspace = LogWorkspace::new(SPIN_LOG);
    jitscope()
        .arg("stats")
        .arg(&workspace.log)
        .assert()
        .success()
        .stdout(predicate::str::contains("VM release:        25.181-b13"))
        .stdout(predicate::str::contains("Compiled (C1/C2):  0/0"))
        .stdout(predicate::str::contains("Unit errors:       0"));
}

#[test]
fn test_stats_json_reports_truncation() {
    let workspace = LogWorkspace::new(TRUNCATED_LOG);
    let output = jitscope()
        .arg("--classpath")
        .arg(&workspace.classes)
        .arg("--json")
        .arg("stats")
        .arg(&workspace.log)
        .output()
        .unwrap();
    assert!(output.status.success());

    let view: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["parse"]["truncated"], true);
    assert_eq!(view["events"], 1);
    assert_eq!(view["stats"]["classes_loaded"], 1);
}

#[test]
fn test_intrinsics_listing() {
    let workspace = LogWorkspace::new(SPIN_LOG);
    jitscope()
        .arg("--classpath")
        .arg(&workspace.classes)
        .arg("intrinsics")
        .arg(&workspace.log)
        .assert()
        .success()
        .stdout(predicate::str::contains("com.example.Widget public int spin(int)"))
        .stdout(predicate::str::contains("_length -> java.lang.StringBuilder.length"));
}

#[cfg(unix)]
#[test]
fn test_annotate_with_javap() {
    let workspace = LogWorkspace::new(SPIN_LOG);
    let javap = write_fake_javap(workspace.dir.path());
    jitscope()
        .arg("--classpath")
        .arg(&workspace.classes)
        .arg("--javap")
        .arg(&javap)
        .arg("annotate")
        .arg(&workspace.log)
        .arg("--member")
        .arg("com/example/Widget spin (I)I")
        .assert()
        .success()
        .stdout(predicate::str::contains("[compile 9, C2]"))
        .stdout(predicate::str::contains("[inline success] Inlined: Yes; java.lang.StringBuilder.<init>"))
        .stdout(predicate::str::contains("[branch] Count: 4990; Taken: 10"))
        .stdout(predicate::str::contains("[intrinsic] Intrinsic: _length"))
        .stdout(predicate::str::contains(
            "[eliminated allocation] Eliminated allocation; Type: java.lang.StringBuilder",
        ));
}

#[cfg(unix)]
#[test]
fn test_annotate_by_compile_id_json() {
    let workspace = LogWorkspace::new(SPIN_LOG);
    let javap = write_fake_javap(workspace.dir.path());
    let output = jitscope()
        .arg("--classpath")
        .arg(&workspace.classes)
        .arg("--javap")
        .arg(&javap)
        .arg("--json")
        .arg("annotate")
        .arg(&workspace.log)
        .arg("--compile-id")
        .arg("9")
        .output()
        .unwrap();
    assert!(output.status.success());

    let view: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["compile_id"], "9");
    assert_eq!(view["mismatch"], false);
    let instructions = view["instructions"].as_array().unwrap();
    assert_eq!(instructions.len(), 14);
    assert_eq!(instructions[4]["offset"], 8);
    assert!(instructions[4]["annotations"].as_array().unwrap().is_empty());
    assert_eq!(instructions[2]["annotations"][0]["annotation_type"], "InlineSuccess");
}

#[test]
fn test_annotate_earlier_compilation_without_task_fails() {
    let workspace = LogWorkspace::new(SPIN_LOG);
    jitscope()
        .arg("--classpath")
        .arg(&workspace.classes)
        .arg("annotate")
        .arg(&workspace.log)
        .arg("--compile-id")
        .arg("1")
        .arg("--index")
        .arg("0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no task in the log"));
}

#[test]
fn test_annotate_requires_member_selector() {
    let workspace = LogWorkspace::new(SPIN_LOG);
    jitscope()
        .arg("annotate")
        .arg(&workspace.log)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--member"));
}

#[test]
fn test_missing_log_fails_with_context() {
    let workspace = LogWorkspace::new(SPIN_LOG);
    jitscope()
        .arg("report")
        .arg(workspace.dir.path().join("absent.log"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open log"));
}

#[test]
fn test_config_file_supplies_class_path() {
    let workspace = LogWorkspace::new(SPIN_LOG);
    let config = workspace.dir.path().join("jitscope.json");
    std::fs::write(
        &config,
        serde_json::json!({ "class_locations": [workspace.classes] }).to_string(),
    )
    .unwrap();

    jitscope()
        .arg("--config")
        .arg(&config)
        .arg("report")
        .arg("--compiled-only")
        .arg(&workspace.log)
        .assert()
        .success()
        .stdout(predicate::str::contains("public int spin(int)"));
}
