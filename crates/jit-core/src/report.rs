//! Flat per-member dump of the model for headless reporting.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use serde::Serialize;

use jit_model::{JitDataModel, MetaMember, PackageId};

/// One member's row; stamps and sizes come from its latest compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub package: String,
    pub class: String,
    pub signature: String,
    pub compiled: bool,
    pub compiler: Option<String>,
    pub queued_stamp_ms: Option<u64>,
    pub compiled_stamp_ms: Option<u64>,
    pub compile_millis: Option<u64>,
    pub bytecode_size: Option<u64>,
    pub native_size: Option<u64>,
    pub decompile_count: u32,
}

impl ReportRow {
    fn from_member(package: &str, class: &str, member: &MetaMember) -> Self {
        let last = member.last_compilation();
        Self {
            package: package.to_string(),
            class: class.to_string(),
            signature: member.signature().to_string(),
            compiled: member.is_compiled(),
            compiler: last.and_then(|c| c.compiler.clone()),
            queued_stamp_ms: last.and_then(|c| c.queued_stamp),
            compiled_stamp_ms: last.and_then(|c| c.emitted_stamp),
            compile_millis: member.compile_millis(),
            bytecode_size: last.and_then(|c| c.bytecode_size),
            native_size: last.and_then(|c| c.native_size),
            decompile_count: member.decompile_count(),
        }
    }
}

/// Rows in package-tree order, classes and members sorted within each package.
pub fn build_report(model: &JitDataModel, compiled_only: bool) -> Vec<ReportRow> {
    let mut rows = Vec::new();
    for (id, _) in model.root_packages() {
        collect_package(model, id, compiled_only, &mut rows);
    }
    rows
}

fn collect_package(model: &JitDataModel, id: PackageId, compiled_only: bool, rows: &mut Vec<ReportRow>) {
    let Some(package) = model.package(id) else {
        return;
    };
    for class_id in package.classes.values() {
        let Some(class) = model.class(*class_id) else {
            continue;
        };
        for member_id in class.member_ids() {
            let Some(member) = model.member(member_id) else {
                continue;
            };
            if compiled_only && !member.is_compiled() {
                continue;
            }
            rows.push(ReportRow::from_member(&package.name, class.simple_name(), &member));
        }
    }
    for child in package.children.values() {
        collect_package(model, *child, compiled_only, rows);
    }
}

const HEADERS: [&str; 11] = [
    "package",
    "class",
    "signature",
    "compiled",
    "compiler",
    "queued_ms",
    "compiled_ms",
    "compile_ms",
    "bytecode",
    "native",
    "decompiles",
];

fn cells(row: &ReportRow) -> [String; 11] {
    let opt = |v: Option<u64>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
    [
        row.package.clone(),
        row.class.clone(),
        row.signature.clone(),
        if row.compiled { "yes" } else { "no" }.to_string(),
        row.compiler.clone().unwrap_or_else(|| "-".to_string()),
        opt(row.queued_stamp_ms),
        opt(row.compiled_stamp_ms),
        opt(row.compile_millis),
        opt(row.bytecode_size),
        opt(row.native_size),
        row.decompile_count.to_string(),
    ]
}

/// Whitespace-aligned text columns with a header line.
pub fn render_table(rows: &[ReportRow]) -> String {
    let body: Vec<[String; 11]> = rows.iter().map(cells).collect();
    let mut widths = HEADERS.map(str::len);
    for row in &body {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let mut write_line = |values: &mut dyn Iterator<Item = &str>| {
        let line = values
            .zip(widths.iter())
            .map(|(value, width)| format!("{:<width$}", value, width = width))
            .collect::<Vec<_>>()
            .join("  ");
        let _ = writeln!(out, "{}", line.trim_end());
    };
    write_line(&mut HEADERS.iter().copied());
    for row in &body {
        write_line(&mut row.iter().map(String::as_str));
    }
    out
}

pub fn render_json(rows: &[ReportRow]) -> Result<String> {
    serde_json::to_string_pretty(rows).context("failed to serialise report")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::test_support::{units, widget_resolver};
    use std::sync::Arc;

    const LOG: &str = "<task_queued compile_id='1' method='com/example/Widget spin (I)I' bytes='24' stamp='1.000'/>
<nmethod compile_id='1' compiler='C2' method='com/example/Widget spin (I)I' insts_bytes='96' stamp='1.012'/>";

    fn model() -> JitDataModel {
        let model = JitDataModel::new();
        let resolver = widget_resolver();
        let mut tags = units(LOG).into_iter();
        let queued = tags.next().unwrap();
        let nmethod = tags.next().unwrap();
        model.record_task_queued(Arc::new(queued), &resolver).unwrap();
        model.record_nmethod(Arc::new(nmethod), &resolver).unwrap();
        model
    }

    #[test]
    fn test_build_report_rows() {
        let model = model();
        let all = build_report(&model, false);
        assert_eq!(all.len(), 2);

        let compiled = build_report(&model, true);
        assert_eq!(compiled.len(), 1);
        let row = &compiled[0];
        assert_eq!(row.package, "com.example");
        assert_eq!(row.class, "Widget");
        assert!(row.signature.contains("spin"));
        assert_eq!(row.compiler.as_deref(), Some("C2"));
        assert_eq!(row.queued_stamp_ms, Some(1000));
        assert_eq!(row.compiled_stamp_ms, Some(1012));
        assert_eq!(row.compile_millis, Some(12));
        assert_eq!(row.bytecode_size, Some(24));
        assert_eq!(row.native_size, Some(96));
    }

    #[test]
    fn test_render_table_aligns_columns() {
        let rows = build_report(&model(), false);
        let table = render_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("package"));
        let class_col = lines[0].find("class").unwrap();
        assert_eq!(&lines[1][class_col..class_col + 6], "Widget");
        assert_eq!(&lines[2][class_col..class_col + 6], "Widget");
        assert!(table.contains("yes"));
        assert!(table.contains("no"));
    }

    #[test]
    fn test_render_json() {
        let rows = build_report(&model(), true);
        let json = render_json(&rows).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["compiler"], "C2");
        assert_eq!(parsed[0]["decompile_count"], 0);
        assert!(render_json(&[]).unwrap().starts_with('['));
    }
}
