//! Integration tests for the submat CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use rust_xlsxwriter::Workbook;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const AS_OF: &str = "2025-06-09";

/// Helper to get a submat command
fn submat() -> Command {
    Command::cargo_bin("submat").unwrap()
}

/// Helper to create a test project in a temp directory
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    submat().current_dir(tmp.path()).arg("init").assert().success();
    tmp
}

fn write_sheet(workbook: &mut Workbook, name: &str, headers: &[&str], rows: &[&[&str]]) {
    let sheet = workbook.add_worksheet();
    sheet.set_name(name).unwrap();
    for (c, h) in headers.iter().enumerate() {
        sheet.write_string(0, c as u16, *h).unwrap();
    }
    for (r, row) in rows.iter().enumerate() {
        for (c, v) in row.iter().enumerate() {
            sheet.write_string(r as u32 + 1, c as u16, *v).unwrap();
        }
    }
}

/// A small ledger: order SO-1 / WO-1 builds FG-1 from P-1 (용기) and P-2 (캡)
fn write_ledger(path: &Path) {
    let mut wb = Workbook::new();
    write_sheet(
        &mut wb,
        "입고",
        &[
            "수주번호",
            "지시번호",
            "완성품번",
            "제품명",
            "생산공정",
            "요청날짜",
            "요청번호",
            "품번",
            "품명",
            "요청수량",
            "ERP불출수량",
            "현장실물입고",
            "비고",
        ],
        &[
            &["SO-1", "WO-1", "FG-1", "수분크림", "5층 기초", "2025-06-08", "R-1", "P-1", "용기", "100", "100", "100", "파손 2ea"],
            &["SO-1", "WO-1", "FG-1", "수분크림", "5층 기초", "2025-06-09", "R-2", "P-2", "캡", "50", "50", "50", ""],
            &["SO-9", "WO-9", "FG-9", "바디로션", "4층 덕용", "2025-05-01", "R-3", "P-1", "용기", "10", "10", "10", ""],
        ],
    );
    write_sheet(
        &mut wb,
        "작업지시",
        &["수주번호", "지시번호", "품번", "품명", "수량", "작업장"],
        &[&["SO-1", "WO-1", "FG-1", "수분크림", "10", "WC501"]],
    );
    write_sheet(
        &mut wb,
        "수주",
        &["수주번호", "품번", "품명", "조정납기일자", "수량", "매출처"],
        &[&["SO-1", "FG-1", "수분크림", "2025-06-20", "10", "고객A"]],
    );
    write_sheet(
        &mut wb,
        "BOM",
        &["품목코드", "품명", "품번", "품명", "단위수량"],
        &[
            &["FG-1", "수분크림 50ml", "P-1", "용기", "1"],
            &["FG-1", "수분크림 50ml", "P-2", "캡", "1"],
            &["FG-1", "수분크림 50ml", "L-1", "수분크림_전면라벨", "1"],
            &["FG-9", "바디로션", "P-1", "용기", "1"],
        ],
    );
    write_sheet(
        &mut wb,
        "재고",
        &["작업장", "품번", "실재고수량"],
        &[&["WC501", "P-1", "40"], &["WC900", "P-1", "999"]],
    );
    write_sheet(
        &mut wb,
        "생산실적",
        &["작지번호", "수주번호", "생산일자", "양품", "QC샘플", "기타샘플"],
        &[&["WO-1", "SO-1", "2025-06-05", "10", "2", "1"]],
    );
    write_sheet(
        &mut wb,
        "불량",
        &["작지번호", "투입품번", "불량수량", "불량유형"],
        &[
            &["WO-1", "P-1", "3", "(원)찍힘"],
            &["WO-1", "P-1", "1", "(작)오염"],
        ],
    );
    wb.save(path).unwrap();
}

/// Project with the ledger already uploaded
fn setup_with_ledger() -> TempDir {
    let tmp = setup_test_project();
    let ledger = tmp.path().join("ledger.xlsx");
    write_ledger(&ledger);
    submat()
        .current_dir(tmp.path())
        .args(["upload", "ledger.xlsx"])
        .assert()
        .success();
    tmp
}

fn load_session(tmp: &TempDir) {
    submat()
        .current_dir(tmp.path())
        .args([
            "returns",
            "load",
            "--order",
            "SO-1",
            "--process",
            "5층 기초",
            "--as-of",
            AS_OF,
        ])
        .assert()
        .success();
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    submat()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Submaterial ledger toolkit"));
}

#[test]
fn test_version_displays() {
    submat()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("submat"));
}

#[test]
fn test_completions_bash() {
    submat()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("submat"));
}

#[test]
fn test_invalid_as_of_rejected() {
    submat()
        .args(["inbound", "--as-of", "someday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date"));
}

// ============================================================================
// Init / Upload / Status
// ============================================================================

#[test]
fn test_init_creates_project_structure() {
    let tmp = TempDir::new().unwrap();
    submat()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized submat project"));

    assert!(tmp.path().join(".submat/config.yaml").exists());
    assert!(tmp.path().join(".submat/store").is_dir());
    assert!(tmp.path().join(".submat/session").is_dir());
}

#[test]
fn test_init_twice_warns() {
    let tmp = setup_test_project();
    submat()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_outside_project_fail() {
    let tmp = TempDir::new().unwrap();
    submat()
        .current_dir(tmp.path())
        .arg("status")
        .assert()
        .failure();
}

#[test]
fn test_upload_stores_workbook_and_snapshot() {
    let tmp = setup_test_project();
    write_ledger(&tmp.path().join("ledger.xlsx"));

    submat()
        .current_dir(tmp.path())
        .args(["upload", "ledger.xlsx"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bulk-ledger.xlsx"))
        .stdout(predicate::str::contains("inout.db"));

    assert!(tmp.path().join(".submat/store/bulk-ledger.xlsx").exists());
    assert!(tmp.path().join(".submat/store/inout.db").exists());
}

#[test]
fn test_upload_rejects_non_workbook() {
    let tmp = setup_test_project();
    fs::write(tmp.path().join("notes.xlsx"), "not a zip").unwrap();
    submat()
        .current_dir(tmp.path())
        .args(["upload", "notes.xlsx"])
        .assert()
        .failure();
    assert!(!tmp.path().join(".submat/store/bulk-ledger.xlsx").exists());
}

#[test]
fn test_status_json_reports_sheets() {
    let tmp = setup_with_ledger();
    let output = submat()
        .current_dir(tmp.path())
        .args(["status", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["objects"][0]["key"], "bulk-ledger.xlsx");
    assert!(json["objects"][0]["bytes"].as_u64().unwrap() > 0);
    assert!(json["objects"][2]["bytes"].is_null());
    assert_eq!(json["sheets"].as_array().unwrap().len(), 7);
    assert!(json["sha256"].as_str().is_some());
}

#[test]
fn test_status_without_upload() {
    let tmp = setup_test_project();
    submat()
        .current_dir(tmp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("missing"));
}

// ============================================================================
// Lookups
// ============================================================================

#[test]
fn test_inbound_default_window() {
    let tmp = setup_with_ledger();
    submat()
        .current_dir(tmp.path())
        .args(["inbound", "--as-of", AS_OF, "--format", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("R-1"))
        .stdout(predicate::str::contains("R-2"))
        .stdout(predicate::str::contains("R-3").not());
}

#[test]
fn test_inbound_name_filter() {
    let tmp = setup_with_ledger();
    submat()
        .current_dir(tmp.path())
        .args(["inbound", "--as-of", AS_OF, "--name", "캡", "--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("R-2"))
        .stdout(predicate::str::contains("R-1").not());
}

#[test]
fn test_inbound_rejects_reversed_range() {
    let tmp = setup_with_ledger();
    submat()
        .current_dir(tmp.path())
        .args(["inbound", "--from", "2025-06-09", "--to", "2025-06-01"])
        .assert()
        .failure();
}

#[test]
fn test_orders_traces_part() {
    let tmp = setup_with_ledger();
    let output = submat()
        .current_dir(tmp.path())
        .args(["orders", "P-2", "--as-of", AS_OF, "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["bom_level"], 1);
    assert_eq!(json["window"], "next_month");
    assert_eq!(json["orders"][0]["order"], "SO-1");
    assert_eq!(json["work_orders"][0]["work_order"], "WO-1");
}

#[test]
fn test_orders_unknown_part() {
    let tmp = setup_with_ledger();
    submat()
        .current_dir(tmp.path())
        .args(["orders", "NOPE", "--as-of", AS_OF])
        .assert()
        .success()
        .stdout(predicate::str::contains("not a component"));
}

#[test]
fn test_common_material_alert() {
    let tmp = setup_with_ledger();
    submat()
        .current_dir(tmp.path())
        .args(["common", "P-1", "--as-of", AS_OF, "--format", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FG-1"))
        .stdout(predicate::str::contains("FG-9"))
        .stdout(predicate::str::contains("1주 이내"));
}

// ============================================================================
// Return tracking
// ============================================================================

#[test]
fn test_returns_search_by_product() {
    let tmp = setup_with_ledger();
    submat()
        .current_dir(tmp.path())
        .args(["returns", "search", "수분", "--as-of", AS_OF, "--format", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SO-1"))
        .stdout(predicate::str::contains("SO-9").not());
}

#[test]
fn test_returns_load_and_show() {
    let tmp = setup_with_ledger();
    load_session(&tmp);
    assert!(tmp.path().join(".submat/session/returns.json").exists());

    let output = submat()
        .current_dir(tmp.path())
        .args(["returns", "show", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    let p1 = rows.iter().find(|r| r["품번"] == "P-1").unwrap();
    // 100 - (10 + 2 + 1) x 1 - 3 - 1
    assert_eq!(p1["예상재고"], serde_json::json!(83.0));
    assert_eq!(p1["ERP재고"], serde_json::json!(40.0));
}

#[test]
fn test_returns_load_unknown_order() {
    let tmp = setup_with_ledger();
    submat()
        .current_dir(tmp.path())
        .args(["returns", "load", "--order", "SO-404", "--process", "5층 기초"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SO-404"));
}

#[test]
fn test_returns_load_rejects_unknown_process() {
    let tmp = setup_with_ledger();
    submat()
        .current_dir(tmp.path())
        .args(["returns", "load", "--order", "SO-1", "--process", "7층"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid process"));
}

#[test]
fn test_returns_export_csv() {
    let tmp = setup_with_ledger();
    load_session(&tmp);
    submat()
        .current_dir(tmp.path())
        .args(["returns", "export", "csv", "--out", "out/returns.csv"])
        .assert()
        .success();

    let bytes = fs::read(tmp.path().join("out/returns.csv")).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
    assert!(text.starts_with("수주번호,지시번호,생산공정"));
    assert!(text.contains("5층 기초"));
    assert_eq!(text.lines().count(), 4);
}

#[test]
fn test_returns_export_pdf_manifest() {
    let tmp = setup_with_ledger();
    load_session(&tmp);
    submat()
        .current_dir(tmp.path())
        .args(["returns", "export", "pdf", "--memo", "1P 확인"])
        .assert()
        .success();
    let pdf = fs::read(tmp.path().join("returns.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[test]
fn test_returns_labels_need_selection() {
    let tmp = setup_with_ledger();
    load_session(&tmp);
    submat()
        .current_dir(tmp.path())
        .args([
            "returns", "export", "labels", "--identifier", "B202506-0001", "--unit", "500",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no parts are selected"));

    submat()
        .current_dir(tmp.path())
        .args(["returns", "edit", "P-1", "--label"])
        .assert()
        .success();
    submat()
        .current_dir(tmp.path())
        .args([
            "returns", "export", "labels", "--identifier", "B202506-0001", "--unit", "500",
        ])
        .assert()
        .success();
    assert!(tmp.path().join("labels.pdf").exists());
}

#[test]
fn test_returns_edit_unknown_part() {
    let tmp = setup_with_ledger();
    load_session(&tmp);
    submat()
        .current_dir(tmp.path())
        .args(["returns", "edit", "P-404", "--common"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not in the return session"));
}

#[test]
fn test_returns_comments() {
    let tmp = setup_with_ledger();
    load_session(&tmp);
    submat()
        .current_dir(tmp.path())
        .args(["returns", "comments", "--format", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("파손 2ea"));
}

#[test]
fn test_returns_clear() {
    let tmp = setup_with_ledger();
    load_session(&tmp);
    submat()
        .current_dir(tmp.path())
        .args(["returns", "clear", "--yes"])
        .assert()
        .success();
    submat()
        .current_dir(tmp.path())
        .args(["returns", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No return session"));
}

// ============================================================================
// Labels
// ============================================================================

fn add_label(tmp: &TempDir) {
    submat()
        .current_dir(tmp.path())
        .args([
            "label",
            "add",
            "--part",
            "L-1",
            "--name",
            "수분크림_전면라벨",
            "--category",
            "용기전면라벨",
            "--outer",
            "80",
            "--inner",
            "76",
            "--height",
            "50",
            "--sample",
            "2매",
            "--sample-weight",
            "0.5",
            "--core-weight",
            "10",
        ])
        .assert()
        .success();
}

#[test]
fn test_label_add_and_search() {
    let tmp = setup_test_project();
    add_label(&tmp);
    assert!(tmp.path().join(".submat/store/label_db.csv").exists());

    submat()
        .current_dir(tmp.path())
        .args(["label", "search", "전면", "--format", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("L-1"));
}

#[test]
fn test_label_add_validates() {
    let tmp = setup_test_project();
    submat()
        .current_dir(tmp.path())
        .args([
            "label", "add", "--part", "L-2", "--name", "라벨", "--outer", "0", "--inner", "76",
            "--height", "50", "--sample-weight", "0.5",
        ])
        .assert()
        .failure();
}

#[test]
fn test_label_calc() {
    let tmp = setup_test_project();
    add_label(&tmp);
    // (60 - 10) / 0.5 x 2
    submat()
        .current_dir(tmp.path())
        .args(["label", "calc", "FG1-L-1", "--film", "60", "--format", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("200"));

    submat()
        .current_dir(tmp.path())
        .args(["label", "calc", "L-1", "--film", "5"])
        .assert()
        .failure();
}

#[test]
fn test_label_delete_and_export() {
    let tmp = setup_test_project();
    add_label(&tmp);
    submat()
        .current_dir(tmp.path())
        .args(["label", "export", "labels.xlsx"])
        .assert()
        .success();
    assert!(tmp.path().join("labels.xlsx").exists());

    submat()
        .current_dir(tmp.path())
        .args(["label", "delete", "L-1", "--yes"])
        .assert()
        .success();
    submat()
        .current_dir(tmp.path())
        .args(["label", "delete", "L-1", "--yes"])
        .assert()
        .failure();
}

#[test]
fn test_label_bom_search() {
    let tmp = setup_with_ledger();
    submat()
        .current_dir(tmp.path())
        .args(["label", "bom-search", "L-", "--format", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("수분크림_전면라벨"))
        .stdout(predicate::str::contains("P-1").not());
}
