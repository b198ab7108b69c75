// Integration tests for the `sheet-summary` binary.

mod common;

use common::*;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

fn sheet_summary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sheet-summary"));
    cmd.env_remove("SHEET_SUMMARY_SHEET");
    cmd.env_remove("SHEET_SUMMARY_HEADER_SCAN_ROWS");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("valid JSON on stdout")
}

#[test]
fn summarizes_repeated_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "prices.xlsx", &workbook(&[simple_sheet()], 0));

    let output = sheet_summary()
        .arg(&path)
        .args(["--columns", "price", "--columns", "quantity"])
        .output()
        .unwrap();

    assert!(output.status.success(), "exit code was {:?}", output.status);
    assert_eq!(
        stdout_json(&output),
        serde_json::json!({
            "file": "prices.xlsx",
            "summary": [
                {"column": "price", "sum": 526.5, "avg": 131.63},
                {"column": "quantity", "sum": 38.0, "avg": 9.5}
            ]
        })
    );
}

#[test]
fn accepts_json_column_list() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "price_list.xlsx", &workbook(&[price_list_sheet()], 0));

    let output = sheet_summary()
        .arg(&path)
        .args(["--columns", r#"["current usd", "price"]"#, "--pretty"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["file"], "price_list.xlsx");
    assert_eq!(json["summary"][0]["column"], "current usd");
    assert_eq!(json["summary"][0]["avg"], 415.31);
    assert_eq!(json["summary"][1]["sum"], 1731.0);
}

#[test]
fn sheet_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "book.xlsx", &workbook(&[price_list_sheet(), simple_sheet()], 0));

    let output = sheet_summary()
        .arg(&path)
        .args(["--columns", "price"])
        .env("SHEET_SUMMARY_SHEET", "Sheet1")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["summary"][0]["sum"], 526.5);
}

#[test]
fn lists_sheets() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "book.xlsx", &workbook(&[price_list_sheet(), simple_sheet()], 0));

    let output = sheet_summary().arg(&path).arg("--list-sheets").output().unwrap();

    assert!(output.status.success());
    assert_eq!(stdout_json(&output), serde_json::json!(["Price List", "Sheet1"]));
}

#[test]
fn invalid_input_exits_with_two() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "prices.csv", b"Product,Price\n");

    let output = sheet_summary().arg(&path).output().unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(
        stdout_json(&output),
        serde_json::json!({
            "error": "Invalid input",
            "details": {
                "columns": ["At least one column name must be provided"],
                "file": ["File must be an Excel file (.xlsx or .xls)"]
            }
        })
    );
}

#[test]
fn missing_sheet_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "prices.xlsx", &workbook(&[simple_sheet()], 0));

    let output = sheet_summary()
        .arg(&path)
        .args(["--columns", "price", "--sheet", "Data"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout_json(&output),
        serde_json::json!({"error": "Failed to process file: Worksheet Data does not exist."})
    );
}

#[test]
fn undecodable_workbook_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "prices.xlsx", b"definitely not a workbook");

    let output = sheet_summary().arg(&path).args(["--columns", "price"]).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let error = stdout_json(&output)["error"].as_str().unwrap().to_owned();
    assert!(error.starts_with("Failed to process file: "), "{}", error);
}

#[test]
fn unreadable_path_reports_on_stderr() {
    let dir = tempfile::tempdir().unwrap();

    let output = sheet_summary()
        .arg(dir.path().join("absent.xlsx"))
        .args(["--columns", "price"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read"));
}
