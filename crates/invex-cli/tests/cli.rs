use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const INVOICE: &str = "\
ACME Corp
Invoice #: INV-001
Date: 01/15/2024

Description Qty Price Total
Widget 2 50.00 100.00

Subtotal: $100.00
Tax: $8.00
Total: $108.00
";

fn invex(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("invex").unwrap();
    // Keep the user's real config out of the way
    cmd.arg("--config").arg(config_dir.path().join("config.json"));
    cmd
}

fn write_default_config(dir: &TempDir) {
    Command::cargo_bin("invex")
        .unwrap()
        .args(["config", "init", "-o"])
        .arg(dir.path().join("config.json"))
        .assert()
        .success();
}

#[test]
fn test_process_json() {
    let dir = TempDir::new().unwrap();
    write_default_config(&dir);
    let input = dir.path().join("invoice.txt");
    fs::write(&input, INVOICE).unwrap();

    invex(&dir)
        .arg("process")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"invoice_number\": \"INV-001\""))
        .stdout(predicate::str::contains("\"calculations_correct\": true"))
        .stdout(predicate::str::contains("\"data_quality\""));
}

#[test]
fn test_process_stdin_csv() {
    let dir = TempDir::new().unwrap();
    write_default_config(&dir);

    invex(&dir)
        .args(["process", "-", "--format", "csv"])
        .write_stdin(INVOICE)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Field,Value,Confidence"))
        .stdout(predicate::str::contains("line_item_1_description,Widget,"));
}

#[test]
fn test_process_text_to_file() {
    let dir = TempDir::new().unwrap();
    write_default_config(&dir);
    let input = dir.path().join("invoice.txt");
    let output = dir.path().join("out.txt");
    fs::write(&input, INVOICE).unwrap();

    invex(&dir)
        .arg("process")
        .arg(&input)
        .args(["-f", "text", "-o"])
        .arg(&output)
        .assert()
        .success();

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains("Invoice: INV-001"));
    assert!(written.contains("Math check: passed"));
}

#[test]
fn test_process_missing_file() {
    let dir = TempDir::new().unwrap();
    write_default_config(&dir);

    invex(&dir)
        .args(["process", "does-not-exist.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_process_empty_input() {
    let dir = TempDir::new().unwrap();
    write_default_config(&dir);

    invex(&dir)
        .args(["process", "-"])
        .write_stdin("   \n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no usable text"));
}

#[test]
fn test_batch_flags_duplicates() {
    let dir = TempDir::new().unwrap();
    write_default_config(&dir);
    let inputs = dir.path().join("in");
    let outputs = dir.path().join("out");
    fs::create_dir_all(&inputs).unwrap();
    fs::write(inputs.join("a.txt"), INVOICE).unwrap();
    fs::write(inputs.join("b.txt"), INVOICE).unwrap();

    invex(&dir)
        .arg("batch")
        .arg(format!("{}/*.txt", inputs.display()))
        .arg("-o")
        .arg(&outputs)
        .args(["--summary", "-j", "2"])
        .assert()
        .success();

    assert!(outputs.join("a.json").exists());
    assert!(outputs.join("b.json").exists());

    let summary = fs::read_to_string(outputs.join("summary.csv")).unwrap();
    let rows: Vec<&str> = summary.lines().skip(1).collect();
    assert_eq!(rows.len(), 2);
    // Same document twice: exactly one is flagged
    let duplicates = rows.iter().filter(|r| r.split(',').nth(9) == Some("true")).count();
    assert_eq!(duplicates, 1);
}

#[test]
fn test_batch_no_matches() {
    let dir = TempDir::new().unwrap();
    write_default_config(&dir);

    invex(&dir)
        .arg("batch")
        .arg(format!("{}/*.nothing", dir.path().display()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn test_config_get_and_set() {
    let dir = TempDir::new().unwrap();
    write_default_config(&dir);

    invex(&dir)
        .args(["config", "get", "validation.relative_tolerance"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.01"));

    invex(&dir)
        .args(["config", "set", "extraction.date_order", "day_first"])
        .assert()
        .success();

    invex(&dir)
        .args(["config", "get", "extraction.date_order"])
        .assert()
        .success()
        .stdout(predicate::str::contains("day_first"));

    invex(&dir)
        .args(["config", "set", "extraction.no_such_key", "1"])
        .assert()
        .failure();
}

#[test]
fn test_config_rejects_invalid_value() {
    let dir = TempDir::new().unwrap();
    write_default_config(&dir);

    invex(&dir)
        .args(["config", "set", "extraction.positional_multiplier", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("positional_multiplier"));
}

#[test]
fn test_explicit_config_must_exist() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("invoice.txt");
    fs::write(&input, INVOICE).unwrap();

    invex(&dir)
        .arg("process")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}
