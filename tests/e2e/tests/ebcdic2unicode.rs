//! E2E tests for the `ebcdic2unicode` CLI.
//!
//! Every test writes its own template and EBCDIC input into a temp dir, runs
//! the binary and checks the output file (or stdout) and the stderr summary.

use std::fs;

use assert_cmd::Command;
use e2e_tests::{SAMPLE_LINE_SIZE, SampleRecord, Workspace, arg};
use ebcdic_parser::codepage::{CP037, CP500};
use predicates::prelude::*;

const SAMPLE: [SampleRecord<'static>; 3] = [
    SampleRecord { name: "ALICE", amount: 12345, qty: 7, born: "19900131" },
    SampleRecord { name: "BOB", amount: -50, qty: 12, born: "20000229" },
    SampleRecord { name: "CAROL", amount: 99999, qty: 3, born: "19851231" },
];

/// `cargo_bin` is deprecated because of custom build directories, but it is
/// the only way to reach a binary from another crate.
#[expect(deprecated)]
fn cli() -> Command {
    Command::cargo_bin("ebcdic2unicode").unwrap()
}

/// Workspace with the sample template and `input.dat` holding [`SAMPLE`].
fn sample_workspace() -> Workspace {
    let ws = Workspace::new().unwrap();
    ws.sample_template().unwrap();
    ws.records("input.dat", &CP037, &SAMPLE).unwrap();
    ws
}

fn base_args(ws: &Workspace) -> Vec<String> {
    vec![
        "--template".to_string(),
        arg(&ws.path("layout.json")).to_string(),
        "--input".to_string(),
        arg(&ws.path("input.dat")).to_string(),
    ]
}

// ============================================================================
// Output formats
// ============================================================================

#[test]
fn test_delimited_defaults() {
    let ws = sample_workspace();
    let output = ws.path("out.txt");

    cli()
        .args(base_args(&ws))
        .args(["--output", arg(&output)])
        .assert()
        .success()
        .stderr(predicate::str::contains("Converted 3 of 3 record(s)"));

    let content = fs::read_to_string(&output).unwrap();
    assert_eq!(
        content,
        "name\tamount\tqty\tborn¬\r\n\
         \"ALICE\"\t\"123.45\"\t\"7\"\t\"1990-01-31\"¬\r\n\
         \"BOB\"\t\"-0.50\"\t\"12\"\t\"2000-02-29\"¬\r\n\
         \"CAROL\"\t\"999.99\"\t\"3\"\t\"1985-12-31\"¬\r\n"
    );
}

#[test]
fn test_pipe_delimited_without_quotes() {
    let ws = sample_workspace();
    let output = ws.path("out.txt");

    cli()
        .args(base_args(&ws))
        .args([
            "--output",
            arg(&output),
            "--delimiter",
            "|",
            "--row-terminator",
            "\\n",
            "--no-quotes",
        ])
        .assert()
        .success();

    let content = fs::read_to_string(&output).unwrap();
    assert_eq!(
        content,
        "name|amount|qty|born\n\
         ALICE|123.45|7|1990-01-31\n\
         BOB|-0.50|12|2000-02-29\n\
         CAROL|999.99|3|1985-12-31\n"
    );
}

#[test]
fn test_csv_output() {
    let ws = sample_workspace();
    let output = ws.path("out.csv");

    cli()
        .args(base_args(&ws))
        .args(["--output", arg(&output), "--format", "csv"])
        .assert()
        .success();

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("\"name\",\"amount\",\"qty\",\"born\"\n"));
    assert!(content.contains("\"ALICE\",\"123.45\",\"7\",\"1990-01-31\"\n"));
    assert_eq!(content.lines().count(), 4);
}

#[test]
fn test_csv_without_header_or_quotes() {
    let ws = sample_workspace();
    let output = ws.path("out.csv");

    cli()
        .args(base_args(&ws))
        .args(["--output", arg(&output), "--format", "csv", "--no-header", "--no-quotes"])
        .assert()
        .success();

    let content = fs::read_to_string(&output).unwrap();
    assert_eq!(content.lines().next(), Some("ALICE,123.45,7,1990-01-31"));
    assert_eq!(content.lines().count(), 3);
}

#[test]
fn test_xml_output() {
    let ws = sample_workspace();
    let output = ws.path("out.xml");

    cli()
        .args(base_args(&ws))
        .args(["--output", arg(&output), "--format", "xml"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Converted 3 of 3 record(s)"));

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(content.contains("<Record index=\"0\">"));
    assert!(content.contains("<name>ALICE</name>"));
    assert!(content.contains("<amount>-0.50</amount>"));
    assert!(content.contains("<born>1985-12-31</born>"));
    assert!(content.trim_end().ends_with("</Records>"));
}

#[test]
fn test_stdout_when_no_output_given() {
    let ws = sample_workspace();

    cli()
        .args(base_args(&ws))
        .args(["--no-header", "--no-quotes", "--row-terminator", "\\n"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ALICE\t123.45\t7\t1990-01-31\n"))
        .stdout(predicate::str::contains("Converted").not())
        .stderr(predicate::str::contains("Converted 3 of 3 record(s)"));
}

// ============================================================================
// Chunking
// ============================================================================

#[test]
fn test_chunk_size_does_not_change_output() {
    let ws = Workspace::new().unwrap();
    ws.sample_template().unwrap();
    let records: Vec<SampleRecord<'_>> =
        (0..10).map(|i| SampleRecord { qty: i, ..SAMPLE[(i % 3) as usize] }).collect();
    ws.records("input.dat", &CP037, &records).unwrap();

    let mut outputs = Vec::new();
    for chunk_records in ["1", "3", "100000"] {
        let output = ws.path(&format!("out-{chunk_records}.txt"));
        cli()
            .args(base_args(&ws))
            .args(["--output", arg(&output), "--chunk-records", chunk_records])
            .assert()
            .success()
            .stderr(predicate::str::contains("Converted 10 of 10 record(s)"));
        outputs.push(fs::read(&output).unwrap());
    }

    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[0], outputs[2]);
}

#[test]
fn test_empty_input_writes_header_only() {
    let ws = Workspace::new().unwrap();
    ws.sample_template().unwrap();
    ws.write("input.dat", Vec::<u8>::new()).unwrap();
    let output = ws.path("out.txt");

    cli()
        .args(base_args(&ws))
        .args(["--output", arg(&output)])
        .assert()
        .success()
        .stderr(predicate::str::contains("Converted 0 of 0 record(s)"));

    assert_eq!(fs::read_to_string(&output).unwrap(), "name\tamount\tqty\tborn¬\r\n");
}

#[test]
fn test_zero_chunk_records_fails() {
    let ws = sample_workspace();

    cli()
        .args(base_args(&ws))
        .args(["--chunk-records", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("chunk record count must be greater than zero"));
}

#[test]
fn test_huge_chunk_records_on_small_input() {
    let ws = sample_workspace();
    let output = ws.path("out.txt");
    let chunk_records = (usize::MAX / (SAMPLE_LINE_SIZE * 2)).to_string();

    cli()
        .args(base_args(&ws))
        .args(["--output", arg(&output), "--chunk-records", chunk_records.as_str()])
        .assert()
        .success()
        .stderr(predicate::str::contains("Converted 3 of 3 record(s) in 1 chunk(s)"));

    assert_eq!(fs::read_to_string(&output).unwrap().lines().count(), 4);
}

#[test]
fn test_overflowing_chunk_records_fails() {
    let ws = sample_workspace();
    let chunk_records = usize::MAX.to_string();

    cli()
        .args(base_args(&ws))
        .args(["--chunk-records", chunk_records.as_str()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("is too large"));
}

// ============================================================================
// Decode failures
// ============================================================================

/// Sample input with the amount of record 1 corrupted.
fn workspace_with_bad_record() -> Workspace {
    let ws = Workspace::new().unwrap();
    ws.sample_template().unwrap();
    let mut bytes = Vec::new();
    for record in &SAMPLE {
        bytes.extend(record.encode(&CP037).unwrap());
    }
    bytes[SAMPLE_LINE_SIZE + 5] = 0xAB;
    ws.write("input.dat", bytes).unwrap();
    ws
}

#[test]
fn test_failed_records_are_skipped_and_reported() {
    let ws = workspace_with_bad_record();
    let output = ws.path("out.txt");

    cli()
        .args(base_args(&ws))
        .args(["--output", arg(&output), "--no-quotes", "--row-terminator", "\\n"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Converted 2 of 3 record(s)"))
        .stderr(predicate::str::contains("record 1, field 'amount' at offset 5"));

    let content = fs::read_to_string(&output).unwrap();
    assert!(!content.contains("BOB"));
    assert!(content.contains("CAROL"));
}

#[test]
fn test_emit_partial_keeps_failed_records() {
    let ws = workspace_with_bad_record();
    let output = ws.path("out.txt");

    cli()
        .args(base_args(&ws))
        .args(["--output", arg(&output), "--no-quotes", "--row-terminator", "\\n"])
        .arg("--emit-partial")
        .assert()
        .success()
        .stderr(predicate::str::contains("Converted 3 of 3 record(s)"));

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.contains("BOB\t\t12\t2000-02-29\n"));
}

// ============================================================================
// Codepages
// ============================================================================

#[test]
fn test_codepage_flag_selects_table() {
    let ws = Workspace::new().unwrap();
    ws.write(
        "layout.json",
        r#"{ "fields": [ { "name": "code", "length": 3, "type": "text" } ] }"#,
    )
    .unwrap();
    ws.write("input.dat", CP500.encode("[X]").unwrap()).unwrap();

    cli()
        .args(base_args(&ws))
        .args(["--codepage", "cp500", "--no-header", "--no-quotes"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[X]"));

    // Same bytes read as CP037
    cli()
        .args(base_args(&ws))
        .args(["--no-header", "--no-quotes"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[X]").not());
}

#[test]
fn test_template_codepage_is_used() {
    let ws = Workspace::new().unwrap();
    ws.write(
        "layout.json",
        r#"{ "codepage": "cp500", "fields": [ { "name": "code", "length": 3, "type": "text" } ] }"#,
    )
    .unwrap();
    ws.write("input.dat", CP500.encode("[X]").unwrap()).unwrap();

    cli()
        .args(base_args(&ws))
        .args(["--no-header", "--no-quotes"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[X]"));
}

#[test]
fn test_unknown_codepage() {
    let ws = sample_workspace();

    cli()
        .args(base_args(&ws))
        .args(["--codepage", "cp999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown codepage 'cp999'"));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unaligned_input_fails() {
    let ws = sample_workspace();
    let mut bytes = fs::read(ws.path("input.dat")).unwrap();
    bytes.extend([0x40u8; 4]);
    ws.write("input.dat", bytes).unwrap();

    cli()
        .args(base_args(&ws))
        .args(["--output", arg(&ws.path("out.txt"))])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("is not a multiple of line size 19"));

    assert!(!ws.path("out.txt").exists());
}

#[test]
fn test_input_shorter_than_one_record_fails() {
    let ws = Workspace::new().unwrap();
    ws.sample_template().unwrap();
    ws.write("input.dat", [0x40u8; 5]).unwrap();

    cli()
        .args(base_args(&ws))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input is shorter than one record"));
}

#[test]
fn test_missing_template_file() {
    let ws = sample_workspace();

    cli()
        .args(["--template", arg(&ws.path("missing.json"))])
        .args(["--input", arg(&ws.path("input.dat"))])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read template"));
}

#[test]
fn test_overlapping_template_fields() {
    let ws = Workspace::new().unwrap();
    ws.write(
        "layout.json",
        r#"{
            "line_size": 10,
            "fields": [
                { "name": "a", "offset": 0, "length": 6, "type": "text" },
                { "name": "b", "offset": 4, "length": 6, "type": "text" }
            ]
        }"#,
    )
    .unwrap();
    ws.write("input.dat", [0x40u8; 10]).unwrap();

    cli()
        .args(base_args(&ws))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid template"))
        .stderr(predicate::str::contains("fields 'a' and 'b' overlap"));
}

#[test]
fn test_missing_input_file() {
    let ws = Workspace::new().unwrap();
    ws.sample_template().unwrap();

    cli()
        .args(base_args(&ws))
        .args(["--output", arg(&ws.path("out.txt"))])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_missing_required_args() {
    cli().assert().failure().stderr(predicate::str::contains("--template"));
}
