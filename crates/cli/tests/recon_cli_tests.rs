// Integration tests for `soa run` / `soa validate`: exit codes, stderr
// summary, and the --json stdout contract.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn soa() -> Command {
    Command::new(env!("CARGO_BIN_EXE_soa"))
}

fn run_soa(args: &[&str]) -> Output {
    soa().args(args).env_remove("SOA_LOG").output().expect("run soa")
}

fn write(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path.to_str().unwrap().to_string()
}

const CONFIG: &str = r#"
name = "cli test"

[invoices]
file = "invoices.csv"

[statement]
file = "statement.csv"
"#;

const INVOICES: &str = "\
invoice_number,total_amount,currency,invoice_date
INV-100,500.00,USD,2025-01-10
INV-0042,200.00,USD,2025-01-11
INV-7,1000.00,USD,2025-01-12
";

const MATCHING_STATEMENT: &str = "\
reference_text,amount,currency,line_date
INV-100,500.00,USD,2025-01-10
inv42,200.00,USD,2025-01-14
INV-7,995.50,USD,2025-01-13
";

/// Lay out a config plus both CSV files in a fresh temp dir.
fn fixture(statement: &str) -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "invoices.csv", INVOICES);
    write(dir.path(), "statement.csv", statement);
    let config = write(dir.path(), "run.soa.toml", CONFIG);
    (dir, config)
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout must be one JSON value: {e}\n{stdout}"))
}

// ===========================================================================
// soa run
// ===========================================================================

#[test]
fn run_all_matched_exits_zero() {
    let (_dir, config) = fixture(MATCHING_STATEMENT);
    let output = run_soa(&["run", &config]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let err = stderr(&output);
    assert!(err.contains("3 matched"), "stderr: {err}");
    assert!(err.contains("0 discrepancies"), "stderr: {err}");
    assert!(
        err.contains("by pass: pass 1 (exact): 1, pass 3 (normalized_reference): 1, pass 4 (amount_tolerance): 1"),
        "stderr: {err}"
    );
    assert!(output.stdout.is_empty());
}

#[test]
fn run_json_reports_passes() {
    let (_dir, config) = fixture(MATCHING_STATEMENT);
    let output = run_soa(&["run", &config, "--json"]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let json = stdout_json(&output);
    assert_eq!(json["meta"]["name"], "cli test");

    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["status"], "matched");
    assert_eq!(results[0]["pass"], 1);
    assert_eq!(results[0]["confidence"], "certain");
    assert_eq!(results[1]["pass"], 3);
    assert_eq!(results[2]["pass"], 4);
    assert_eq!(json["summary"]["matched"], 3);
}

#[test]
fn run_with_discrepancies_exits_one() {
    let statement = "\
reference_text,amount,currency,line_date
INV-100,500.00,USD,2025-01-10
INV-999,75.00,USD,2025-01-10
";
    let (_dir, config) = fixture(statement);
    let output = run_soa(&["run", &config, "--json"]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("no_invoice_found (high)"), "stderr: {err}");
    assert!(err.contains("error: 1 discrepancy(ies) found"), "stderr: {err}");

    let json = stdout_json(&output);
    let disc = &json["discrepancies"][0];
    assert_eq!(disc["discrepancy_type"], "no_invoice_found");
    assert_eq!(disc["severity"], "high");
    assert_eq!(disc["statement_line"]["line_index"], 1);
    assert_eq!(json["unmatched_invoices"].as_array().unwrap().len(), 2);
}

#[test]
fn allow_partial_flag_enables_pass_five() {
    let statement = "\
reference_text,amount,currency,line_date
PMT INV-100 / INV-7,499.40,USD,2025-01-11
";
    let (_dir, config) = fixture(statement);

    let strict = run_soa(&["run", &config]);
    assert_eq!(strict.status.code(), Some(1));

    let partial = run_soa(&["run", &config, "--allow-partial", "--json"]);
    assert_eq!(partial.status.code(), Some(0), "stderr: {}", stderr(&partial));
    let json = stdout_json(&partial);
    assert_eq!(json["results"][0]["pass"], 5);
    assert_eq!(json["results"][0]["confidence"], "tentative");
    assert_eq!(json["meta"]["allow_partial"], true);
}

#[test]
fn run_writes_output_file() {
    let (dir, config) = fixture(MATCHING_STATEMENT);
    let out = dir.path().join("report.json");
    let output = run_soa(&["run", &config, "--output", out.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["summary"]["total_lines"], 3);
}

#[test]
fn repeated_runs_are_byte_identical() {
    let (_dir, config) = fixture(MATCHING_STATEMENT);
    let a = run_soa(&["run", &config, "--json"]);
    let b = run_soa(&["run", &config, "--json"]);
    assert_eq!(a.stdout, b.stdout);
}

#[test]
fn mapping_error_exits_four() {
    let statement = "\
reference_text,amount,currency,line_date
INV-100,five hundred,USD,2025-01-10
";
    let (_dir, config) = fixture(statement);
    let output = run_soa(&["run", &config]);

    assert_eq!(output.status.code(), Some(4));
    let err = stderr(&output);
    assert!(err.contains("statement line #1"), "stderr: {err}");
    assert!(err.contains("five hundred"), "stderr: {err}");
    assert!(err.contains("hint:"), "stderr: {err}");
}

#[test]
fn missing_csv_exits_five() {
    let dir = TempDir::new().unwrap();
    let config = write(dir.path(), "run.soa.toml", CONFIG);
    let output = run_soa(&["run", &config]);

    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("invoices.csv"));
}

#[test]
fn config_without_file_exits_three() {
    let dir = TempDir::new().unwrap();
    let config = write(dir.path(), "run.soa.toml", "name = \"no files\"\n");
    let output = run_soa(&["run", &config]);

    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("[invoices] has no file"));
}

#[test]
fn unknown_flag_exits_two() {
    let output = run_soa(&["run", "x.toml", "--no-such-flag"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("--no-such-flag"));
}

#[test]
fn help_exits_zero() {
    let output = run_soa(&["--help"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("soa"));
}

// ===========================================================================
// soa validate
// ===========================================================================

#[test]
fn validate_accepts_good_config() {
    let (_dir, config) = fixture(MATCHING_STATEMENT);
    let output = run_soa(&["validate", &config]);

    assert_eq!(output.status.code(), Some(0));
    let err = stderr(&output);
    assert!(err.contains("valid: recon 'cli test'"), "stderr: {err}");
    assert!(err.contains("date window 7 days"), "stderr: {err}");
}

#[test]
fn validate_rejects_negative_tolerance() {
    let dir = TempDir::new().unwrap();
    let config = write(
        dir.path(),
        "bad.soa.toml",
        "name = \"bad\"\n[tolerance]\namount_absolute = \"-1\"\n",
    );
    let output = run_soa(&["validate", &config]);

    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("amount_absolute"));
}

#[test]
fn validate_rejects_broken_toml() {
    let dir = TempDir::new().unwrap();
    let config = write(dir.path(), "broken.soa.toml", "name = \n");
    let output = run_soa(&["validate", &config]);

    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("config parse error"));
}
