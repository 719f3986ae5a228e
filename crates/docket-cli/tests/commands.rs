//! # Integration Tests for docket-cli
//!
//! Drives parsed command lines through `run` with in-memory stdin/stdout
//! and temporary files.

use std::path::Path;

use clap::Parser;
use docket_cli::{error_line, run, Cli};
use serde_json::{json, Value};

const MESSAGE: &str = r#"{"$schema": "https://gobl.org/draft-0/note/message", "content": "hello"}"#;

/// Helper: run `args` with `stdin`, returning stdout.
fn docket(args: &[&str], stdin: &str) -> anyhow::Result<String> {
    let mut argv = vec!["docket"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv)?;
    let mut out = Vec::new();
    run(cli, &mut stdin.as_bytes(), &mut out)?;
    Ok(String::from_utf8(out)?)
}

fn invoice() -> Value {
    json!({
        "$schema": "https://gobl.org/draft-0/bill/invoice",
        "series": "SAMPLE",
        "code": "001",
        "issue_date": "2024-03-01",
        "supplier": {"name": "Provide One S.L.", "tax_id": {"country": "ES", "code": "B98602642"}},
        "customer": {"name": "Sample Consumer", "tax_id": {"country": "ES", "code": "54387763P"}},
        "lines": [{
            "quantity": "20",
            "item": {"name": "Development services", "price": "90.00"},
            "taxes": [{"cat": "VAT", "rate": "general"}]
        }]
    })
}

fn keygen(dir: &Path) -> (String, String) {
    let private = dir.join("id.json");
    docket(&["keygen", private.to_str().unwrap()], "").unwrap();
    (
        private.to_string_lossy().into_owned(),
        dir.join("id.pub.json").to_string_lossy().into_owned(),
    )
}

#[test]
fn build_from_stdin_to_stdout() {
    let out = docket(&["build", "--set", "content=changed"], MESSAGE).unwrap();
    let v: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["content"], "changed");
    assert!(out.ends_with('\n'));
}

#[test]
fn build_invoice_calculates_totals() {
    let out = docket(&["build", "-e"], &invoice().to_string()).unwrap();
    let v: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["doc"]["totals"]["payable"], "2178.00");
    assert_eq!(v["head"]["dig"]["alg"], "sha256");
}

#[test]
fn build_with_type_flag() {
    let out = docket(&["build", "-t", "note/message"], r#"{"content": "typed"}"#).unwrap();
    let v: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["$schema"], "https://gobl.org/draft-0/note/message");
}

#[test]
fn build_refuses_existing_output_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.json");
    let output = dir.path().join("out.json");
    std::fs::write(&input, MESSAGE).unwrap();
    std::fs::write(&output, "keep").unwrap();
    let (i, o) = (input.to_str().unwrap(), output.to_str().unwrap());

    assert!(docket(&["build", i, o], "").is_err());
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "keep");

    docket(&["build", "-f", i, o], "").unwrap();
    let v: Value = serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(v["content"], "hello");
}

#[test]
fn build_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("doc.json");
    std::fs::write(&input, MESSAGE).unwrap();
    docket(&["build", "-w", "-e", input.to_str().unwrap()], "").unwrap();
    let v: Value = serde_json::from_slice(&std::fs::read(&input).unwrap()).unwrap();
    assert_eq!(v["doc"]["content"], "hello");

    let err = docket(&["build", "-w"], MESSAGE).unwrap_err();
    assert_eq!(err.to_string(), "cannot overwrite STDIN");
}

#[test]
fn sign_then_verify_with_key_files() {
    let dir = tempfile::tempdir().unwrap();
    let (private, public) = keygen(dir.path());

    let signed = docket(&["sign", "-k", &private], MESSAGE).unwrap();
    let v: Value = serde_json::from_str(&signed).unwrap();
    assert_eq!(v["head"]["draft"], Value::Null);
    assert_eq!(v["sigs"].as_array().unwrap().len(), 1);

    assert_eq!(docket(&["verify", "-k", &public], &signed).unwrap(), "");

    let other = tempfile::tempdir().unwrap();
    let (_, other_public) = keygen(other.path());
    let err = docket(&["verify", "-k", &other_public], &signed).unwrap_err();
    assert!(error_line(&err).starts_with("code=422, "), "{}", error_line(&err));
}

#[test]
fn validate_reports_code_and_message() {
    let out = docket(&["validate"], &docket(&["build", "-e"], MESSAGE).unwrap()).unwrap();
    assert_eq!(out, "");

    let err = docket(&["validate"], "this isn't JSON").unwrap_err();
    assert!(error_line(&err).starts_with("code=400, message="));

    let mut env: Value = serde_json::from_str(&docket(&["build", "-e"], &invoice().to_string()).unwrap()).unwrap();
    env["doc"].as_object_mut().unwrap().remove("totals");
    let err = docket(&["validate"], &env.to_string()).unwrap_err();
    let line = error_line(&err);
    assert!(line.starts_with("code=422, message=doc: ("), "{line}");
    assert!(line.contains("totals: cannot be blank"), "{line}");
}

#[test]
fn correct_issues_credit_note() {
    let built = docket(&["build", "-e"], &invoice().to_string()).unwrap();
    let out = docket(&["correct", "--credit", "--date", "2024-03-15"], &built).unwrap();
    let v: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["doc"]["type"], "credit-note");
    assert_eq!(v["doc"]["issue_date"], "2024-03-15");
    assert_eq!(v["doc"]["preceding"][0]["code"], "001");

    let schema = docket(&["correct", "--options"], &built).unwrap();
    let v: Value = serde_json::from_str(&schema).unwrap();
    assert_eq!(v["$id"], "https://gobl.org/draft-0/bill/correction-options");
}

#[test]
fn replicate_resets_identity() {
    let built = docket(&["build", "-e"], &invoice().to_string()).unwrap();
    let out = docket(&["replicate"], &built).unwrap();
    let a: Value = serde_json::from_str(&built).unwrap();
    let b: Value = serde_json::from_str(&out).unwrap();
    assert_ne!(a["head"]["uuid"], b["head"]["uuid"]);
    assert_eq!(b["doc"]["code"], Value::Null);
}

#[test]
fn in_place_rebuild_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("invoice.json");
    std::fs::write(&input, invoice().to_string()).unwrap();
    let path = input.to_str().unwrap();

    docket(&["build", "-w", "-e", "-i", path], "").unwrap();
    let first = std::fs::read(&input).unwrap();
    docket(&["build", "-w", "-i", path], "").unwrap();
    assert_eq!(std::fs::read(&input).unwrap(), first);
}
