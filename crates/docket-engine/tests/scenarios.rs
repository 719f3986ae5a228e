//! End-to-end behaviour of the pipeline against the shipped rule sets.

use std::path::PathBuf;
use std::sync::Arc;

use docket_crypto::PrivateKey;
use docket_doc::Registry;
use docket_engine::bulk::Bulk;
use docket_engine::{ops, ParseOptions};
use serde_json::{json, Value};
use tokio::sync::watch;

fn registry() -> Registry {
    docket_regimes::registry().unwrap()
}

fn testdata(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/testdata").join(name)
}

fn success() -> Value {
    let data = std::fs::read(testdata("success.json")).unwrap();
    serde_json::from_slice(&data).unwrap()
}

fn italian_invoice(retained_ext: Value) -> Value {
    let address = json!({
        "num": "1",
        "street": "Via del Corso",
        "locality": "Roma",
        "code": "00186",
        "country": "IT"
    });
    json!({
        "$schema": "https://gobl.org/draft-0/bill/invoice",
        "$regime": "IT",
        "$addons": ["it-sdi-v1"],
        "code": "001",
        "issue_date": "2024-05-02",
        "supplier": {
            "name": "Provide One S.r.l.",
            "tax_id": {"country": "IT", "code": "12345678903"},
            "addresses": [address.clone()]
        },
        "customer": {
            "name": "Sample Customer S.p.A.",
            "tax_id": {"country": "IT", "code": "13029381004"},
            "addresses": [address]
        },
        "lines": [{
            "quantity": "10",
            "item": {"name": "Consulenza", "price": "100.00"},
            "taxes": [
                {"cat": "VAT", "rate": "general"},
                {"cat": "IRPEF", "percent": "20%", "ext": retained_ext}
            ]
        }]
    })
}

#[test]
fn known_good_envelope_validates() {
    let data = std::fs::read(testdata("success.json")).unwrap();
    ops::validate(&registry(), &data).unwrap();
}

#[test]
fn edited_document_fails_digest() {
    let mut env = success();
    env["doc"]["code"] = json!("002");
    let err = ops::validate(&registry(), env.to_string().as_bytes()).unwrap_err();
    assert_eq!(err.key(), "digest");
}

#[test]
fn missing_totals_is_reported_under_doc() {
    let mut env = success();
    env["doc"].as_object_mut().unwrap().remove("totals");
    let err = ops::validate(&registry(), env.to_string().as_bytes()).unwrap_err();
    assert_eq!(err.code(), 422);
    assert_eq!(err.fields().unwrap().message_at("doc.totals"), Some("cannot be blank"));
}

#[test]
fn arca_scenario_sets_document_type_and_note() {
    let input = json!({
        "$schema": "https://gobl.org/draft-0/bill/invoice",
        "$regime": "AR",
        "$addons": ["ar-arca-v4"],
        "type": "standard",
        "code": "0001-00000001",
        "issue_date": "2024-08-01",
        "supplier": {
            "name": "Proveedor S.A.",
            "tax_id": {"country": "AR", "code": "30500010912"}
        },
        "lines": [{
            "quantity": "1",
            "item": {"name": "Producto", "price": "1000.00"},
            "taxes": [{"cat": "VAT", "rate": "general"}]
        }]
    });
    let out = ops::build(&registry(), &ParseOptions::new(input.to_string())).unwrap();
    let v = serde_json::to_value(&out).unwrap();
    assert_eq!(v["tax"]["ext"]["ar-arca-doc-type"], "001");
    let notes = v["notes"].as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["key"], "legal");
    assert_eq!(notes[0]["src"], "ar-arca-doc-type");
}

#[test]
fn retained_tax_requires_extension() {
    let input = italian_invoice(json!({}));
    let err = ops::build(&registry(), &ParseOptions::new(input.to_string())).unwrap_err();
    assert_eq!(
        err.fields().unwrap().message_at("lines.0.taxes.1.ext.it-sdi-retained"),
        Some("required")
    );
}

#[test]
fn legacy_retained_key_is_renamed() {
    let input = italian_invoice(json!({"it-sdi-retained-tax": "A"}));
    let out = ops::build(&registry(), &ParseOptions::new(input.to_string())).unwrap();
    let v = serde_json::to_value(&out).unwrap();
    let ext = &v["lines"][0]["taxes"][1]["ext"];
    assert_eq!(ext["it-sdi-retained"], "A");
    assert!(ext.get("it-sdi-retained-tax").is_none());
}

#[tokio::test]
async fn bulk_answers_in_completion_order() {
    let bulk = Bulk::new(Arc::new(registry()), PrivateKey::generate());
    let input = concat!(
        r#"{"action": "sleep", "payload": "100ms", "req_id": "sleep"}"#,
        "\n",
        r#"{"action": "ping", "req_id": "ping"}"#,
        "\n",
    );
    let (_tx, cancel) = watch::channel(false);
    let mut rx = bulk.spawn(input.as_bytes(), cancel);
    let mut out = Vec::new();
    while let Some(res) = rx.recv().await {
        out.push(res);
    }

    let order: Vec<(String, u64, bool)> = out
        .iter()
        .map(|r| (r.req_id.clone(), r.seq_id, r.is_final))
        .collect();
    assert_eq!(
        order,
        vec![
            ("ping".to_string(), 2, false),
            ("sleep".to_string(), 1, false),
            (String::new(), 3, true),
        ]
    );
    assert_eq!(out[1].payload, Some(json!({"sleep": "done"})));
}

#[tokio::test]
async fn bulk_validates_fixture() {
    let bulk = Bulk::new(Arc::new(registry()), PrivateKey::generate());
    let (_tx, cancel) = watch::channel(false);
    let req = docket_engine::BulkRequest {
        action: "validate".into(),
        req_id: "v".into(),
        payload: json!({"data": success()}),
        indent: false,
    };
    let res = bulk.handle(req, 1, cancel).await;
    assert!(res.error.is_none(), "{:?}", res.error);
    assert_eq!(res.payload, Some(json!({"ok": true})));
}
