//! # Pipeline Operations
//!
//! Build, sign, verify, validate, correct and replicate. Each one parses
//! its input (see [`crate::parse`]) and drives the document model against
//! a [`Registry`]. None of them keeps state between calls.

use chrono::NaiveDate;
use docket_core::{DocketError, Key};
use docket_crypto::{KeyPair, PrivateKey, PublicKey};
use docket_doc::bill::types;
use docket_doc::{CorrectionOptions, Registry};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::parse::{decode, parse, ParseOptions, Parsed};

/// Options for [`correct`].
#[derive(Debug, Clone, Default)]
pub struct CorrectOptions {
    /// How to read the document being corrected.
    pub parse: ParseOptions,
    /// Return the JSON Schema of the accepted options instead.
    pub options_schema: bool,
    /// Shorthand for `type: credit-note`.
    pub credit: bool,
    /// Shorthand for `type: debit-note`.
    pub debit: bool,
    /// Issue date of the correction.
    pub date: Option<NaiveDate>,
    /// Raw correction options as JSON or YAML text.
    pub data: Option<Vec<u8>>,
}

/// Result of [`correct`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Corrected {
    /// The corrective envelope or document.
    Parsed(Parsed),
    /// The correction options schema.
    Schema(Value),
}

/// Calculate and validate. Envelope input loses its signatures, since
/// recalculation invalidates them.
pub fn build(registry: &Registry, opts: &ParseOptions) -> Result<Parsed, DocketError> {
    match parse(opts)? {
        Parsed::Envelope(mut env) => {
            env.sigs.clear();
            env.calculate(registry)?;
            env.validate(registry)?;
            debug!("built envelope");
            Ok(Parsed::Envelope(env))
        }
        Parsed::Document(mut doc) => {
            // Calculation ends with document validation.
            doc.calculate(registry)?;
            debug!(schema = doc.schema(), "built document");
            Ok(Parsed::Document(doc))
        }
    }
}

/// Build into an envelope, whatever the input, and sign it with `key`.
pub fn sign(registry: &Registry, opts: &ParseOptions, key: &PrivateKey) -> Result<Parsed, DocketError> {
    let opts = ParseOptions {
        envelop: true,
        ..opts.clone()
    };
    let mut env = parse(&opts)?.into_envelope()?;
    env.sigs.clear();
    env.sign(registry, key)?;
    info!(kid = %key.kid(), "signed envelope");
    Ok(Parsed::Envelope(Box::new(env)))
}

/// Check an envelope's structure, digest and signatures under `key`.
pub fn verify(registry: &Registry, input: &[u8], key: &PublicKey) -> Result<(), DocketError> {
    let env = parse(&ParseOptions::new(input))?.into_envelope()?;
    env.validate(registry)?;
    env.verify(key)
}

/// Validate an envelope or document without modifying it.
pub fn validate(registry: &Registry, input: &[u8]) -> Result<(), DocketError> {
    match parse(&ParseOptions::new(input))? {
        Parsed::Envelope(env) => env.validate(registry),
        Parsed::Document(doc) => doc.validate(registry).into_result().map_err(DocketError::from),
    }
}

/// Turn a document into its correction, or describe the options a
/// correction would accept.
pub fn correct(registry: &Registry, opts: &CorrectOptions) -> Result<Corrected, DocketError> {
    let parsed = parse(&opts.parse)?;
    if opts.options_schema {
        let doc = parsed.document()?;
        // Only invoices can be corrected; other documents have no options.
        let schema = match doc.as_invoice() {
            Some(_) => doc.correction_options_schema(registry)?,
            None => Value::Null,
        };
        return Ok(Corrected::Schema(schema));
    }

    let options = correction_options(opts)?;
    let out = match parsed {
        Parsed::Envelope(env) => {
            let out = env.correct(registry, &options)?;
            out.validate(registry)?;
            Parsed::Envelope(Box::new(out))
        }
        Parsed::Document(mut doc) => {
            doc.correct(registry, &options)?;
            Parsed::Document(doc)
        }
    };
    debug!(kind = ?options.kind, "corrected");
    Ok(Corrected::Parsed(out))
}

fn correction_options(opts: &CorrectOptions) -> Result<CorrectionOptions, DocketError> {
    if opts.credit && opts.debit {
        return Err(DocketError::BadRequest("credit and debit are mutually exclusive".into()));
    }
    let mut options = match opts.data.as_deref() {
        Some(data) if !data.iter().all(u8::is_ascii_whitespace) => {
            let value = decode(data, "options")?;
            serde_json::from_value::<CorrectionOptions>(value)
                .map_err(|e| DocketError::Invalid(format!("invalid options: {e}")))?
        }
        _ => CorrectionOptions::default(),
    };
    if opts.credit {
        options.kind = Some(Key::from(types::CREDIT_NOTE));
    }
    if opts.debit {
        options.kind = Some(Key::from(types::DEBIT_NOTE));
    }
    if opts.date.is_some() {
        options.issue_date = opts.date;
    }
    Ok(options)
}

/// A recalculated copy with identifiers, dates and signatures reset.
pub fn replicate(registry: &Registry, opts: &ParseOptions) -> Result<Parsed, DocketError> {
    match parse(opts)? {
        Parsed::Envelope(env) => Ok(Parsed::Envelope(Box::new(env.replicate(registry)?))),
        Parsed::Document(doc) => {
            let mut copy = doc.replicate();
            copy.calculate(registry)?;
            Ok(Parsed::Document(Box::new(copy)))
        }
    }
}

/// A new signing key pair.
pub fn keygen() -> KeyPair {
    KeyPair::generate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket_doc::schema;

    const MESSAGE: &str = r#"{"$schema": "https://gobl.org/draft-0/note/message", "content": "Hello"}"#;

    fn registry() -> Registry {
        docket_regimes::registry().unwrap()
    }

    fn invoice() -> String {
        serde_json::json!({
            "$schema": schema::INVOICE,
            "series": "SAMPLE",
            "code": "001",
            "issue_date": "2024-03-01",
            "supplier": {
                "name": "Provide One S.L.",
                "tax_id": {"country": "ES", "code": "B98602642"}
            },
            "customer": {
                "name": "Sample Consumer",
                "tax_id": {"country": "ES", "code": "54387763P"}
            },
            "lines": [{
                "quantity": "20",
                "item": {"name": "Development services", "price": "90.00"},
                "taxes": [{"cat": "VAT", "rate": "general"}]
            }]
        })
        .to_string()
    }

    #[test]
    fn build_bare_invoice() {
        let reg = registry();
        let out = build(&reg, &ParseOptions::new(invoice())).unwrap();
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["$regime"], "ES");
        assert_eq!(v["currency"], "EUR");
        assert_eq!(v["totals"]["sum"], "1800.00");
        assert_eq!(v["totals"]["payable"], "2178.00");
        assert!(v.get("doc").is_none());
    }

    #[test]
    fn build_envelop_records_digest() {
        let reg = registry();
        let opts = ParseOptions {
            envelop: true,
            ..ParseOptions::new(invoice())
        };
        let Parsed::Envelope(env) = build(&reg, &opts).unwrap() else {
            panic!("expected an envelope")
        };
        let head = env.head.as_ref().unwrap();
        assert!(head.draft);
        assert!(head.dig.is_some());
        env.validate(&reg).unwrap();
    }

    #[test]
    fn build_reports_calculation_path() {
        let reg = registry();
        let input = invoice().replace("\"general\"", "\"bogus\"");
        let opts = ParseOptions {
            envelop: true,
            ..ParseOptions::new(input)
        };
        let err = build(&reg, &opts).unwrap_err();
        assert_eq!(err.code(), 422);
    }

    #[test]
    fn build_strips_signatures() {
        let reg = registry();
        let key = PrivateKey::generate();
        let signed = sign(&reg, &ParseOptions::new(MESSAGE), &key).unwrap();
        let json = serde_json::to_vec(&signed).unwrap();
        let Parsed::Envelope(env) = build(&reg, &ParseOptions::new(json)).unwrap() else {
            panic!("expected an envelope")
        };
        assert!(env.sigs.is_empty());
    }

    #[test]
    fn sign_then_verify() {
        let reg = registry();
        let key = PrivateKey::generate();
        let signed = sign(&reg, &ParseOptions::new(invoice()), &key).unwrap();
        let json = serde_json::to_vec(&signed).unwrap();
        verify(&reg, &json, &key.public_key()).unwrap();

        let other = PrivateKey::generate();
        let err = verify(&reg, &json, &other.public_key()).unwrap_err();
        assert_eq!(err.key(), "key-mismatch");
    }

    #[test]
    fn verify_rejects_drafts_and_bare_documents() {
        let reg = registry();
        let key = PrivateKey::generate();
        let opts = ParseOptions {
            envelop: true,
            ..ParseOptions::new(MESSAGE)
        };
        let draft = serde_json::to_vec(&build(&reg, &opts).unwrap()).unwrap();
        let err = verify(&reg, &draft, &key.public_key()).unwrap_err();
        assert_eq!(err.to_string(), "cannot verify draft document");

        let err = verify(&reg, MESSAGE.as_bytes(), &key.public_key()).unwrap_err();
        assert_eq!(err.code(), 400);
    }

    #[test]
    fn validate_bare_document() {
        let reg = registry();
        validate(&reg, MESSAGE.as_bytes()).unwrap();
        let err = validate(&reg, br#"{"$schema": "https://gobl.org/draft-0/note/message"}"#).unwrap_err();
        assert_eq!(err.fields().unwrap().message_at("content"), Some("cannot be blank"));
    }

    #[test]
    fn correct_needs_a_type() {
        let reg = registry();
        let built = serde_json::to_vec(&build(&reg, &ParseOptions::new(invoice())).unwrap()).unwrap();
        let opts = CorrectOptions {
            parse: ParseOptions::new(built),
            data: Some(br#"{"issue_date": "2024-04-17"}"#.to_vec()),
            ..Default::default()
        };
        let err = correct(&reg, &opts).unwrap_err();
        assert_eq!(err.fields().unwrap().message_at("type"), Some("missing correction type"));
    }

    #[test]
    fn correct_with_credit_flag() {
        let reg = registry();
        let built = serde_json::to_vec(&build(&reg, &ParseOptions::new(invoice())).unwrap()).unwrap();
        let opts = CorrectOptions {
            parse: ParseOptions::new(built),
            credit: true,
            date: NaiveDate::from_ymd_opt(2024, 4, 17),
            ..Default::default()
        };
        let Corrected::Parsed(out) = correct(&reg, &opts).unwrap() else {
            panic!("expected a document")
        };
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["type"], "credit-note");
        assert_eq!(v["issue_date"], "2024-04-17");
        assert_eq!(v["preceding"][0]["code"], "001");
        assert_eq!(v["preceding"][0]["series"], "SAMPLE");
    }

    #[test]
    fn correct_envelope_returns_new_draft() {
        let reg = registry();
        let key = PrivateKey::generate();
        let signed = sign(&reg, &ParseOptions::new(invoice()), &key).unwrap();
        let opts = CorrectOptions {
            parse: ParseOptions::new(serde_json::to_vec(&signed).unwrap()),
            data: Some(b"type: credit-note\nreason: wrong address\n".to_vec()),
            ..Default::default()
        };
        let Corrected::Parsed(Parsed::Envelope(env)) = correct(&reg, &opts).unwrap() else {
            panic!("expected an envelope")
        };
        assert!(env.sigs.is_empty());
        assert!(env.head.as_ref().unwrap().draft);
        let inv = env.document().unwrap().as_invoice().unwrap();
        assert_eq!(inv.preceding[0].reason.as_deref(), Some("wrong address"));
    }

    #[test]
    fn credit_and_debit_conflict() {
        let reg = registry();
        let opts = CorrectOptions {
            parse: ParseOptions::new(invoice()),
            credit: true,
            debit: true,
            ..Default::default()
        };
        assert_eq!(correct(&reg, &opts).unwrap_err().code(), 400);
    }

    #[test]
    fn options_schema() {
        let reg = registry();
        let opts = CorrectOptions {
            parse: ParseOptions::new(invoice()),
            options_schema: true,
            ..Default::default()
        };
        let Corrected::Schema(schema) = correct(&reg, &opts).unwrap() else {
            panic!("expected a schema")
        };
        assert_eq!(schema["$id"], schema::CORRECTION_OPTIONS);

        let opts = CorrectOptions {
            parse: ParseOptions::new(MESSAGE),
            options_schema: true,
            ..Default::default()
        };
        assert_eq!(correct(&reg, &opts).unwrap(), Corrected::Schema(Value::Null));
    }

    #[test]
    fn replicate_resets_identity() {
        let reg = registry();
        let built = build(&reg, &ParseOptions::new(invoice())).unwrap();
        let first = serde_json::to_value(&built).unwrap();
        let copy = replicate(&reg, &ParseOptions::new(serde_json::to_vec(&built).unwrap())).unwrap();
        let v = serde_json::to_value(&copy).unwrap();
        assert_ne!(v["uuid"], first["uuid"]);
        assert!(v.get("code").is_none());
        assert_eq!(v["totals"], first["totals"]);
    }

    #[test]
    fn keygen_pairs_match() {
        let pair = keygen();
        assert_eq!(pair.private.kid, pair.public.kid());
    }
}
