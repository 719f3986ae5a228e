//! # Parsing
//!
//! Every pipeline operation starts here. The raw input is decoded into a
//! generic tree, layered over an optional template and under the `set*`
//! overrides, and only then decoded by `$schema` into an [`Envelope`] or a
//! bare [`Document`].
//!
//! ## Layering
//!
//! ```text
//! template  <  input  <  set-yaml  <  set-string  <  set-file
//! ```
//!
//! Objects merge key by key; anything else on the right replaces what is
//! on the left.
//!
//! ## Set paths
//!
//! A set key is a dotted path into the tree: `customer.name` targets
//! `{"customer": {"name": …}}`. A literal dot inside a segment is written
//! `\.`. A leading dot anchors at the root and may be dropped, so `.foo`
//! and `foo` are the same key. The key `.` alone targets the root itself
//! and must carry an object.
//!
//! Input, templates and set values are read as YAML, which accepts every
//! JSON document as well.

use std::collections::BTreeMap;
use std::path::PathBuf;

use docket_core::DocketError;
use docket_doc::{schema, Document, Envelope};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Stand-in for an escaped dot while a key is being split.
const ESCAPED_DOT: char = '\0';

/// Everything [`parse`] needs.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Merged underneath the input.
    pub template: Option<Vec<u8>>,
    /// The document or envelope.
    pub input: Vec<u8>,
    /// Short schema name (`bill/invoice`, `invoice`) injected when the
    /// input has no `$schema`.
    pub doc_type: Option<String>,
    /// Wrap a bare document in a new draft envelope.
    pub envelop: bool,
    /// Path to YAML text.
    pub set_yaml: BTreeMap<String, String>,
    /// Path to plain string.
    pub set_string: BTreeMap<String, String>,
    /// Path to a YAML or JSON file.
    pub set_file: BTreeMap<String, PathBuf>,
}

impl ParseOptions {
    /// Options for `input` alone.
    pub fn new(input: impl Into<Vec<u8>>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }
}

/// Result of parsing: an envelope or a bare document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Parsed {
    /// The input was (or was wrapped into) an envelope.
    Envelope(Box<Envelope>),
    /// A bare document.
    Document(Box<Document>),
}

impl Parsed {
    /// The envelope, or `BadRequest` for a bare document.
    pub fn into_envelope(self) -> Result<Envelope, DocketError> {
        match self {
            Self::Envelope(env) => Ok(*env),
            Self::Document(_) => Err(DocketError::BadRequest("input is not an envelope".into())),
        }
    }

    /// The document, inside the envelope or bare.
    pub fn document(&self) -> Result<&Document, DocketError> {
        match self {
            Self::Envelope(env) => env.document(),
            Self::Document(doc) => Ok(doc),
        }
    }
}

/// Parse `opts` into an envelope or document.
///
/// # Errors
///
/// - `BadRequest` for undecodable input or an unrecognized doc type.
/// - `Invalid` for set values that cannot be decoded or merged.
/// - `UnknownSchema` when no `$schema` can be determined.
pub fn parse(opts: &ParseOptions) -> Result<Parsed, DocketError> {
    let sets = parse_sets(opts)?;

    let mut tree = Map::new();
    if let Some(template) = &opts.template {
        merge(&mut tree, decode_object(template, "template")?);
    }
    merge(&mut tree, decode_object(&opts.input, "input")?);
    merge(&mut tree, sets);

    let is_envelope = tree.get("$schema").and_then(Value::as_str) == Some(schema::ENVELOPE);
    if let Some(name) = opts.doc_type.as_deref().filter(|t| !t.is_empty()) {
        let id = find_type(name)
            .ok_or_else(|| DocketError::BadRequest(format!("unrecognized doc type: {name:?}")))?;
        if is_envelope {
            let doc = tree
                .entry("doc")
                .or_insert_with(|| Value::Object(Map::new()));
            if doc.is_null() {
                *doc = Value::Object(Map::new());
            }
            if let Value::Object(doc) = doc {
                inject_schema(doc, id);
            }
        } else {
            inject_schema(&mut tree, id);
        }
    }

    let root = Value::Object(tree);
    if is_envelope {
        debug!("parsed envelope");
        return Ok(Parsed::Envelope(Box::new(Envelope::from_value(root)?)));
    }
    let doc = Document::from_value(root)?;
    debug!(schema = doc.schema(), envelop = opts.envelop, "parsed document");
    if opts.envelop {
        Ok(Parsed::Envelope(Box::new(Envelope::new(doc))))
    } else {
        Ok(Parsed::Document(Box::new(doc)))
    }
}

/// Full schema identity for a short document type name. Both the short
/// name (`bill/invoice`) and its last segment (`invoice`) are accepted.
pub fn find_type(name: &str) -> Option<&'static str> {
    let name = name.trim_matches('/');
    schema::DOCUMENTS.iter().copied().find(|id| {
        schema::short_name(id)
            .is_some_and(|short| short == name || short.rsplit('/').next() == Some(name))
    })
}

/// Decode YAML or JSON text into a generic tree.
pub fn decode(data: &[u8], what: &str) -> Result<Value, DocketError> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(DocketError::BadRequest(format!("{what}: no data")));
    }
    serde_yaml::from_slice(data).map_err(|e| DocketError::BadRequest(format!("{what}: {e}")))
}

fn decode_object(data: &[u8], what: &str) -> Result<Map<String, Value>, DocketError> {
    match decode(data, what)? {
        Value::Object(map) => Ok(map),
        other => Err(DocketError::BadRequest(format!(
            "{what}: expected an object, found {}",
            kind(&other)
        ))),
    }
}

fn inject_schema(map: &mut Map<String, Value>, id: &str) {
    map.entry("$schema")
        .or_insert_with(|| Value::String(id.to_string()));
}

/// Collect the `set*` maps into one tree, in key order within each map.
pub fn parse_sets(opts: &ParseOptions) -> Result<Map<String, Value>, DocketError> {
    let mut values = Map::new();
    for (key, text) in &opts.set_yaml {
        let value: Value = serde_yaml::from_str(text).map_err(|e| DocketError::Invalid(e.to_string()))?;
        set_value(&mut values, key, value)?;
    }
    for (key, text) in &opts.set_string {
        set_value(&mut values, key, Value::String(text.clone()))?;
    }
    for (key, path) in &opts.set_file {
        let data = std::fs::read(path)
            .map_err(|e| DocketError::BadRequest(format!("{}: {e}", path.display())))?;
        let value: Value = serde_yaml::from_slice(&data)
            .map_err(|e| DocketError::Invalid(format!("{}: {e}", path.display())))?;
        set_value(&mut values, key, value)?;
    }
    Ok(values)
}

/// Merge `value` into `values` at the dotted path `key`.
pub fn set_value(values: &mut Map<String, Value>, key: &str, value: Value) -> Result<(), DocketError> {
    let key = key.replace(r"\.", &ESCAPED_DOT.to_string());
    if key == "." {
        return match value {
            Value::Object(map) => {
                merge(values, map);
                Ok(())
            }
            other => Err(DocketError::Invalid(format!(
                "cannot merge {} into the root object",
                kind(&other)
            ))),
        };
    }
    let key = match key.strip_prefix('.') {
        Some(rest) if !rest.is_empty() => rest,
        _ => key.as_str(),
    };

    let mut nested = value;
    for segment in key.rsplit('.') {
        let segment = segment.replace(ESCAPED_DOT, ".");
        nested = Value::Object(Map::from_iter([(segment, nested)]));
    }
    if let Value::Object(map) = nested {
        merge(values, map);
    }
    Ok(())
}

/// Deep merge with right-side precedence.
pub fn merge(dst: &mut Map<String, Value>, src: Map<String, Value>) {
    for (key, value) in src {
        match (dst.get_mut(&key), value) {
            (Some(Value::Object(d)), Value::Object(s)) => merge(d, s),
            (_, value) => {
                dst.insert(key, value);
            }
        }
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::io::Write;

    fn sets(yaml: &[(&str, &str)]) -> ParseOptions {
        ParseOptions {
            set_yaml: yaml.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn yaml_values_keep_their_types() {
        let got = parse_sets(&sets(&[
            ("string", "bar"),
            ("number", "1234"),
            ("bool", "true"),
            ("array", "[1,2,3]"),
            ("object", r#"{"foo":"bar"}"#),
        ]))
        .unwrap();
        assert_eq!(
            Value::Object(got),
            json!({
                "string": "bar",
                "number": 1234,
                "bool": true,
                "array": [1, 2, 3],
                "object": {"foo": "bar"}
            })
        );
    }

    #[test]
    fn invalid_yaml_value() {
        let err = parse_sets(&sets(&[("foo", "[bar")])).unwrap_err();
        assert_eq!(err.code(), 422);
    }

    #[test]
    fn dotted_paths() {
        let got = parse_sets(&sets(&[("foo.bar", "baz"), (".anchored", "x")])).unwrap();
        assert_eq!(Value::Object(got), json!({"foo": {"bar": "baz"}, "anchored": "x"}));
    }

    #[test]
    fn escaped_period_is_literal() {
        let got = parse_sets(&sets(&[(r"\.", "foo"), (r"a\.b.c", "d")])).unwrap();
        assert_eq!(Value::Object(got), json!({".": "foo", "a.b": {"c": "d"}}));
    }

    #[test]
    fn root_key_merges_object() {
        let got = parse_sets(&sets(&[(".", r#"{"foo":"bar"}"#)])).unwrap();
        assert_eq!(Value::Object(got), json!({"foo": "bar"}));
    }

    #[test]
    fn root_key_rejects_scalars() {
        let err = parse_sets(&sets(&[(".", "foo")])).unwrap_err();
        assert_eq!(err.code(), 422);
        assert_eq!(err.to_string(), "cannot merge string into the root object");

        let opts = ParseOptions {
            set_string: [(".".to_string(), "1234".to_string())].into_iter().collect(),
            ..Default::default()
        };
        assert!(parse_sets(&opts).is_err());
    }

    #[test]
    fn explicit_string_is_not_parsed() {
        let opts = ParseOptions {
            set_string: [("foo".to_string(), "1234".to_string())].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(Value::Object(parse_sets(&opts).unwrap()), json!({"foo": "1234"}));
    }

    #[test]
    fn set_file_reads_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name: Provide One S.L.\ntax_id:\n  country: ES").unwrap();
        let opts = ParseOptions {
            set_file: [("supplier".to_string(), file.path().to_path_buf())].into_iter().collect(),
            ..Default::default()
        };
        let got = parse_sets(&opts).unwrap();
        assert_eq!(
            Value::Object(got),
            json!({"supplier": {"name": "Provide One S.L.", "tax_id": {"country": "ES"}}})
        );
    }

    #[test]
    fn set_file_missing() {
        let opts = ParseOptions {
            set_file: [("foo".to_string(), PathBuf::from("notfound.yaml"))].into_iter().collect(),
            ..Default::default()
        };
        let err = parse_sets(&opts).unwrap_err();
        assert_eq!(err.code(), 400);
        assert!(err.to_string().starts_with("notfound.yaml:"));
    }

    #[test]
    fn merge_prefers_the_right() {
        let mut dst = json!({"a": {"b": 1, "c": 2}, "d": [1]}).as_object().cloned().unwrap();
        let src = json!({"a": {"b": 3}, "d": [2, 3]}).as_object().cloned().unwrap();
        merge(&mut dst, src);
        assert_eq!(Value::Object(dst), json!({"a": {"b": 3, "c": 2}, "d": [2, 3]}));
    }

    #[test]
    fn template_input_and_sets_layer() {
        let opts = ParseOptions {
            template: Some(br#"{"$schema": "https://gobl.org/draft-0/note/message", "title": "T", "content": "template"}"#.to_vec()),
            input: b"content: input\n".to_vec(),
            set_string: [("title".to_string(), "set".to_string())].into_iter().collect(),
            ..Default::default()
        };
        let parsed = parse(&opts).unwrap();
        let v = serde_json::to_value(&parsed).unwrap();
        assert_eq!(v["content"], "input");
        assert_eq!(v["title"], "set");
    }

    #[test]
    fn doc_type_is_injected() {
        let opts = ParseOptions {
            doc_type: Some("note/message".into()),
            ..ParseOptions::new(r#"{"content": "hi"}"#)
        };
        let parsed = parse(&opts).unwrap();
        assert_eq!(parsed.document().unwrap().schema(), schema::MESSAGE);

        let opts = ParseOptions {
            doc_type: Some("message".into()),
            ..ParseOptions::new(r#"{"$schema": "https://gobl.org/draft-0/envelope", "doc": {"content": "hi"}}"#)
        };
        let parsed = parse(&opts).unwrap();
        assert!(matches!(parsed, Parsed::Envelope(_)));
        assert_eq!(parsed.document().unwrap().schema(), schema::MESSAGE);
    }

    #[test]
    fn doc_type_does_not_override() {
        let opts = ParseOptions {
            doc_type: Some("bill/invoice".into()),
            ..ParseOptions::new(r#"{"$schema": "https://gobl.org/draft-0/note/message", "content": "hi"}"#)
        };
        assert_eq!(parse(&opts).unwrap().document().unwrap().schema(), schema::MESSAGE);
    }

    #[test]
    fn unrecognized_doc_type() {
        let opts = ParseOptions {
            doc_type: Some("foo/bar".into()),
            ..ParseOptions::new(r#"{"content": "hi"}"#)
        };
        let err = parse(&opts).unwrap_err();
        assert_eq!(err.code(), 400);
        assert_eq!(err.to_string(), r#"unrecognized doc type: "foo/bar""#);
    }

    #[test]
    fn missing_schema() {
        let err = parse(&ParseOptions::new(r#"{"content": "hi"}"#)).unwrap_err();
        assert_eq!(err.key(), "unknown-schema");
    }

    #[test]
    fn envelop_wraps_in_draft() {
        let opts = ParseOptions {
            envelop: true,
            ..ParseOptions::new(r#"{"$schema": "https://gobl.org/draft-0/note/message", "content": "hi"}"#)
        };
        let env = parse(&opts).unwrap().into_envelope().unwrap();
        assert!(env.head.unwrap().draft);
        assert!(env.sigs.is_empty());
    }

    #[test]
    fn input_must_be_an_object() {
        let err = parse(&ParseOptions::new("[1, 2]")).unwrap_err();
        assert_eq!(err.code(), 400);
        let err = parse(&ParseOptions::new("  \n")).unwrap_err();
        assert_eq!(err.to_string(), "input: no data");
        let err = parse(&ParseOptions::new("{ foo: [")).unwrap_err();
        assert_eq!(err.code(), 400);
    }

    proptest! {
        #[test]
        fn set_path_lands_at_pointer(
            segments in prop::collection::vec("[a-z]{1,6}", 1..5),
            leaf in "[a-zA-Z0-9 ]{0,12}",
        ) {
            let mut values = Map::new();
            set_value(&mut values, &segments.join("."), Value::String(leaf.clone())).unwrap();
            let pointer = format!("/{}", segments.join("/"));
            let values = Value::Object(values);
            let expected = Value::String(leaf);
            prop_assert_eq!(values.pointer(&pointer), Some(&expected));
        }

        #[test]
        fn merge_is_idempotent(a in "[a-z]{1,4}", b in "[a-z]{1,4}", n in 0i64..100) {
            let inner = Map::from_iter([(b, json!(n))]);
            let src = Map::from_iter([(a, Value::Object(inner))]);
            let mut once = Map::new();
            merge(&mut once, src.clone());
            let mut twice = once.clone();
            merge(&mut twice, src);
            prop_assert_eq!(once, twice);
        }
    }
}
