//! # Canonical Serialization: JCS Byte Production
//!
//! `CanonicalBytes` is the only input accepted by the digest and signing
//! functions. Documents are converted to a JSON value, checked, and then
//! written in RFC 8785 (JSON Canonicalization Scheme) form: sorted keys,
//! compact separators, a single deterministic byte sequence.
//!
//! ## Invariant
//!
//! The inner `Vec<u8>` is private and `CanonicalBytes::new()` is the only
//! constructor, so no code path can hash or sign bytes produced by a plain
//! `serde_json::to_vec()`.
//!
//! ## Float Rejection
//!
//! Monetary values are decimal strings throughout the document model.
//! A non-integer JSON number reaching canonicalization means some value
//! bypassed `Amount`/`Percentage`, and is rejected rather than hashed with
//! an ambiguous textual form.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - Numbers are integers; floats are rejected.
/// - Object keys are sorted, separators are compact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains a
    /// non-integer number, and `CanonicalizationError::SerializationFailed`
    /// if the value cannot be represented as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(reject_floats),
        Value::Object(map) => map.values().try_for_each(reject_floats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(cb: &CanonicalBytes) -> &str {
        std::str::from_utf8(cb.as_bytes()).unwrap()
    }

    #[test]
    fn keys_are_sorted() {
        let data = serde_json::json!({"supplier": {"name": "A"}, "currency": "EUR", "code": "001"});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(text(&cb), r#"{"code":"001","currency":"EUR","supplier":{"name":"A"}}"#);
    }

    #[test]
    fn nested_arrays_keep_order() {
        let data = serde_json::json!({"lines": [{"i": 2}, {"i": 1}]});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(text(&cb), r#"{"lines":[{"i":2},{"i":1}]}"#);
    }

    #[test]
    fn float_amount_is_rejected() {
        let data = serde_json::json!({"totals": {"sum": 10.5}});
        match CanonicalBytes::new(&data) {
            Err(CanonicalizationError::FloatRejected(f)) => assert_eq!(f, 10.5),
            other => panic!("expected FloatRejected, got {other:?}"),
        }
    }

    #[test]
    fn string_amount_passes() {
        let data = serde_json::json!({"sum": "10.50"});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(text(&cb), r#"{"sum":"10.50"}"#);
    }

    #[test]
    fn integers_pass() {
        let data = serde_json::json!({"i": 1, "n": -42, "big": 9_999_999_999i64});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert_eq!(text(&cb), r#"{"big":9999999999,"i":1,"n":-42}"#);
    }

    #[test]
    fn unicode_is_not_escaped() {
        let data = serde_json::json!({"name": "Compañía"});
        let cb = CanonicalBytes::new(&data).unwrap();
        assert!(text(&cb).contains("Compañía"));
    }

    #[test]
    fn empty_containers() {
        assert_eq!(CanonicalBytes::new(&serde_json::json!({})).unwrap().as_bytes(), b"{}");
        assert_eq!(CanonicalBytes::new(&serde_json::json!([])).unwrap().as_bytes(), b"[]");
        assert!(!CanonicalBytes::new(&serde_json::json!({})).unwrap().is_empty());
    }
}
