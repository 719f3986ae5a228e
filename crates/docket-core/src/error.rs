//! # Error Types
//!
//! [`DocketError`] is the taxonomy every pipeline operation returns. Each
//! variant maps to a stable numeric `code` (mirroring HTTP status classes)
//! and a stable string `key`:
//!
//! | code | key | raised by |
//! |------|-----|-----------|
//! | 400 | `bad-request` | malformed input, unknown action or doc type |
//! | 422 | `validation` | field-path failures, envelope state checks |
//! | 422 | `calculation` | a document's totals could not be computed |
//! | 422 | `no-document` | envelope without a document |
//! | 422 | `unknown-schema` | `$schema` not registered |
//! | 422 | `key-mismatch` | signature does not verify under the given key |
//! | 422 | `signature` | malformed signature or signing failure |
//! | 422 | `digest` | head digest does not match the document |
//! | 500 | `internal` | anything that should not happen |
//!
//! Lower-level enums (`CanonicalizationError`, `CryptoError`) convert into
//! `DocketError` with `?`.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::fields::FieldErrors;

/// Pipeline-level error with a stable code and key.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocketError {
    /// Input could not be understood at all.
    #[error("{0}")]
    BadRequest(String),

    /// Field-path validation failures.
    #[error("{0}")]
    Validation(FieldErrors),

    /// A validation failure that is not tied to a field path.
    #[error("{0}")]
    Invalid(String),

    /// The document's calculation step failed.
    #[error("{0}")]
    Calculation(String),

    /// An envelope arrived without a document.
    #[error("no-document")]
    NoDocument,

    /// The `$schema` identity is not registered.
    #[error("unknown-schema: {0}")]
    UnknownSchema(String),

    /// Signature verification failed under the provided key.
    #[error("key-mismatch: {0}")]
    KeyMismatch(String),

    /// Signature could not be produced or decoded.
    #[error("signature: {0}")]
    Signature(String),

    /// The head digest does not match the document.
    #[error("digest: {0}")]
    Digest(String),

    /// Unexpected internal failure.
    #[error("internal: {0}")]
    Internal(String),
}

impl DocketError {
    /// Numeric code mirroring HTTP status classes.
    pub fn code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Internal(_) => 500,
            _ => 422,
        }
    }

    /// Stable string slug.
    pub fn key(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad-request",
            Self::Validation(_) | Self::Invalid(_) => "validation",
            Self::Calculation(_) => "calculation",
            Self::NoDocument => "no-document",
            Self::UnknownSchema(_) => "unknown-schema",
            Self::KeyMismatch(_) => "key-mismatch",
            Self::Signature(_) => "signature",
            Self::Digest(_) => "digest",
            Self::Internal(_) => "internal",
        }
    }

    /// The field tree, for validation errors.
    pub fn fields(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(f) => Some(f),
            _ => None,
        }
    }

    /// Nest a validation error's fields under `field`. Other errors pass
    /// through unchanged.
    pub fn prefixed(self, field: &str) -> Self {
        match self {
            Self::Validation(f) => Self::Validation(f.prefixed(field)),
            other => other,
        }
    }

    /// Render as `code=<n>, message=<text>`.
    pub fn render(&self) -> String {
        format!("code={}, message={}", self.code(), self)
    }
}

impl From<FieldErrors> for DocketError {
    fn from(errs: FieldErrors) -> Self {
        Self::Validation(errs)
    }
}

impl Serialize for DocketError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.fields();
        let mut s = serializer.serialize_struct("DocketError", if fields.is_some() { 4 } else { 3 })?;
        s.serialize_field("code", &self.code())?;
        s.serialize_field("key", self.key())?;
        s.serialize_field("message", &self.to_string())?;
        if let Some(f) = fields {
            s.serialize_field("fields", f)?;
        }
        s.end()
    }
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations; use a decimal string: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

impl From<CanonicalizationError> for DocketError {
    fn from(err: CanonicalizationError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Error in cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// A signature value could not be decoded.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
}

impl From<CryptoError> for DocketError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::VerificationFailed(m) => Self::KeyMismatch(m),
            CryptoError::KeyError(m) => Self::BadRequest(format!("invalid key: {m}")),
            CryptoError::MalformedSignature(m) => Self::Signature(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_keys() {
        let cases = [
            (DocketError::BadRequest("x".into()), 400, "bad-request"),
            (DocketError::Validation(FieldErrors::single("a", "b")), 422, "validation"),
            (DocketError::Invalid("x".into()), 422, "validation"),
            (DocketError::Calculation("x".into()), 422, "calculation"),
            (DocketError::NoDocument, 422, "no-document"),
            (DocketError::UnknownSchema("x".into()), 422, "unknown-schema"),
            (DocketError::KeyMismatch("x".into()), 422, "key-mismatch"),
            (DocketError::Signature("x".into()), 422, "signature"),
            (DocketError::Digest("x".into()), 422, "digest"),
            (DocketError::Internal("x".into()), 500, "internal"),
        ];
        for (err, code, key) in cases {
            assert_eq!(err.code(), code, "{err:?}");
            assert_eq!(err.key(), key, "{err:?}");
        }
    }

    #[test]
    fn render_no_document() {
        assert_eq!(DocketError::NoDocument.render(), "code=422, message=no-document");
    }

    #[test]
    fn render_validation_uses_field_text() {
        let mut f = FieldErrors::new();
        f.add("$schema", "cannot be blank");
        f.add("doc", "cannot be blank");
        f.add("head", "cannot be blank");
        assert_eq!(
            DocketError::Validation(f).render(),
            "code=422, message=$schema: cannot be blank; doc: cannot be blank; head: cannot be blank."
        );
    }

    #[test]
    fn prefixed_only_touches_validation() {
        let err = DocketError::Validation(FieldErrors::single("totals", "cannot be blank"));
        let err = err.prefixed("doc");
        assert_eq!(
            err.fields().and_then(|f| f.message_at("doc.totals")),
            Some("cannot be blank")
        );
        assert_eq!(DocketError::NoDocument.prefixed("doc"), DocketError::NoDocument);
    }

    #[test]
    fn serializes_with_fields() {
        let err = DocketError::Validation(FieldErrors::single("totals", "cannot be blank"));
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["code"], 422);
        assert_eq!(v["key"], "validation");
        assert_eq!(v["message"], "totals: cannot be blank.");
        assert_eq!(v["fields"]["totals"], "cannot be blank");

        let v = serde_json::to_value(DocketError::BadRequest("nope".into())).unwrap();
        assert!(v.get("fields").is_none());
    }

    #[test]
    fn crypto_errors_convert() {
        let e: DocketError = CryptoError::VerificationFailed("bad".into()).into();
        assert_eq!(e.key(), "key-mismatch");
        let e: DocketError = CryptoError::KeyError("short".into()).into();
        assert_eq!(e.code(), 400);
    }
}
