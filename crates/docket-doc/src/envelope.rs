//! # Envelopes
//!
//! The transport wrapper: a [`Header`], one [`Document`] and the
//! signatures over the header.
//!
//! ## Lifecycle
//!
//! A new envelope is a draft. [`Envelope::calculate`] runs the document
//! pipeline and records the document digest in the head.
//! [`Envelope::sign`] clears the draft flag, recalculates, validates and
//! appends a signature over the head. A signed envelope verifies against
//! a public key as long as the document still hashes to the head digest
//! and the head still contains everything that was signed.

use docket_core::{sha256_digest, CanonicalBytes, ContentDigest, DocketError, FieldErrors};
use docket_crypto::{PrivateKey, PublicKey, SignedPayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::bill::CorrectionOptions;
use crate::document::Document;
use crate::head::Header;
use crate::registry::Registry;
use crate::schema;
use crate::validate::{INVALID, REQUIRED};

/// An envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// Schema identity.
    #[serde(rename = "$schema")]
    pub schema: String,
    /// Metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Header>,
    /// The payload document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<Document>,
    /// Signatures over the head.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sigs: Vec<SignedPayload>,
}

/// Wire shape before the document is decoded by schema.
#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "$schema", default)]
    schema: String,
    #[serde(default)]
    head: Option<Header>,
    #[serde(default)]
    doc: Option<Value>,
    #[serde(default)]
    sigs: Vec<SignedPayload>,
}

impl Envelope {
    /// A draft envelope around `doc`.
    pub fn new(doc: Document) -> Self {
        Self {
            schema: schema::ENVELOPE.to_string(),
            head: Some(Header::new()),
            doc: Some(doc),
            sigs: Vec::new(),
        }
    }

    /// Decode an envelope value. An absent or `null` document is kept
    /// as `None`, for validation to report.
    pub fn from_value(value: Value) -> Result<Self, DocketError> {
        let raw: RawEnvelope = serde_json::from_value(value)
            .map_err(|e| DocketError::BadRequest(format!("invalid envelope: {e}")))?;
        let doc = match raw.doc {
            None | Some(Value::Null) => None,
            Some(v) => Some(Document::from_value(v)?),
        };
        Ok(Self {
            schema: raw.schema,
            head: raw.head,
            doc,
            sigs: raw.sigs,
        })
    }

    /// The document, or `NoDocument`.
    pub fn document(&self) -> Result<&Document, DocketError> {
        self.doc.as_ref().ok_or(DocketError::NoDocument)
    }

    /// True once signed.
    pub fn is_signed(&self) -> bool {
        !self.sigs.is_empty()
    }

    /// Run the document pipeline and record the digest in the head.
    pub fn calculate(&mut self, registry: &Registry) -> Result<(), DocketError> {
        let doc = self.doc.as_mut().ok_or(DocketError::NoDocument)?;
        doc.calculate(registry).map_err(|e| e.prefixed("doc"))?;
        let dig = digest(doc)?;
        self.schema = schema::ENVELOPE.to_string();
        let head = self.head.get_or_insert_with(Header::new);
        head.dig = Some(dig);
        debug!(uuid = %head.uuid, "envelope calculated");
        Ok(())
    }

    /// Check the envelope and its document without changing them.
    ///
    /// # Errors
    ///
    /// `Validation` for field failures (the document's under `doc`), then
    /// `Digest` when the document no longer matches the head.
    pub fn validate(&self, registry: &Registry) -> Result<(), DocketError> {
        let mut errs = FieldErrors::new();
        if self.schema.is_empty() {
            errs.add("$schema", REQUIRED);
        } else if self.schema != schema::ENVELOPE {
            errs.add("$schema", INVALID);
        }
        match &self.head {
            None => errs.add("head", REQUIRED),
            Some(head) => {
                if head.dig.is_none() {
                    errs.nest("head", FieldErrors::single("dig", REQUIRED));
                }
                if head.draft && !self.sigs.is_empty() {
                    errs.add("sigs", "must be blank");
                }
            }
        }
        match &self.doc {
            None => errs.add("doc", REQUIRED),
            Some(doc) => errs.nest("doc", doc.validate(registry)),
        }
        errs.into_result()?;

        if let (Some(head), Some(doc)) = (&self.head, &self.doc) {
            let dig = digest(doc)?;
            if head.dig.as_ref() != Some(&dig) {
                return Err(DocketError::Digest("document digest does not match head".into()));
            }
        }
        Ok(())
    }

    /// Finalize and sign with `key`.
    pub fn sign(&mut self, registry: &Registry, key: &PrivateKey) -> Result<(), DocketError> {
        self.head.get_or_insert_with(Header::new).draft = false;
        self.calculate(registry)?;
        self.validate(registry)?;
        let head = self
            .head
            .as_ref()
            .ok_or_else(|| DocketError::Internal("head missing after calculation".into()))?;
        let sig = SignedPayload::sign(key, head)?;
        debug!(kid = %sig.kid, "envelope signed");
        self.sigs.push(sig);
        Ok(())
    }

    /// Check every signature against `key`.
    ///
    /// # Errors
    ///
    /// `Invalid` for drafts, unsigned envelopes and heads that no longer
    /// contain what was signed; `KeyMismatch` when a signature does not
    /// verify under `key`.
    pub fn verify(&self, key: &PublicKey) -> Result<(), DocketError> {
        let head = self
            .head
            .as_ref()
            .ok_or_else(|| DocketError::from(FieldErrors::single("head", REQUIRED)))?;
        if head.draft {
            return Err(DocketError::Invalid("cannot verify draft document".into()));
        }
        if self.sigs.is_empty() {
            return Err(DocketError::Invalid("no signatures to verify".into()));
        }
        for sig in &self.sigs {
            sig.verify(key)?;
            let signed: Header = sig.payload()?;
            if !head.contains(&signed) {
                return Err(DocketError::Invalid("header mismatch".into()));
            }
        }
        Ok(())
    }

    /// A new draft envelope holding the correction of this one's
    /// document. Head stamps travel into the options so the correction
    /// can cite them.
    pub fn correct(&self, registry: &Registry, opts: &CorrectionOptions) -> Result<Envelope, DocketError> {
        let mut doc = self.document()?.clone();
        let mut opts = opts.clone();
        if opts.stamps.is_empty() {
            if let Some(head) = &self.head {
                opts.stamps = head.stamps.clone();
            }
        }
        doc.correct(registry, &opts)?;
        let mut env = Envelope::new(doc);
        env.calculate(registry)?;
        Ok(env)
    }

    /// A new draft envelope holding a replica of the document.
    pub fn replicate(&self, registry: &Registry) -> Result<Envelope, DocketError> {
        let mut env = Envelope::new(self.document()?.replicate());
        env.calculate(registry)?;
        Ok(env)
    }
}

fn digest(doc: &Document) -> Result<ContentDigest, DocketError> {
    Ok(sha256_digest(&CanonicalBytes::new(doc)?))
}
