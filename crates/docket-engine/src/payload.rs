//! # Request Payloads
//!
//! The bodies the bulk engine and the HTTP server accept for each
//! operation. Document inputs ([`Data`]) may be given inline as JSON or as
//! a string of JSON or YAML text.

use docket_crypto::{PrivateKey, PublicKey};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::ops::CorrectOptions;
use crate::parse::ParseOptions;

/// Raw document bytes. An inline value is re-encoded as JSON, a string is
/// taken as it is and `null` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Data(pub Vec<u8>);

impl Data {
    /// True when there is nothing but whitespace.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(u8::is_ascii_whitespace)
    }

    /// The bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl<'de> Deserialize<'de> for Data {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Self::default()),
            Value::String(text) => Ok(Self(text.into_bytes())),
            other => serde_json::to_vec(&other)
                .map(Self)
                .map_err(serde::de::Error::custom),
        }
    }
}

fn non_empty(data: Option<Data>) -> Option<Vec<u8>> {
    data.filter(|d| !d.is_empty()).map(Data::into_bytes)
}

/// `verify`: an envelope and the key it must be signed with.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub data: Data,
    pub publickey: PublicKey,
}

/// `validate`: an envelope or document.
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub data: Data,
}

/// `build`.
#[derive(Debug, Deserialize)]
pub struct BuildRequest {
    #[serde(default)]
    pub template: Option<Data>,
    #[serde(default)]
    pub data: Data,
    /// Document type injected when the input has no `$schema`.
    #[serde(rename = "type", default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub envelop: bool,
}

impl BuildRequest {
    pub fn parse_options(self) -> ParseOptions {
        ParseOptions {
            template: non_empty(self.template),
            doc_type: self.doc_type.filter(|t| !t.is_empty()),
            envelop: self.envelop,
            ..ParseOptions::new(self.data.0)
        }
    }
}

/// `sign`. Without a key the server's default key is used.
#[derive(Debug, Deserialize)]
pub struct SignRequest {
    #[serde(default)]
    pub template: Option<Data>,
    #[serde(default)]
    pub data: Data,
    #[serde(default)]
    pub privatekey: Option<PrivateKey>,
    #[serde(rename = "type", default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub envelop: bool,
}

impl SignRequest {
    /// Split into parse options and the optional key.
    pub fn into_parts(self) -> (ParseOptions, Option<PrivateKey>) {
        let opts = ParseOptions {
            template: non_empty(self.template),
            doc_type: self.doc_type.filter(|t| !t.is_empty()),
            envelop: self.envelop,
            ..ParseOptions::new(self.data.0)
        };
        (opts, self.privatekey)
    }
}

/// `correct`: the document, correction options and whether to return the
/// options schema instead.
#[derive(Debug, Deserialize)]
pub struct CorrectRequest {
    #[serde(default)]
    pub data: Data,
    #[serde(default)]
    pub options: Option<Data>,
    #[serde(default)]
    pub schema: bool,
}

impl CorrectRequest {
    pub fn correct_options(self) -> CorrectOptions {
        CorrectOptions {
            parse: ParseOptions::new(self.data.0),
            options_schema: self.schema,
            data: non_empty(self.options),
            ..Default::default()
        }
    }
}

/// `replicate`.
#[derive(Debug, Deserialize)]
pub struct ReplicateRequest {
    #[serde(default)]
    pub data: Data,
}

/// `schema`: a schema path or identity.
#[derive(Debug, Deserialize)]
pub struct SchemaRequest {
    pub path: String,
}

/// `regime`: a country code.
#[derive(Debug, Deserialize)]
pub struct RegimeRequest {
    pub code: String,
}
