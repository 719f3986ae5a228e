//! # Structured Signatures
//!
//! A [`SignedPayload`] is what an envelope stores in its `sigs` list: the
//! signed value itself, the key id and algorithm, and the Ed25519 signature
//! over the canonical form of `{alg, kid, payload}`. Binding the key id
//! into the signed bytes means a signature cannot be relabelled with a
//! different `kid`.

use docket_core::{CanonicalBytes, CryptoError, DocketError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ed25519::{PrivateKey, PublicKey, Signature};

/// Algorithm label recorded on every signature.
pub const ALGORITHM: &str = "EdDSA";

/// A value signed by one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedPayload {
    /// Id of the signing key.
    pub kid: Uuid,
    /// Signature algorithm.
    pub alg: String,
    /// The signed value.
    pub payload: serde_json::Value,
    /// Signature over the canonical protected form.
    pub sig: Signature,
}

#[derive(Serialize)]
struct Protected<'a> {
    alg: &'a str,
    kid: Uuid,
    payload: &'a serde_json::Value,
}

impl SignedPayload {
    /// Sign `payload` with `key`.
    pub fn sign<T: Serialize>(key: &PrivateKey, payload: &T) -> Result<Self, DocketError> {
        let payload = serde_json::to_value(payload)
            .map_err(|e| DocketError::Signature(format!("payload: {e}")))?;
        let bytes = CanonicalBytes::new(&Protected {
            alg: ALGORITHM,
            kid: key.kid(),
            payload: &payload,
        })?;
        Ok(Self {
            kid: key.kid(),
            alg: ALGORITHM.to_string(),
            sig: key.sign(&bytes),
            payload,
        })
    }

    /// Verify against `key`.
    ///
    /// # Errors
    ///
    /// `VerificationFailed` when the key id differs or the signature does
    /// not match; `MalformedSignature` for an unknown algorithm.
    pub fn verify(&self, key: &PublicKey) -> Result<(), CryptoError> {
        if self.alg != ALGORITHM {
            return Err(CryptoError::MalformedSignature(format!(
                "unsupported algorithm '{}'",
                self.alg
            )));
        }
        if self.kid != key.kid() {
            return Err(CryptoError::VerificationFailed(
                "no key match found".to_string(),
            ));
        }
        let bytes = CanonicalBytes::new(&Protected {
            alg: &self.alg,
            kid: self.kid,
            payload: &self.payload,
        })
        .map_err(|e| CryptoError::MalformedSignature(e.to_string()))?;
        key.verify(&bytes, &self.sig)
    }

    /// Decode the signed value.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, CryptoError> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| CryptoError::MalformedSignature(format!("payload: {e}")))
    }
}
