//! # Ed25519 Signing and Verification
//!
//! Key generation, signing and verification over canonical bytes.
//!
//! ## Security Invariant
//!
//! - Signing input MUST be `&CanonicalBytes`; raw byte slices cannot be
//!   signed.
//! - [`PrivateKey`] does not implement `Serialize`. Exporting it to a key
//!   file is an explicit call to [`PrivateKey::to_file`].
//!
//! ## Key Files
//!
//! Keys travel as small JSON objects in the style of a JSON Web Key:
//!
//! ```json
//! {"kid": "…uuid…", "kty": "OKP", "crv": "Ed25519", "x": "<hex public>", "d": "<hex seed>"}
//! ```
//!
//! The public form omits `d`.

use docket_core::{hex, CanonicalBytes, CryptoError};
use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;
use zeroize::Zeroize;

const KTY: &str = "OKP";
const CRV: &str = "Ed25519";

/// An Ed25519 signature (64 bytes), hex encoded on the wire.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 64]);

/// A verification key with its key id.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    kid: Uuid,
    key: [u8; 32],
}

/// A signing key with its key id.
pub struct PrivateKey {
    kid: Uuid,
    signing_key: ed25519_dalek::SigningKey,
}

/// Serializable export of a private key. The secret is wiped on drop.
#[derive(Serialize, Deserialize)]
pub struct PrivateKeyFile {
    /// Key identifier shared by both halves.
    pub kid: Uuid,
    /// Key type, always `OKP`.
    pub kty: String,
    /// Curve, always `Ed25519`.
    pub crv: String,
    /// Hex public key.
    pub x: String,
    /// Hex 32-byte seed.
    pub d: String,
}

#[derive(Serialize, Deserialize)]
struct PublicKeyFile {
    kid: Uuid,
    kty: String,
    crv: String,
    x: String,
}

// ---------------------------------------------------------------------------
// Signature impls
// ---------------------------------------------------------------------------

impl Signature {
    /// Render as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse a 128-character hex string.
    pub fn from_hex(text: &str) -> Result<Self, CryptoError> {
        hex::decode_array::<64>(text)
            .map(Self)
            .map_err(CryptoError::MalformedSignature)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.0[..4]))
    }
}

// ---------------------------------------------------------------------------
// PublicKey impls
// ---------------------------------------------------------------------------

impl PublicKey {
    /// Key identifier.
    pub fn kid(&self) -> Uuid {
        self.kid
    }

    /// Raw 32-byte key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// Verify `signature` over `data`.
    ///
    /// # Errors
    ///
    /// `CryptoError::KeyError` if the stored bytes are not a curve point,
    /// `CryptoError::VerificationFailed` if the signature does not match.
    pub fn verify(&self, data: &CanonicalBytes, signature: &Signature) -> Result<(), CryptoError> {
        let vk = ed25519_dalek::VerifyingKey::from_bytes(&self.key)
            .map_err(|e| CryptoError::KeyError(format!("invalid public key: {e}")))?;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        vk.verify(data.as_bytes(), &sig)
            .map_err(|e| CryptoError::VerificationFailed(format!("Ed25519 verification failed: {e}")))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PublicKeyFile {
            kid: self.kid,
            kty: KTY.to_string(),
            crv: CRV.to_string(),
            x: hex::encode(&self.key),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let file = PublicKeyFile::deserialize(deserializer)?;
        check_kind(&file.kty, &file.crv).map_err(serde::de::Error::custom)?;
        let key = hex::decode_array::<32>(&file.x)
            .map_err(|e| serde::de::Error::custom(format!("public key: {e}")))?;
        Ok(Self { kid: file.kid, key })
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({}, {}...)", self.kid, hex::encode(&self.key[..4]))
    }
}

// ---------------------------------------------------------------------------
// PrivateKey impls
// ---------------------------------------------------------------------------

impl PrivateKey {
    /// Generate a new random key with a fresh key id.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            kid: Uuid::new_v4(),
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Build a key from a 32-byte seed.
    pub fn from_seed(kid: Uuid, seed: &[u8; 32]) -> Self {
        Self {
            kid,
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Key identifier.
    pub fn kid(&self) -> Uuid {
        self.kid
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            kid: self.kid,
            key: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Sign canonical bytes.
    pub fn sign(&self, data: &CanonicalBytes) -> Signature {
        Signature(self.signing_key.sign(data.as_bytes()).to_bytes())
    }

    /// Export to the key-file form, including the secret seed.
    pub fn to_file(&self) -> PrivateKeyFile {
        PrivateKeyFile {
            kid: self.kid,
            kty: KTY.to_string(),
            crv: CRV.to_string(),
            x: hex::encode(&self.signing_key.verifying_key().to_bytes()),
            d: hex::encode(&self.signing_key.to_bytes()),
        }
    }

    /// Rebuild from a key file. The public half, when present, must match.
    pub fn from_file(file: &PrivateKeyFile) -> Result<Self, CryptoError> {
        check_kind(&file.kty, &file.crv)?;
        let mut seed = hex::decode_array::<32>(&file.d)
            .map_err(|e| CryptoError::KeyError(format!("private key: {e}")))?;
        let key = Self::from_seed(file.kid, &seed);
        seed.zeroize();
        if !file.x.is_empty() && file.x.to_lowercase() != hex::encode(key.public_key().as_bytes()) {
            return Err(CryptoError::KeyError(
                "public component does not match private key".to_string(),
            ));
        }
        Ok(key)
    }
}

impl<'de> Deserialize<'de> for PrivateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let file = PrivateKeyFile::deserialize(deserializer)?;
        Self::from_file(&file).map_err(serde::de::Error::custom)
    }
}

impl Clone for PrivateKey {
    fn clone(&self) -> Self {
        Self {
            kid: self.kid,
            signing_key: self.signing_key.clone(),
        }
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey({}, <private>)", self.kid)
    }
}

impl Drop for PrivateKeyFile {
    fn drop(&mut self) {
        self.d.zeroize();
    }
}

fn check_kind(kty: &str, crv: &str) -> Result<(), CryptoError> {
    if kty != KTY || crv != CRV {
        return Err(CryptoError::KeyError(format!(
            "unsupported key type {kty}/{crv}, expected {KTY}/{CRV}"
        )));
    }
    Ok(())
}
