//! # docket-crypto — Digital-Signature Collaborator
//!
//! The pipeline never touches curve arithmetic directly. It asks this crate
//! for three things:
//!
//! - `newKey()`: [`PrivateKey::generate`] and [`KeyPair`] for key files.
//! - `sign(privateKey, payload)`: [`SignedPayload::sign`].
//! - `verify(publicKey, payload, signature)`: [`SignedPayload::verify`].
//!
//! ## Crate Policy
//!
//! - Depends only on `docket-core` internally.
//! - No mocking of cryptographic operations in tests; all tests use real
//!   `CanonicalBytes` and real Ed25519.

pub mod ed25519;
pub mod signature;

use serde::Serialize;

pub use ed25519::{PrivateKey, PrivateKeyFile, PublicKey, Signature};
pub use signature::SignedPayload;

/// A freshly generated key pair in exportable form, as returned by `keygen`.
#[derive(Serialize)]
pub struct KeyPair {
    /// The private key file.
    pub private: PrivateKeyFile,
    /// The public key.
    pub public: PublicKey,
}

impl KeyPair {
    /// Generate a new key pair.
    pub fn generate() -> Self {
        let key = PrivateKey::generate();
        Self {
            private: key.to_file(),
            public: key.public_key(),
        }
    }
}
