//! # docket-core — Foundational Types
//!
//! The leaf of the docket crate graph. Everything that two or more layers
//! need to agree on lives here: how a document is turned into bytes for
//! hashing and signing, how errors are classified, how field-level
//! validation failures are represented, and how money is counted.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** All digest and signature input flows
//!    through `CanonicalBytes::new()`. There is no other way to hash a
//!    document.
//!
//! 2. **One error taxonomy.** [`DocketError`] carries a stable numeric
//!    `code` and string `key` for every failure the pipeline can surface,
//!    so the CLI, the bulk engine and the HTTP adapter render the same
//!    failure the same way.
//!
//! 3. **Field errors are data.** [`FieldErrors`] is a recursive map that
//!    serializes to and from JSON, and composes by key-prefixing.
//!
//! 4. **No binary floats for money.** [`Amount`] and [`Percentage`] wrap
//!    `rust_decimal::Decimal` (integer mantissa plus scale) and serialize
//!    as strings.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `docket-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod currency;
pub mod digest;
pub mod error;
pub mod ext;
pub mod fields;
pub mod hex;
pub mod key;
pub mod num;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use currency::CurrencyCode;
pub use digest::{sha256_digest, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, CryptoError, DocketError};
pub use ext::Extensions;
pub use fields::FieldErrors;
pub use key::{Code, Key};
pub use num::{Amount, ArithmeticError, Percentage};

/// Generate a time-ordered identifier for a new document.
pub fn new_document_uuid() -> uuid::Uuid {
    uuid::Uuid::now_v7()
}
