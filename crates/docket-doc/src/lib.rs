//! # docket-doc — Documents and Rules
//!
//! The document model and everything that acts on it:
//!
//! - **Model** (`bill`, `note`, `org`, `tax`, `pay`, `head`, `envelope`,
//!   `document`): invoices, messages and their substructures, the envelope
//!   header and the envelope itself.
//!
//! - **Rule definitions** (`defs`): regimes and addons as data, plus the
//!   [`RuleHooks`] trait for behaviour the data cannot express.
//!
//! - **Registry** (`registry`): regimes by country code and addons by key,
//!   resolved per document into a [`RuleContext`].
//!
//! - **Pipeline** (`normalize`, `scenarios`, `validate`, `calculator`):
//!   the normalizer and validator dispatch, the scenario engine and the
//!   fixed calculate sequence that ties them together.
//!
//! ## Crate Policy
//!
//! - Depends only on `docket-core` and `docket-crypto` internally.
//! - Concrete regimes and addons live in `docket-regimes`; nothing here
//!   names a country.

pub mod bill;
pub mod calculator;
pub mod defs;
pub mod document;
pub mod envelope;
pub mod head;
pub mod hooks;
pub mod normalize;
pub mod note;
pub mod org;
pub mod pay;
pub mod registry;
pub mod scenarios;
pub mod schema;
pub mod tax;
pub mod validate;

pub use bill::{CorrectionOptions, Invoice};
pub use document::Document;
pub use envelope::Envelope;
pub use head::{Header, Stamp};
pub use hooks::{Node, NodeRef, RuleHooks};
pub use note::Message;
pub use registry::{Registry, RegistryError, RuleContext};
