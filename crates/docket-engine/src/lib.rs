//! # docket-engine — Document Pipeline
//!
//! The operations every surface (CLI, HTTP, bulk) shares:
//!
//! - **Parse** (`parse`): layers a template, the input and `--set` style
//!   values into one object, injects a document type and decides between
//!   a bare document and an envelope.
//!
//! - **Operations** (`ops`): build, sign, verify, validate, correct,
//!   replicate and keygen over parsed input.
//!
//! - **Content** (`content`): embedded JSON Schemas and regime definitions.
//!
//! - **Payloads** (`payload`): request bodies shared by the bulk engine
//!   and the HTTP server.
//!
//! - **Bulk** (`bulk`): a stream of JSON requests processed concurrently,
//!   answered in completion order with sequence numbers.
//!
//! ## Crate Policy
//!
//! - The only file access is reading `set_file` values; input files,
//!   sockets and stdin belong to `docket-cli` and `docket-api`.
//! - Every failure is a [`DocketError`].

pub mod bulk;
pub mod content;
pub mod ops;
pub mod parse;
pub mod payload;

pub use bulk::{Bulk, BulkRequest, BulkResponse};
pub use docket_core::DocketError;
pub use ops::{CorrectOptions, Corrected};
pub use parse::{parse, ParseOptions, Parsed};
