//! # Schema Identities
//!
//! Every document and envelope carries a `$schema` URL naming its shape.
//! The pipeline only needs the short name (`bill/invoice`) for scenario and
//! correction lookups, and the full identity to decide how to decode a
//! value.

/// Common prefix of every schema identity.
pub const BASE: &str = "https://gobl.org/draft-0/";

/// Envelope schema identity.
pub const ENVELOPE: &str = "https://gobl.org/draft-0/envelope";
/// Invoice schema identity.
pub const INVOICE: &str = "https://gobl.org/draft-0/bill/invoice";
/// Message schema identity.
pub const MESSAGE: &str = "https://gobl.org/draft-0/note/message";
/// Envelope header schema identity.
pub const HEADER: &str = "https://gobl.org/draft-0/head/header";
/// Header stamp schema identity.
pub const STAMP: &str = "https://gobl.org/draft-0/head/stamp";
/// Invoice correction options schema identity.
pub const CORRECTION_OPTIONS: &str = "https://gobl.org/draft-0/bill/correction-options";

/// Short name of the invoice schema.
pub const SHORT_INVOICE: &str = "bill/invoice";
/// Short name of the message schema.
pub const SHORT_MESSAGE: &str = "note/message";

/// Schemas that may appear as an envelope's document.
pub const DOCUMENTS: &[&str] = &[INVOICE, MESSAGE];

/// Every registered schema identity, sorted.
pub fn registered() -> Vec<&'static str> {
    let mut list = vec![
        CORRECTION_OPTIONS,
        ENVELOPE,
        HEADER,
        INVOICE,
        MESSAGE,
        STAMP,
    ];
    list.sort_unstable();
    list
}

/// Strip the common prefix: `https://gobl.org/draft-0/bill/invoice` →
/// `bill/invoice`.
pub fn short_name(id: &str) -> Option<&str> {
    id.strip_prefix(BASE).filter(|s| !s.is_empty())
}

/// Full identity of a document schema given its short name.
pub fn document_for(short: &str) -> Option<&'static str> {
    let short = short.trim_matches('/');
    DOCUMENTS
        .iter()
        .copied()
        .find(|id| short_name(id) == Some(short))
}

/// True if `id` names a document schema.
pub fn is_document(id: &str) -> bool {
    DOCUMENTS.contains(&id)
}
