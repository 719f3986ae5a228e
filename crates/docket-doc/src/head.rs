//! # Envelope Header
//!
//! The head travels with a document inside an envelope. It records the
//! envelope's identifier, the digest of the document, stamps issued by
//! external authorities, and whether the envelope is still a draft.
//!
//! Signatures cover the head, not the document: the digest binds the two.

use std::collections::BTreeMap;

use docket_core::{ContentDigest, Key};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defs::is_false;

/// A provider-issued token recording an authority's acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    /// Provider key.
    pub prv: Key,
    /// Token value.
    pub val: String,
}

impl Stamp {
    /// Build a stamp.
    pub fn new(prv: &str, val: &str) -> Self {
        Self {
            prv: Key::from(prv),
            val: val.to_string(),
        }
    }
}

/// Envelope metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Envelope identifier.
    pub uuid: Uuid,
    /// Digest of the canonical document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dig: Option<ContentDigest>,
    /// Authority stamps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stamps: Vec<Stamp>,
    /// Free labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Free metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
    /// Free notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// The envelope may still change; it cannot be signed.
    #[serde(default, skip_serializing_if = "is_false")]
    pub draft: bool,
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

impl Header {
    /// A fresh draft header.
    pub fn new() -> Self {
        Self {
            uuid: docket_core::new_document_uuid(),
            dig: None,
            stamps: Vec::new(),
            tags: Vec::new(),
            meta: BTreeMap::new(),
            notes: None,
            draft: true,
        }
    }

    /// Stamp by provider.
    pub fn stamp(&self, prv: &str) -> Option<&Stamp> {
        self.stamps.iter().find(|s| s.prv == prv)
    }

    /// Add a stamp, replacing any existing one from the same provider.
    pub fn add_stamp(&mut self, stamp: Stamp) {
        match self.stamps.iter_mut().find(|s| s.prv == stamp.prv) {
            Some(existing) => *existing = stamp,
            None => self.stamps.push(stamp),
        }
    }

    /// True if everything `other` asserts is also asserted here: same
    /// identifier and digest, and every stamp, tag and meta entry present.
    ///
    /// Stamps, tags and meta may have been added since `other` was signed.
    pub fn contains(&self, other: &Header) -> bool {
        if self.uuid != other.uuid {
            return false;
        }
        if other.dig.is_some() && self.dig != other.dig {
            return false;
        }
        if !other.stamps.iter().all(|s| self.stamps.contains(s)) {
            return false;
        }
        if !other.tags.iter().all(|t| self.tags.contains(t)) {
            return false;
        }
        other
            .meta
            .iter()
            .all(|(k, v)| self.meta.get(k) == Some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_header_is_draft() {
        let h = Header::new();
        assert!(h.draft);
        assert!(h.dig.is_none());
        let v = serde_json::to_value(&h).unwrap();
        assert_eq!(v["draft"], true);
        assert!(v.get("stamps").is_none());
    }

    #[test]
    fn contains_allows_additions() {
        let mut signed = Header::new();
        signed.draft = false;
        signed.add_stamp(Stamp::new("verifactu-qr", "abc"));
        let mut current = signed.clone();
        current.add_stamp(Stamp::new("sdi-id", "123"));
        current.tags.push("archived".into());
        current.meta.insert("source".into(), "api".into());
        assert!(current.contains(&signed));
        assert!(!signed.contains(&current));
    }

    #[test]
    fn contains_rejects_changed_uuid_or_stamp() {
        let signed = Header::new();
        let other = Header::new();
        assert!(!other.contains(&signed));

        let mut signed = Header::new();
        signed.add_stamp(Stamp::new("p", "1"));
        let mut current = signed.clone();
        current.add_stamp(Stamp::new("p", "2"));
        assert!(!current.contains(&signed));
    }

    #[test]
    fn add_stamp_replaces_same_provider() {
        let mut h = Header::new();
        h.add_stamp(Stamp::new("p", "1"));
        h.add_stamp(Stamp::new("p", "2"));
        assert_eq!(h.stamps.len(), 1);
        assert_eq!(h.stamp("p").map(|s| s.val.as_str()), Some("2"));
    }
}
