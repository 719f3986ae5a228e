//! # Correction Definitions
//!
//! What a regime or addon demands of a corrective document: which
//! document types may correct, which extensions must be supplied, whether
//! a reason is mandatory and which head stamps of the original must be
//! cited in the preceding reference.

use docket_core::Key;
use serde::{Deserialize, Serialize};

use super::is_false;

/// Correction rules for one document schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionDefinition {
    /// Schema short name the rules apply to.
    pub schema: String,
    /// Document types a correction may take.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<Key>,
    /// Extension keys the correction must supply.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<Key>,
    /// A correction reason is mandatory.
    #[serde(default, skip_serializing_if = "is_false")]
    pub reason_required: bool,
    /// Head stamp providers the preceding reference must cite.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stamps: Vec<Key>,
    /// Copy tax details from the original into the preceding reference.
    #[serde(default, skip_serializing_if = "is_false")]
    pub copy_tax: bool,
}

impl CorrectionDefinition {
    /// Empty rules for `schema`.
    pub fn new(schema: &str) -> Self {
        Self {
            schema: schema.to_string(),
            ..Default::default()
        }
    }

    /// Union another definition into this one.
    pub fn merge(&mut self, other: &CorrectionDefinition) {
        union(&mut self.types, &other.types);
        union(&mut self.extensions, &other.extensions);
        union(&mut self.stamps, &other.stamps);
        self.reason_required |= other.reason_required;
        self.copy_tax |= other.copy_tax;
    }

    /// True if the definition adds nothing beyond its schema.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.extensions.is_empty()
            && self.stamps.is_empty()
            && !self.reason_required
            && !self.copy_tax
    }
}

fn union(into: &mut Vec<Key>, from: &[Key]) {
    for k in from {
        if !k.is_in(into) {
            into.push(k.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_unions_lists_and_flags() {
        let mut a = CorrectionDefinition {
            types: vec![Key::from("credit-note")],
            ..CorrectionDefinition::new("bill/invoice")
        };
        let b = CorrectionDefinition {
            types: vec![Key::from("credit-note"), Key::from("corrective")],
            extensions: vec![Key::from("es-facturae-correction")],
            reason_required: true,
            ..CorrectionDefinition::new("bill/invoice")
        };
        a.merge(&b);
        assert_eq!(a.types.len(), 2);
        assert_eq!(a.extensions.len(), 1);
        assert!(a.reason_required);
        assert!(!a.copy_tax);
    }

    #[test]
    fn empty_detection() {
        assert!(CorrectionDefinition::new("bill/invoice").is_empty());
    }
}
