//! # Organisation Structures
//!
//! Parties, their contact details, items, notes and references to other
//! documents. Each type has an intrinsic `normalize()` that trims text and
//! drops empty values; jurisdiction-specific rules run afterwards through
//! the rule hooks.

use chrono::NaiveDate;
use docket_core::{Amount, Code, CurrencyCode, Extensions, Key};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::head::Stamp;
use crate::tax::{TaxIdentity, TaxTotal};

pub(crate) fn clean(value: &mut Option<String>) {
    if let Some(s) = value {
        let t = s.trim();
        if t.is_empty() {
            *value = None;
        } else if t.len() != s.len() {
            *s = t.to_string();
        }
    }
}

pub(crate) fn clean_code(value: &mut Option<String>) {
    if let Some(s) = value {
        let c = Code::normalize(s);
        if c.is_empty() {
            *value = None;
        } else {
            *s = c.as_str().to_string();
        }
    }
}

pub(crate) fn trim(value: &mut String) {
    let t = value.trim();
    if t.len() != value.len() {
        *value = t.to_string();
    }
}

/// A business or person taking part in a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Party {
    /// Identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    /// Legal name.
    #[serde(default)]
    pub name: String,
    /// Trading name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Tax identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<TaxIdentity>,
    /// Other identities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identities: Vec<Identity>,
    /// Postal addresses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<Address>,
    /// Email addresses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<Email>,
    /// Telephone numbers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telephones: Vec<Telephone>,
    /// Company registry details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<Registration>,
    /// Extensions.
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

impl Party {
    /// A party with only a name.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn normalize(&mut self) {
        trim(&mut self.name);
        clean(&mut self.alias);
        self.emails.retain(|e| !e.addr.trim().is_empty());
        for e in &mut self.emails {
            trim(&mut e.addr);
        }
        self.ext.normalize();
    }

    /// Identity by key.
    pub fn identity(&self, key: &str) -> Option<&Identity> {
        self.identities
            .iter()
            .find(|i| i.key.as_ref().is_some_and(|k| k == key))
    }
}

/// A non-tax identity code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Semantic key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    /// Issuer-defined type code.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Code>,
    /// The identity value.
    pub code: Code,
    /// Extensions.
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

/// A postal address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    /// PO box.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub po_box: Option<String>,
    /// Building number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num: Option<String>,
    /// Street.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    /// Town or city.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    /// Province or state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// ISO country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Code>,
}

impl Address {
    pub(crate) fn normalize(&mut self) {
        clean(&mut self.po_box);
        clean(&mut self.num);
        clean(&mut self.street);
        clean(&mut self.locality);
        clean(&mut self.region);
        clean_code(&mut self.code);
        if let Some(c) = &self.country {
            let up = Code::normalize_alphanumeric(c.as_str());
            self.country = (!up.is_empty()).then_some(up);
        }
    }
}

/// An email address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    /// Label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// The address.
    pub addr: String,
}

/// A telephone number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telephone {
    /// Label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// The number.
    pub num: String,
}

impl Telephone {
    pub(crate) fn normalize(&mut self) {
        clean(&mut self.label);
        trim(&mut self.num);
    }
}

/// Company registry details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Share capital.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital: Option<Amount>,
    /// Currency of the capital.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
    /// Registry office.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office: Option<String>,
    /// Book.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Option<String>,
    /// Volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    /// Sheet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    /// Section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    /// Entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
}

impl Registration {
    pub(crate) fn normalize(&mut self) {
        for f in [
            &mut self.office,
            &mut self.book,
            &mut self.volume,
            &mut self.sheet,
            &mut self.section,
            &mut self.page,
            &mut self.entry,
        ] {
            clean(f);
        }
    }
}

/// A product or service being sold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Seller's reference.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Semantic key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Unit price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Amount>,
    /// Unit of measure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Extensions.
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

impl Item {
    pub(crate) fn normalize(&mut self) {
        trim(&mut self.name);
        clean(&mut self.reference);
        clean(&mut self.unit);
        self.ext.normalize();
    }
}

/// Free text attached to a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Semantic key (`legal`, `general`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    /// Code from an external list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Origin of the note, usually a tag key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<Key>,
    /// The text.
    #[serde(default)]
    pub text: String,
}

impl Note {
    /// A legal note sourced from a tag.
    pub fn legal(src: &str, text: &str) -> Self {
        Self {
            key: Some(Key::from("legal")),
            code: None,
            src: Some(Key::from(src)),
            text: text.to_string(),
        }
    }

    /// True if the notes are the same by key, source and text.
    pub fn same_as(&self, other: &Note) -> bool {
        self.key == other.key && self.src == other.src && self.text == other.text
    }
}

/// A reference to another document, such as the invoice being corrected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Identifier of the referenced document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    /// Document type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Key>,
    /// Issue date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,
    /// Series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    /// Code.
    #[serde(default)]
    pub code: String,
    /// Why the document is referenced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Stamps from the referenced document's head.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stamps: Vec<Stamp>,
    /// Tax totals of the referenced document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<TaxTotal>,
    /// Extensions.
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

impl DocumentRef {
    pub(crate) fn normalize(&mut self) {
        clean_code(&mut self.series);
        self.code = Code::normalize(&self.code).as_str().to_string();
        clean(&mut self.reason);
        self.ext.normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_drops_blank() {
        let mut v = Some("   ".to_string());
        clean(&mut v);
        assert_eq!(v, None);
        let mut v = Some(" x ".to_string());
        clean(&mut v);
        assert_eq!(v.as_deref(), Some("x"));
    }

    #[test]
    fn address_normalization() {
        let mut a = Address {
            code: Some(" 28 002 ".into()),
            country: Some(Code::from("es")),
            street: Some("".into()),
            ..Default::default()
        };
        a.normalize();
        assert_eq!(a.code.as_deref(), Some("28 002"));
        assert_eq!(a.country, Some(Code::from("ES")));
        assert_eq!(a.street, None);
    }

    #[test]
    fn notes_compare_without_code() {
        let a = Note::legal("reverse-charge", "Reverse charge");
        let mut b = a.clone();
        b.code = Some("X".into());
        assert!(a.same_as(&b));
        b.text = "other".into();
        assert!(!a.same_as(&b));
    }

    #[test]
    fn item_serde_uses_ref() {
        let item: Item = serde_json::from_value(serde_json::json!({
            "ref": "A-1", "name": " Widget ", "price": "10.00"
        }))
        .unwrap();
        assert_eq!(item.reference.as_deref(), Some("A-1"));
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["ref"], "A-1");
        assert_eq!(v["price"], "10.00");
    }

    #[test]
    fn party_identity_lookup() {
        let p = Party {
            identities: vec![Identity {
                key: Some(Key::from("it-fiscal-code")),
                code: Code::from("RSSMRA85T10A562S"),
                ..Default::default()
            }],
            ..Party::named("Mario")
        };
        assert!(p.identity("it-fiscal-code").is_some());
        assert!(p.identity("other").is_none());
    }
}
