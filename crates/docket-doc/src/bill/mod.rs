//! # Invoices
//!
//! The `bill/invoice` document: parties, lines, charges, payment terms and
//! the totals the calculator derives from them.
//!
//! ## Capabilities
//!
//! An invoice names its regime (`$regime`, or the supplier's tax country),
//! the addons it opts into (`$addons`) and its tags (`$tags`). It can be
//! calculated ([`calculate`]), corrected ([`correct`]) and replicated.

pub mod calculate;
pub mod correct;

use std::sync::OnceLock;

use chrono::NaiveDate;
use docket_core::{Amount, Code, CurrencyCode, Extensions, Key, Percentage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defs::{KeyDefinition, RoundingRule, TagSet};
use crate::org::{clean, clean_code, trim, DocumentRef, Item, Note, Party};
use crate::pay;
use crate::schema;
use crate::tax::{Combo, TaxTotal};

pub use correct::CorrectionOptions;

/// Invoice type keys.
pub mod types {
    /// A regular commercial invoice.
    pub const STANDARD: &str = "standard";
    /// A quote or advance request; lines are optional.
    pub const PROFORMA: &str = "proforma";
    /// Replaces a previous invoice.
    pub const CORRECTIVE: &str = "corrective";
    /// Reduces what a previous invoice claimed.
    pub const CREDIT_NOTE: &str = "credit-note";
    /// Increases what a previous invoice claimed.
    pub const DEBIT_NOTE: &str = "debit-note";
    /// Anything else.
    pub const OTHER: &str = "other";

    /// Every accepted type.
    pub const ALL: &[&str] = &[STANDARD, PROFORMA, CORRECTIVE, CREDIT_NOTE, DEBIT_NOTE, OTHER];

    /// Types that must cite a preceding document.
    pub const CORRECTIONS: &[&str] = &[CORRECTIVE, CREDIT_NOTE, DEBIT_NOTE];
}

/// Tags every invoice may carry, whatever its regime.
pub fn default_tags() -> &'static TagSet {
    static TAGS: OnceLock<TagSet> = OnceLock::new();
    TAGS.get_or_init(|| TagSet {
        schema: schema::SHORT_INVOICE.to_string(),
        list: vec![
            KeyDefinition::new("simplified", "Simplified Invoice")
                .with_desc("Used for B2C transactions when the customer details are not available."),
            KeyDefinition::new("reverse-charge", "Reverse Charge")
                .with_desc("Reverse Charge Mechanism applies."),
            KeyDefinition::new("self-billed", "Self-billed")
                .with_desc("Invoice issued by the customer on behalf of the supplier."),
            KeyDefinition::new("customer-rates", "Customer rates")
                .with_desc("Tax rates of the customer's country apply."),
            KeyDefinition::new("partial", "Partial")
                .with_desc("Covers only part of a larger transaction."),
            KeyDefinition::new("bypass", "Bypass")
                .with_desc("Do not report to the tax authority."),
        ],
    })
}

fn standard_type() -> Key {
    Key::from(types::STANDARD)
}

/// Tax options that apply to the whole invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTax {
    /// Category whose tax is already included in line prices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prices_include: Option<Code>,
    /// Overrides the regime's rounding rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounding: Option<RoundingRule>,
    /// Document-level extensions.
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

impl InvoiceTax {
    fn is_empty(&self) -> bool {
        self.prices_include.is_none() && self.rounding.is_none() && self.ext.is_empty()
    }
}

/// One invoice line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// 1-based position, set by the calculator.
    #[serde(default)]
    pub i: usize,
    /// Quantity of the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Amount>,
    /// What is being sold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
    /// `quantity × price`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<Amount>,
    /// Taxes applied to the line.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taxes: Vec<Combo>,
    /// Line total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Amount>,
    /// Notes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

impl Line {
    pub(crate) fn normalize(&mut self) {
        for note in &mut self.notes {
            trim(&mut note.text);
        }
    }
}

/// A document-level charge, such as a delivery fee.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    /// 1-based position, set by the calculator.
    #[serde(default)]
    pub i: usize,
    /// Semantic key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    /// Why the charge applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Base the percentage applies to; the line sum when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<Amount>,
    /// Percentage of the base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<Percentage>,
    /// Charge amount.
    #[serde(default)]
    pub amount: Amount,
    /// Taxes applied to the charge.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taxes: Vec<Combo>,
    /// Extensions.
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

impl Charge {
    pub(crate) fn normalize(&mut self) {
        clean(&mut self.reason);
        self.ext.normalize();
    }
}

/// Payment terms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// How to pay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<pay::Instructions>,
    /// Payments already made.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advances: Vec<pay::Advance>,
}

/// Calculated figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of line totals.
    pub sum: Amount,
    /// Sum of charges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge: Option<Amount>,
    /// Tax already included in prices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_included: Option<Amount>,
    /// Total before tax.
    pub total: Amount,
    /// Per-category breakdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxes: Option<TaxTotal>,
    /// Tax added to the total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<Amount>,
    /// Total including tax.
    pub total_with_tax: Amount,
    /// Tax withheld by the customer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retained_tax: Option<Amount>,
    /// Amount the customer owes.
    pub payable: Amount,
    /// Sum of advances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advance: Option<Amount>,
    /// Payable minus advances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<Amount>,
}

/// A `bill/invoice` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Schema identity.
    #[serde(rename = "$schema", default = "invoice_schema")]
    pub schema: String,
    /// Regime country code; the supplier's tax country when absent.
    #[serde(rename = "$regime", default, skip_serializing_if = "Option::is_none")]
    pub regime: Option<Code>,
    /// Addons the invoice opts into, in order.
    #[serde(rename = "$addons", default, skip_serializing_if = "Vec::is_empty")]
    pub addons: Vec<Key>,
    /// Tags.
    #[serde(rename = "$tags", default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Key>,
    /// Identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    /// Invoice type.
    #[serde(rename = "type", default = "standard_type")]
    pub kind: Key,
    /// Series the code belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    /// Sequential code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Date of issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,
    /// Currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
    /// Invoice-wide tax options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<InvoiceTax>,
    /// Documents this one corrects or refers to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preceding: Vec<DocumentRef>,
    /// Seller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<Party>,
    /// Buyer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Party>,
    /// Lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<Line>,
    /// Charges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub charges: Vec<Charge>,
    /// Payment terms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentDetails>,
    /// Calculated totals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totals: Option<Totals>,
    /// Notes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

fn invoice_schema() -> String {
    schema::INVOICE.to_string()
}

impl Default for Invoice {
    fn default() -> Self {
        Self {
            schema: invoice_schema(),
            regime: None,
            addons: Vec::new(),
            tags: Vec::new(),
            uuid: None,
            kind: standard_type(),
            series: None,
            code: None,
            issue_date: None,
            currency: None,
            tax: None,
            preceding: Vec::new(),
            supplier: None,
            customer: None,
            lines: Vec::new(),
            charges: Vec::new(),
            payment: None,
            totals: None,
            notes: Vec::new(),
        }
    }
}

impl Invoice {
    /// The regime country: `$regime`, else the supplier's tax country.
    pub fn regime_code(&self) -> Option<&str> {
        if let Some(r) = self.regime.as_ref().filter(|r| !r.is_empty()) {
            return Some(r.as_str());
        }
        self.supplier
            .as_ref()
            .and_then(|s| s.tax_id.as_ref())
            .map(|t| t.country.as_str())
            .filter(|c| !c.is_empty())
    }

    /// True if every tag in `tags` is set.
    pub fn has_tags(&self, tags: &[&str]) -> bool {
        tags.iter().all(|t| self.tags.iter().any(|k| k == t))
    }

    /// Document-level extensions, if any.
    pub fn ext(&self) -> Option<&Extensions> {
        self.tax.as_ref().map(|t| &t.ext)
    }

    /// Document-level extensions, created on demand.
    pub fn ext_mut(&mut self) -> &mut Extensions {
        &mut self.tax.get_or_insert_with(InvoiceTax::default).ext
    }

    /// True for credit notes, debit notes and corrective invoices.
    pub fn is_correction(&self) -> bool {
        types::CORRECTIONS.iter().any(|t| self.kind == *t)
    }

    /// Adjust the invoice's own fields; substructures are handled by the
    /// dispatcher.
    pub(crate) fn normalize(&mut self) {
        if self.kind.is_empty() {
            self.kind = standard_type();
        }
        self.schema = invoice_schema();
        if let Some(r) = &self.regime {
            let r = Code::normalize_alphanumeric(r.as_str());
            self.regime = (!r.is_empty()).then_some(r);
        }
        dedup_keys(&mut self.addons);
        dedup_keys(&mut self.tags);
        clean_code(&mut self.series);
        clean_code(&mut self.code);
        if let Some(c) = &self.currency {
            let c = CurrencyCode::new(c.as_str());
            self.currency = (!c.is_empty()).then_some(c);
        }
        if let Some(tax) = &mut self.tax {
            tax.ext.normalize();
            if let Some(p) = &tax.prices_include {
                let p = Code::normalize_alphanumeric(p.as_str());
                tax.prices_include = (!p.is_empty()).then_some(p);
            }
            if tax.is_empty() {
                self.tax = None;
            }
        }
        for note in &mut self.notes {
            clean(&mut note.code);
            trim(&mut note.text);
        }
    }

    /// A copy suitable for issuing again: identifiers, dates, codes and
    /// totals are cleared.
    pub fn replicate(&self) -> Self {
        let mut inv = self.clone();
        inv.uuid = None;
        inv.code = None;
        inv.issue_date = None;
        inv.totals = None;
        if let Some(p) = &mut inv.payment {
            p.advances.clear();
        }
        for line in &mut inv.lines {
            line.i = 0;
            line.sum = None;
            line.total = None;
        }
        inv
    }
}

fn dedup_keys(keys: &mut Vec<Key>) {
    let mut seen: Vec<Key> = Vec::with_capacity(keys.len());
    keys.retain(|k| {
        if k.is_empty() || seen.contains(k) {
            false
        } else {
            seen.push(k.clone());
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::TaxIdentity;

    #[test]
    fn defaults_on_parse() {
        let inv: Invoice = serde_json::from_value(serde_json::json!({
            "supplier": {"name": "Provide One S.L.", "tax_id": {"country": "ES", "code": "B98602642"}}
        }))
        .unwrap();
        assert_eq!(inv.schema, schema::INVOICE);
        assert_eq!(inv.kind, "standard");
        assert_eq!(inv.regime_code(), Some("ES"));
    }

    #[test]
    fn explicit_regime_wins() {
        let inv = Invoice {
            regime: Some(Code::from("IT")),
            supplier: Some(Party {
                tax_id: Some(TaxIdentity::new("ES", "B98602642")),
                ..Party::named("x")
            }),
            ..Default::default()
        };
        assert_eq!(inv.regime_code(), Some("IT"));
    }

    #[test]
    fn normalize_cleans_header_fields() {
        let mut inv = Invoice {
            kind: Key::from(""),
            series: Some(" SAMPLE ".into()),
            code: Some("  ".into()),
            currency: Some(CurrencyCode::new("eur")),
            tags: vec![Key::from("simplified"), Key::from("simplified")],
            tax: Some(InvoiceTax::default()),
            ..Default::default()
        };
        inv.normalize();
        assert_eq!(inv.kind, "standard");
        assert_eq!(inv.series.as_deref(), Some("SAMPLE"));
        assert_eq!(inv.code, None);
        assert_eq!(inv.currency.as_ref().map(|c| c.as_str()), Some("EUR"));
        assert_eq!(inv.tags.len(), 1);
        assert!(inv.tax.is_none());
    }

    #[test]
    fn has_tags_requires_all() {
        let inv = Invoice {
            tags: vec![Key::from("simplified"), Key::from("reverse-charge")],
            ..Default::default()
        };
        assert!(inv.has_tags(&["simplified"]));
        assert!(inv.has_tags(&["simplified", "reverse-charge"]));
        assert!(!inv.has_tags(&["self-billed"]));
    }

    #[test]
    fn replicate_clears_identity() {
        let inv = Invoice {
            uuid: Some(Uuid::nil()),
            code: Some("123".into()),
            issue_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            totals: Some(Totals::default()),
            ..Default::default()
        };
        let copy = inv.replicate();
        assert!(copy.uuid.is_none());
        assert!(copy.code.is_none());
        assert!(copy.issue_date.is_none());
        assert!(copy.totals.is_none());
    }
}
