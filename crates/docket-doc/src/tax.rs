//! # Tax Structures
//!
//! - [`TaxIdentity`]: a party's tax registration.
//! - [`Combo`]: one tax applied to a line or charge (category, key, rate,
//!   percentage).
//! - [`TaxTotal`]: the calculated totals per category and rate.

use docket_core::{Amount, Code, Extensions, Key, Percentage};
use serde::{Deserialize, Serialize};

use crate::defs::category::{keys, rates};
use crate::defs::is_false;

/// A party's tax registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxIdentity {
    /// ISO country code.
    pub country: Code,
    /// The tax code, without the country prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Code>,
}

impl TaxIdentity {
    /// Build an identity.
    pub fn new(country: &str, code: &str) -> Self {
        Self {
            country: Code::from(country),
            code: Some(Code::from(code)),
        }
    }

    /// Upper-case the country, and reduce the code to upper-case
    /// alphanumerics without a leading country prefix.
    pub(crate) fn normalize(&mut self) {
        self.country = Code::normalize_alphanumeric(self.country.as_str());
        if let Some(code) = &self.code {
            let mut c = Code::normalize_alphanumeric(code.as_str()).as_str().to_string();
            let prefix = self.country.as_str();
            while !prefix.is_empty() && c.len() > prefix.len() && c.starts_with(prefix) {
                c.drain(..prefix.len());
            }
            self.code = (!c.is_empty()).then(|| Code::from(c));
        }
    }
}

/// One tax applied to a line or charge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combo {
    /// Category code.
    pub cat: Code,
    /// Country the tax is levied in, when not the regime's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Code>,
    /// Combo key (`standard`, `exempt`, `reverse-charge`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    /// Rate level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Key>,
    /// Percentage, resolved from the rate when one is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<Percentage>,
    /// Surcharge percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surcharge: Option<Percentage>,
    /// Extensions.
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

impl Combo {
    /// A combo for `cat` at `percent`.
    pub fn with_percent(cat: &str, percent: Percentage) -> Self {
        Self {
            cat: Code::from(cat),
            percent: Some(percent),
            ..Default::default()
        }
    }

    /// A combo for `cat` at rate level `rate`.
    pub fn with_rate(cat: &str, rate: &str) -> Self {
        Self {
            cat: Code::from(cat),
            rate: Some(Key::from(rate)),
            ..Default::default()
        }
    }

    /// Upper-case the category and move legacy rate keys that were really
    /// combo keys (`zero`, `exempt`, `standard`) into `key`.
    pub(crate) fn normalize(&mut self) {
        self.cat = Code::normalize_alphanumeric(self.cat.as_str());
        if let Some(rate) = self.rate.clone() {
            match rate.as_str() {
                keys::ZERO | keys::EXEMPT => {
                    self.key.get_or_insert(rate);
                    self.rate = None;
                }
                keys::STANDARD => {
                    self.key.get_or_insert(rate);
                    self.rate = Some(Key::from(rates::GENERAL));
                }
                _ => {}
            }
        }
        self.ext.normalize();
    }
}

/// Totals for one rate within a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTotal {
    /// Combo key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    /// Extensions shared by the combos in this total.
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
    /// Taxable base.
    pub base: Amount,
    /// Percentage, absent for exempt totals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<Percentage>,
    /// Surcharge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surcharge: Option<RateTotalSurcharge>,
    /// Tax amount.
    pub amount: Amount,
}

/// Surcharge part of a rate total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTotalSurcharge {
    /// Surcharge percentage.
    pub percent: Percentage,
    /// Surcharge amount.
    pub amount: Amount,
}

/// Totals for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// Category code.
    pub code: Code,
    /// Withheld rather than added.
    #[serde(default, skip_serializing_if = "is_false")]
    pub retained: bool,
    /// Per-rate totals.
    pub rates: Vec<RateTotal>,
    /// Sum of rate amounts.
    pub amount: Amount,
    /// Sum of surcharges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surcharge: Option<Amount>,
}

/// Tax totals of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxTotal {
    /// Per-category totals.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategoryTotal>,
    /// Sum of non-retained categories.
    pub sum: Amount,
    /// Sum of retained categories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retained: Option<Amount>,
}

impl TaxTotal {
    /// Category total by code.
    pub fn category(&self, code: &str) -> Option<&CategoryTotal> {
        self.categories.iter().find(|c| c.code == code)
    }
}
