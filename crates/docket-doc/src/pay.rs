//! Payment instructions and advances.

use chrono::NaiveDate;
use docket_core::{Amount, ArithmeticError, Extensions, Key, Percentage};
use serde::{Deserialize, Serialize};

use crate::org::clean;

/// How the customer is expected to pay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instructions {
    /// Means of payment (`credit-transfer`, `card`, `direct-debit`).
    #[serde(default)]
    pub key: Key,
    /// Free-text detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Reference the payer should quote.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Extensions.
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

impl Instructions {
    pub(crate) fn normalize(&mut self) {
        clean(&mut self.detail);
        clean(&mut self.reference);
        self.ext.normalize();
    }
}

/// A payment already made against the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advance {
    /// When the payment was made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Means of payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    /// What the payment was.
    #[serde(default)]
    pub description: String,
    /// Share of the payable amount. Takes precedence over `amount`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<Percentage>,
    /// Amount paid.
    #[serde(default)]
    pub amount: Amount,
    /// Extensions.
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
}

impl Advance {
    pub(crate) fn normalize(&mut self) {
        let t = self.description.trim();
        if t.len() != self.description.len() {
            self.description = t.to_string();
        }
        self.ext.normalize();
    }

    /// Resolve a percentage advance against `payable` and round to `scale`.
    pub(crate) fn calculate(&mut self, payable: Amount, scale: u32) -> Result<(), ArithmeticError> {
        if let Some(p) = self.percent {
            self.amount = p.of(payable)?;
        }
        self.amount = self.amount.rescale(scale);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_advance() {
        let mut a = Advance {
            description: "Deposit".into(),
            percent: Some("40%".parse().unwrap()),
            ..Default::default()
        };
        a.calculate("121.00".parse().unwrap(), 2).unwrap();
        assert_eq!(a.amount.to_string(), "48.40");
    }

    #[test]
    fn fixed_advance_is_rescaled() {
        let mut a = Advance {
            description: "Deposit".into(),
            amount: "10".parse().unwrap(),
            ..Default::default()
        };
        a.calculate("121.00".parse().unwrap(), 2).unwrap();
        assert_eq!(a.amount.to_string(), "10.00");
    }
}
