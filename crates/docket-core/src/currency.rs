//! # Currency Codes
//!
//! ISO 4217 codes with the number of minor units each currency uses.
//! Only currencies with a known scale are accepted by the calculator.

use serde::{Deserialize, Serialize};

/// ISO 4217 code → minor-unit scale.
const CURRENCIES: &[(&str, u32)] = &[
    ("ARS", 2),
    ("AUD", 2),
    ("BHD", 3),
    ("BRL", 2),
    ("CAD", 2),
    ("CHF", 2),
    ("CLP", 0),
    ("CNY", 2),
    ("COP", 2),
    ("CZK", 2),
    ("DKK", 2),
    ("EUR", 2),
    ("GBP", 2),
    ("HUF", 2),
    ("INR", 2),
    ("JPY", 0),
    ("KWD", 3),
    ("MXN", 2),
    ("NOK", 2),
    ("PLN", 2),
    ("SEK", 2),
    ("USD", 2),
];

/// An ISO 4217 currency code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Wrap a code, upper-casing it.
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_uppercase())
    }

    /// The code text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty code.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Minor-unit scale, or `None` for unknown currencies.
    pub fn scale(&self) -> Option<u32> {
        CURRENCIES
            .iter()
            .find(|(c, _)| *c == self.0)
            .map(|(_, s)| *s)
    }

    /// True if the currency is known.
    pub fn is_known(&self) -> bool {
        self.scale().is_some()
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
