//! # Decimal Amounts and Percentages
//!
//! Monetary values are `rust_decimal::Decimal`: a 96-bit integer mantissa
//! with an explicit scale. Nothing in the calculation path touches binary
//! floating point.
//!
//! - [`Amount`] serializes as a decimal string that keeps its scale
//!   (`"100.00"`, not `"100"`).
//! - [`Percentage`] serializes with a trailing `%` (`"21%"`, `"10.5%"`).
//!
//! Both accept JSON numbers on input so hand-written YAML such as
//! `price: 10.5` parses; the number's shortest textual form is used.
//!
//! Rounding is half away from zero (commercial rounding). Arithmetic is
//! checked: a result outside the 96-bit mantissa is an [`ArithmeticError`].

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A decimal operation had no representable result.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
}

/// Round `value` to exactly `scale` decimal places.
pub fn round_to(value: Decimal, scale: u32) -> Decimal {
    let mut d = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    d.rescale(scale);
    d
}

/// A decimal monetary amount or quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

impl Amount {
    /// Zero at scale 0.
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Build from an integer mantissa and a scale: `Amount::new(1050, 2)` is `10.50`.
    pub fn new(mantissa: i64, scale: u32) -> Self {
        Self(Decimal::new(mantissa, scale))
    }

    /// Wrap a decimal.
    pub fn from_decimal(d: Decimal) -> Self {
        Self(d)
    }

    /// Zero with the given scale (`0.00` for scale 2).
    pub fn zero(scale: u32) -> Self {
        Self(round_to(Decimal::ZERO, scale))
    }

    /// The underlying decimal.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Number of digits after the decimal point.
    pub fn scale(&self) -> u32 {
        self.0.scale()
    }

    /// True if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Round to exactly `scale` places.
    pub fn rescale(&self, scale: u32) -> Self {
        Self(round_to(self.0, scale))
    }

    /// Increase the scale to at least `scale`, never losing precision.
    pub fn upscale(&self, scale: u32) -> Self {
        if self.0.scale() >= scale {
            *self
        } else {
            Self(round_to(self.0, scale))
        }
    }

    /// Exact sum.
    pub fn add(&self, other: Amount) -> Result<Self, ArithmeticError> {
        self.0.checked_add(other.0).map(Self).ok_or(ArithmeticError::Overflow)
    }

    /// Exact difference.
    pub fn subtract(&self, other: Amount) -> Result<Self, ArithmeticError> {
        self.0.checked_sub(other.0).map(Self).ok_or(ArithmeticError::Overflow)
    }

    /// Exact product.
    pub fn multiply(&self, other: Amount) -> Result<Self, ArithmeticError> {
        self.0.checked_mul(other.0).map(Self).ok_or(ArithmeticError::Overflow)
    }

    /// Quotient, as precise as the mantissa allows.
    pub fn divide(&self, divisor: Decimal) -> Result<Self, ArithmeticError> {
        if divisor.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        self.0.checked_div(divisor).map(Self).ok_or(ArithmeticError::Overflow)
    }

    /// Negated amount.
    pub fn invert(&self) -> Self {
        Self(-self.0)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clean = s.trim().replace(',', "");
        Decimal::from_str(&clean)
            .map(Self)
            .map_err(|e| format!("invalid amount '{s}': {e}"))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = decimal_text(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A percentage such as `21%`, stored as the percent figure (21).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percentage(Decimal);

impl Percentage {
    /// Build from a mantissa and scale of the percent figure: `Percentage::new(210, 1)` is `21.0%`.
    pub fn new(mantissa: i64, scale: u32) -> Self {
        Self(Decimal::new(mantissa, scale))
    }

    /// The percent figure (21 for 21%).
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// The multiplication factor (0.21 for 21%).
    pub fn factor(&self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }

    /// True if the percentage is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Exact share of `amount`, not rounded.
    pub fn of(&self, amount: Amount) -> Result<Amount, ArithmeticError> {
        amount
            .value()
            .checked_mul(self.factor())
            .map(Amount)
            .ok_or(ArithmeticError::Overflow)
    }
}

impl std::fmt::Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl FromStr for Percentage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let figure = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
        Decimal::from_str(figure)
            .map(Self)
            .map_err(|e| format!("invalid percentage '{s}': {e}"))
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Percentage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = decimal_text(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Accept a JSON string or number and return its text.
fn decimal_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}
