//! # Tax Categories and Rates
//!
//! A [`CategoryDef`] is one tax a regime levies or withholds (VAT, IRPF,
//! IRPEF). Its [`RateDef`]s name the rate levels (`general`, `reduced`)
//! and each level carries a history of [`RateValueDef`]s, newest first,
//! optionally filtered by extension values so one rate can carry different
//! percentages per territory.

use chrono::NaiveDate;
use docket_core::{Code, Extensions, Key, Percentage};
use serde::{Deserialize, Serialize};

use super::{is_false, KeyDefinition};

/// Well-known combo keys.
pub mod keys {
    /// Standard rate applies.
    pub const STANDARD: &str = "standard";
    /// Zero rated.
    pub const ZERO: &str = "zero";
    /// Exempt from the tax.
    pub const EXEMPT: &str = "exempt";
    /// Customer accounts for the tax.
    pub const REVERSE_CHARGE: &str = "reverse-charge";
    /// Intra-community supply.
    pub const INTRA_COMMUNITY: &str = "intra-community";
    /// Export outside the territory.
    pub const EXPORT: &str = "export";
    /// Outside the scope of the tax.
    pub const OUTSIDE_SCOPE: &str = "outside-scope";
}

/// Well-known rate levels.
pub mod rates {
    /// General rate.
    pub const GENERAL: &str = "general";
    /// Intermediate rate.
    pub const INTERMEDIATE: &str = "intermediate";
    /// Reduced rate.
    pub const REDUCED: &str = "reduced";
    /// Super-reduced rate.
    pub const SUPER_REDUCED: &str = "super-reduced";
}

/// The keys every VAT-style category accepts.
pub fn vat_keys() -> Vec<KeyDefinition> {
    vec![
        KeyDefinition::new(keys::STANDARD, "Standard"),
        KeyDefinition::new(keys::ZERO, "Zero"),
        KeyDefinition::new(keys::EXEMPT, "Exempt"),
        KeyDefinition::new(keys::REVERSE_CHARGE, "Reverse Charge"),
        KeyDefinition::new(keys::INTRA_COMMUNITY, "Intra-Community"),
        KeyDefinition::new(keys::EXPORT, "Export"),
        KeyDefinition::new(keys::OUTSIDE_SCOPE, "Outside Scope"),
    ]
}

/// One dated percentage for a rate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateValueDef {
    /// Only applies to combos carrying all these extension values.
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub ext: Extensions,
    /// First day the value applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<NaiveDate>,
    /// Day the value stops applying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDate>,
    /// Percentage levied.
    pub percent: Percentage,
    /// Additional surcharge percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surcharge: Option<Percentage>,
    /// Kept for history but no longer selectable.
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
}

impl RateValueDef {
    /// A value applying from `since` onward.
    pub fn since(date: NaiveDate, percent: Percentage) -> Self {
        Self {
            since: Some(date),
            percent,
            ..Default::default()
        }
    }

    fn applies(&self, date: NaiveDate, ext: &Extensions) -> bool {
        if self.disabled {
            return false;
        }
        if self.since.is_some_and(|s| s > date) {
            return false;
        }
        if self.until.is_some_and(|u| u <= date) {
            return false;
        }
        self.ext.iter().all(|(k, v)| ext.get(k.as_str()) == Some(v))
    }
}

/// A named rate level within a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateDef {
    /// Rate key.
    pub key: Key,
    /// Combo keys the rate may be used with. Empty means any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<Key>,
    /// Short label.
    pub name: String,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Values, newest first.
    pub values: Vec<RateValueDef>,
}

impl RateDef {
    /// The value in force on `date` for a combo with `ext`.
    pub fn value(&self, date: NaiveDate, ext: &Extensions) -> Option<&RateValueDef> {
        self.values.iter().find(|v| v.applies(date, ext))
    }
}

/// A tax category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDef {
    /// Category code (`VAT`, `IRPF`).
    pub code: Code,
    /// Short label.
    pub name: String,
    /// Full title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Withheld from the payable amount rather than added to it.
    #[serde(default, skip_serializing_if = "is_false")]
    pub retained: bool,
    /// Accepted combo keys. Empty means combos must not carry a key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<KeyDefinition>,
    /// Rate levels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rates: Vec<RateDef>,
    /// Extension keys combos of this category may carry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<Key>,
}

impl CategoryDef {
    /// Rate level by key.
    pub fn rate(&self, key: &str) -> Option<&RateDef> {
        self.rates.iter().find(|r| r.key == key)
    }

    /// True if `key` is an accepted combo key.
    pub fn has_key(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn general() -> RateDef {
        RateDef {
            key: Key::from(rates::GENERAL),
            name: "General".into(),
            values: vec![
                RateValueDef {
                    ext: [("es-tbai-region", "canarias")].into_iter().collect(),
                    percent: "7%".parse().unwrap(),
                    ..Default::default()
                },
                RateValueDef::since(date(2012, 9, 1), "21%".parse().unwrap()),
                RateValueDef::since(date(2010, 7, 1), "18%".parse().unwrap()),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn picks_value_by_date() {
        let r = general();
        let none = Extensions::new();
        assert_eq!(r.value(date(2024, 1, 1), &none).unwrap().percent.to_string(), "21%");
        assert_eq!(r.value(date(2011, 1, 1), &none).unwrap().percent.to_string(), "18%");
        assert!(r.value(date(2001, 1, 1), &none).is_none());
    }

    #[test]
    fn ext_filter_selects_regional_value() {
        let r = general();
        let ext: Extensions = [("es-tbai-region", "canarias")].into_iter().collect();
        assert_eq!(r.value(date(2024, 1, 1), &ext).unwrap().percent.to_string(), "7%");
    }

    #[test]
    fn until_is_exclusive() {
        let v = RateValueDef {
            until: Some(date(2020, 1, 1)),
            percent: "10%".parse().unwrap(),
            ..Default::default()
        };
        assert!(v.applies(date(2019, 12, 31), &Extensions::new()));
        assert!(!v.applies(date(2020, 1, 1), &Extensions::new()));
    }

    #[test]
    fn vat_keys_cover_standard_set() {
        let cat = CategoryDef {
            code: Code::from("VAT"),
            keys: vat_keys(),
            ..Default::default()
        };
        assert!(cat.has_key("standard"));
        assert!(cat.has_key("reverse-charge"));
        assert!(!cat.has_key("nope"));
    }
}
