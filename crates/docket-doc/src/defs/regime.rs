//! # Regime Definitions
//!
//! A [`RegimeDef`] describes one country's tax system: its currency and
//! rounding rule, its tax categories, and the tags, extensions, scenarios
//! and correction rules that apply to documents issued under it.

use std::sync::Arc;

use docket_core::{Code, CurrencyCode, Key};
use serde::{Deserialize, Serialize};

use super::{CategoryDef, CorrectionDefinition, ExtensionDef, KeyDefinition, ScenarioSet, TagSet};
use crate::hooks::RuleHooks;

/// How tax totals are rounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundingRule {
    /// Sum at extra precision, round once per category.
    #[default]
    Precise,
    /// Round every rate amount to the currency's scale before summing.
    Currency,
}

/// A jurisdiction's rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegimeDef {
    /// Canonical country code (`ES`, `EL`).
    pub country: Code,
    /// Other codes that resolve to this regime (`GR`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alt_country_codes: Vec<Code>,
    /// Display name.
    pub name: String,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default currency.
    pub currency: CurrencyCode,
    /// IANA time zone.
    pub time_zone: String,
    /// Tax scheme code, when the regime has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_scheme: Option<Code>,
    /// Rounding rule for tax totals.
    #[serde(default)]
    pub calculator_rounding_rule: RoundingRule,
    /// Tags per schema.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagSet>,
    /// Extensions defined by the regime itself.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<ExtensionDef>,
    /// Keys accepted for party identities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identities: Vec<KeyDefinition>,
    /// Tax categories.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategoryDef>,
    /// Scenario sets per schema.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenarios: Vec<ScenarioSet>,
    /// Correction rules per schema.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<CorrectionDefinition>,
    /// Normalizer and validator.
    #[serde(skip)]
    pub hooks: Option<Arc<dyn RuleHooks>>,
}

impl RegimeDef {
    /// Category by code.
    pub fn category(&self, code: &str) -> Option<&CategoryDef> {
        self.categories.iter().find(|c| c.code == code)
    }

    /// Extension defined by the regime.
    pub fn extension(&self, key: &str) -> Option<&ExtensionDef> {
        self.extensions.iter().find(|e| e.key == key)
    }

    /// Tag sets for a schema short name.
    pub fn tags_for<'a>(&'a self, schema: &'a str) -> impl Iterator<Item = &'a TagSet> + 'a {
        self.tags.iter().filter(move |t| t.schema == schema)
    }

    /// Scenario sets for a schema short name.
    pub fn scenarios_for<'a>(&'a self, schema: &'a str) -> impl Iterator<Item = &'a ScenarioSet> + 'a {
        self.scenarios.iter().filter(move |s| s.schema == schema)
    }

    /// Correction rules for a schema short name.
    pub fn correction_for(&self, schema: &str) -> Option<&CorrectionDefinition> {
        self.corrections.iter().find(|c| c.schema == schema)
    }

    /// True if `code` is the canonical or an alternative country code.
    pub fn answers_to(&self, code: &str) -> bool {
        self.country.as_str().eq_ignore_ascii_case(code)
            || self
                .alt_country_codes
                .iter()
                .any(|c| c.as_str().eq_ignore_ascii_case(code))
    }

    /// Identity key definition.
    pub fn identity(&self, key: &Key) -> Option<&KeyDefinition> {
        super::key_definition(&self.identities, key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alt_codes_answer() {
        let r = RegimeDef {
            country: Code::from("EL"),
            alt_country_codes: vec![Code::from("GR")],
            ..Default::default()
        };
        assert!(r.answers_to("el"));
        assert!(r.answers_to("GR"));
        assert!(!r.answers_to("ES"));
    }

    #[test]
    fn hooks_are_not_serialized() {
        let r = RegimeDef {
            country: Code::from("ES"),
            name: "Spain".into(),
            currency: CurrencyCode::new("EUR"),
            time_zone: "Europe/Madrid".into(),
            ..Default::default()
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["country"], "ES");
        assert_eq!(v["calculator_rounding_rule"], "precise");
        assert!(v.get("hooks").is_none());
        let back: RegimeDef = serde_json::from_value(v).unwrap();
        assert!(back.hooks.is_none());
    }
}
