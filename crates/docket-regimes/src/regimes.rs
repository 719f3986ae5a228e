//! # Regimes
//!
//! One module per jurisdiction, each exposing `regime() -> RegimeDef`.
//! Shared imports and small builders live here and reach the country
//! modules through `use super::*`.

pub mod ar;
pub mod el;
pub mod es;
pub mod it;

pub(crate) use std::sync::Arc;

pub(crate) use chrono::NaiveDate;
pub(crate) use docket_core::{Code, CurrencyCode, FieldErrors, Key, Percentage};
pub(crate) use docket_doc::bill::{types, Invoice};
pub(crate) use docket_doc::defs::category::{keys, rates, vat_keys};
pub(crate) use docket_doc::defs::{
    CategoryDef, CodeDefinition, CorrectionDefinition, ExtensionDef, KeyDefinition, RateDef,
    RateValueDef, RegimeDef, RoundingRule, Scenario, ScenarioSet, TagSet,
};
pub(crate) use docket_doc::hooks::{Node, NodeRef, RuleHooks};
pub(crate) use docket_doc::org::Note;
pub(crate) use docket_doc::schema::SHORT_INVOICE;
pub(crate) use docket_doc::tax::TaxIdentity;

/// Every shipped regime.
pub fn all() -> Vec<RegimeDef> {
    vec![es::regime(), it::regime(), ar::regime(), el::regime()]
}

// -- Helpers -----------------------------------------------------------------

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

/// `mantissa` with `scale` decimal places, as a percent figure.
pub(crate) fn pct(mantissa: i64, scale: u32) -> Percentage {
    Percentage::new(mantissa, scale)
}

pub(crate) fn rate(key: &str, name: &str, values: Vec<RateValueDef>) -> RateDef {
    RateDef {
        key: Key::from(key),
        keys: vec![Key::from(keys::STANDARD)],
        name: name.to_string(),
        desc: None,
        values,
    }
}

pub(crate) fn since(y: i32, m: u32, d: u32, percent: Percentage) -> RateValueDef {
    RateValueDef::since(date(y, m, d), percent)
}

pub(crate) fn legal_scenario(tag: &str, text: &str) -> Scenario {
    Scenario {
        tags: vec![Key::from(tag)],
        note: Some(Note::legal(tag, text)),
        ..Default::default()
    }
}

pub(crate) fn ext_values(list: &[(&str, &str)]) -> Vec<CodeDefinition> {
    list.iter().map(|(c, n)| CodeDefinition::new(c, n)).collect()
}

/// The identity's code, if it is non-empty and issued by `country`.
pub(crate) fn local_code<'a>(tid: &'a TaxIdentity, country: &str) -> Option<&'a str> {
    if tid.country.as_str() != country {
        return None;
    }
    tid.code.as_ref().map(|c| c.as_str()).filter(|c| !c.is_empty())
}

/// Errors for a party that must carry a tax identity with a code.
pub(crate) fn require_tax_code(party: &docket_doc::org::Party) -> FieldErrors {
    match &party.tax_id {
        None => FieldErrors::single("tax_id", "cannot be blank"),
        Some(tid) if tid.code.as_ref().map_or(true, |c| c.is_empty()) => {
            FieldErrors::single("code", "cannot be blank").prefixed("tax_id")
        }
        Some(_) => FieldErrors::new(),
    }
}
