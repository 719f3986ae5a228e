//! # Addons
//!
//! One module per e-invoicing standard, each exposing
//! `addon() -> AddonDef`. An addon only applies to documents that list its
//! key in `$addons`.

pub mod ar_arca;
pub mod es_facturae;
pub mod it_sdi;

pub(crate) use std::sync::Arc;

pub(crate) use docket_core::{FieldErrors, Key};
pub(crate) use docket_doc::bill::{types, Invoice};
pub(crate) use docket_doc::defs::addon::Source;
pub(crate) use docket_doc::defs::{
    AddonDef, CorrectionDefinition, ExtensionDef, KeyDefinition, Scenario, ScenarioExt, ScenarioSet,
    TagSet,
};
pub(crate) use docket_doc::hooks::{Node, NodeRef, RuleHooks};
pub(crate) use docket_doc::org::Note;
pub(crate) use docket_doc::schema::SHORT_INVOICE;

pub(crate) use crate::regimes::ext_values;

/// Every shipped addon.
pub fn all() -> Vec<AddonDef> {
    vec![es_facturae::addon(), it_sdi::addon(), ar_arca::addon()]
}

// -- Helpers -----------------------------------------------------------------

pub(crate) fn extension(key: &str, name: &str, values: &[(&str, &str)]) -> ExtensionDef {
    ExtensionDef {
        key: Key::from(key),
        name: name.to_string(),
        values: ext_values(values),
        ..Default::default()
    }
}

pub(crate) fn keys(list: &[&str]) -> Vec<Key> {
    list.iter().map(|k| Key::from(*k)).collect()
}

/// A scenario setting one extension when `types` and `tags` match.
pub(crate) fn ext_scenario(types: &[&str], tags: &[&str], key: &str, code: &str) -> Scenario {
    Scenario {
        types: keys(types),
        tags: keys(tags),
        ext: vec![ScenarioExt::new(key, code)],
        ..Default::default()
    }
}
