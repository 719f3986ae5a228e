//! # Rule Registry
//!
//! Holds every regime (by country code) and addon (by key) the process
//! knows about. The registry is assembled once at start-up and shared
//! read-only afterwards, typically behind an `Arc`; registration takes
//! `&mut self`, so mutation after sharing is ruled out by the borrow
//! checker.
//!
//! ## Consistency checks
//!
//! Registration rejects definitions that contradict themselves:
//!
//! - a second regime for the same country code (or alias), or a second
//!   addon with the same key;
//! - scenario or correction extension keys missing from the definition's
//!   own extension list;
//! - rate definitions allowing combo keys their category does not accept.
//!
//! A lookup miss is not an error here. The dispatcher reports unknown
//! regimes and addons at validation time, and only for documents that
//! reference them.

use std::collections::HashMap;

use docket_core::{FieldErrors, Key};
use thiserror::Error;

use crate::defs::{
    AddonDef, CategoryDef, CorrectionDefinition, ExtensionDef, KeyDefinition, RegimeDef,
    ScenarioSet, TagSet,
};
use crate::hooks::RuleHooks;

/// Registration failures. All of them are programming errors in the
/// definitions being registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A regime is already registered under this code.
    #[error("regime '{0}' already registered")]
    DuplicateRegime(String),

    /// An addon is already registered under this key.
    #[error("addon '{0}' already registered")]
    DuplicateAddon(String),

    /// A scenario or correction refers to an extension the owner does not define.
    #[error("{owner}: extension '{key}' used by {used_by} is not defined")]
    UndefinedExtension {
        /// Regime code or addon key.
        owner: String,
        /// The missing extension key.
        key: String,
        /// What referred to it.
        used_by: &'static str,
    },

    /// A rate accepts a combo key its category does not.
    #[error("{owner}: rate '{rate}' of category '{category}' allows unknown key '{key}'")]
    UndefinedRateKey {
        /// Regime code.
        owner: String,
        /// Category code.
        category: String,
        /// Rate key.
        rate: String,
        /// Combo key.
        key: String,
    },
}

/// Process-wide store of regimes and addons.
#[derive(Debug, Default)]
pub struct Registry {
    regimes: Vec<RegimeDef>,
    regime_index: HashMap<String, usize>,
    addons: Vec<AddonDef>,
    addon_index: HashMap<String, usize>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a regime under its country code and alternative codes.
    pub fn register_regime(&mut self, def: RegimeDef) -> Result<(), RegistryError> {
        let owner = def.country.to_string();
        let codes: Vec<String> = std::iter::once(&def.country)
            .chain(def.alt_country_codes.iter())
            .map(|c| c.as_str().to_lowercase())
            .collect();
        if let Some(dup) = codes.iter().find(|c| self.regime_index.contains_key(*c)) {
            return Err(RegistryError::DuplicateRegime(dup.to_uppercase()));
        }
        check_extension_refs(&owner, &def.extensions, &def.scenarios, &def.corrections)?;
        for cat in &def.categories {
            check_rate_keys(&owner, cat)?;
        }

        tracing::debug!(regime = %owner, "registered regime");
        let idx = self.regimes.len();
        self.regimes.push(def);
        for code in codes {
            self.regime_index.insert(code, idx);
        }
        Ok(())
    }

    /// Install an addon under its key.
    pub fn register_addon(&mut self, def: AddonDef) -> Result<(), RegistryError> {
        let key = def.key.as_str().to_lowercase();
        if self.addon_index.contains_key(&key) {
            return Err(RegistryError::DuplicateAddon(key));
        }
        check_extension_refs(&key, &def.extensions, &def.scenarios, &def.corrections)?;

        tracing::debug!(addon = %key, "registered addon");
        self.addon_index.insert(key, self.addons.len());
        self.addons.push(def);
        Ok(())
    }

    /// Regime by country code or alias, case-insensitive.
    pub fn regime_for(&self, code: &str) -> Option<&RegimeDef> {
        self.regime_index
            .get(&code.to_lowercase())
            .map(|&i| &self.regimes[i])
    }

    /// Addon by key, case-insensitive.
    pub fn addon_for(&self, key: &str) -> Option<&AddonDef> {
        self.addon_index
            .get(&key.to_lowercase())
            .map(|&i| &self.addons[i])
    }

    /// Regimes in registration order.
    pub fn regimes(&self) -> impl Iterator<Item = &RegimeDef> {
        self.regimes.iter()
    }

    /// Addons in registration order.
    pub fn addons(&self) -> impl Iterator<Item = &AddonDef> {
        self.addons.iter()
    }

    /// Resolve the rules for a document naming `regime` and `addons`.
    pub fn context<'a>(&'a self, regime: Option<&str>, addons: &[Key]) -> RuleContext<'a> {
        let mut ctx = RuleContext::default();
        if let Some(code) = regime {
            match self.regime_for(code) {
                Some(r) => ctx.regime = Some(r),
                None => ctx.unknown_regime = Some(code.to_string()),
            }
        }
        for key in addons {
            match self.addon_for(key.as_str()) {
                Some(a) => {
                    if !ctx.addons.iter().any(|x| x.key == a.key) {
                        ctx.addons.push(a);
                    }
                }
                None => ctx.unknown_addons.push(key.clone()),
            }
        }
        ctx
    }
}

fn check_extension_refs(
    owner: &str,
    extensions: &[ExtensionDef],
    scenarios: &[ScenarioSet],
    corrections: &[CorrectionDefinition],
) -> Result<(), RegistryError> {
    let defined = |k: &Key| extensions.iter().any(|e| e.key == *k);
    let mut refs: Vec<(&Key, &'static str)> = Vec::new();
    for set in scenarios {
        refs.extend(set.extension_keys().into_iter().map(|k| (k, "a scenario")));
        for s in &set.list {
            if let Some(k) = &s.ext_key {
                refs.push((k, "a scenario guard"));
            }
        }
    }
    for c in corrections {
        refs.extend(c.extensions.iter().map(|k| (k, "a correction")));
    }
    match refs.into_iter().find(|(k, _)| !defined(*k)) {
        Some((k, used_by)) => Err(RegistryError::UndefinedExtension {
            owner: owner.to_string(),
            key: k.to_string(),
            used_by,
        }),
        None => Ok(()),
    }
}

fn check_rate_keys(owner: &str, cat: &CategoryDef) -> Result<(), RegistryError> {
    for rate in &cat.rates {
        if let Some(k) = rate.keys.iter().find(|k| !cat.has_key(k.as_str())) {
            return Err(RegistryError::UndefinedRateKey {
                owner: owner.to_string(),
                category: cat.code.to_string(),
                rate: rate.key.to_string(),
                key: k.to_string(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rule context
// ---------------------------------------------------------------------------

/// The regime and addons that apply to one document.
#[derive(Debug, Default, Clone)]
pub struct RuleContext<'a> {
    /// The document's regime, if known.
    pub regime: Option<&'a RegimeDef>,
    /// The document's addons, in declared order, without duplicates.
    pub addons: Vec<&'a AddonDef>,
    /// Regime code the document names but the registry lacks.
    pub unknown_regime: Option<String>,
    /// Addon keys the document names but the registry lacks.
    pub unknown_addons: Vec<Key>,
}

impl<'a> RuleContext<'a> {
    /// Hooks in dispatch order: regime first, then addons.
    pub fn hooks(&self) -> impl Iterator<Item = &'a dyn RuleHooks> + '_ {
        self.regime
            .and_then(|r| r.hooks.as_deref())
            .into_iter()
            .chain(self.addons.iter().copied().filter_map(|a| a.hooks.as_deref()))
    }

    /// Extension definition by key, from the regime or any addon.
    pub fn extension(&self, key: &str) -> Option<&'a ExtensionDef> {
        self.regime
            .and_then(|r| r.extension(key))
            .or_else(|| self.addons.iter().copied().find_map(|a| a.extension(key)))
    }

    /// Tag definition for `schema` (short name) from the regime or addons.
    pub fn tag(&self, schema: &str, tag: &str) -> Option<&'a KeyDefinition> {
        self.tag_sets(schema).into_iter().find_map(|set| set.get(tag))
    }

    /// Tag sets for `schema`, regime first.
    pub fn tag_sets(&self, schema: &str) -> Vec<&'a TagSet> {
        let mut sets: Vec<&'a TagSet> = Vec::new();
        if let Some(r) = self.regime {
            sets.extend(r.tags.iter().filter(|t| t.schema == schema));
        }
        for a in self.addons.iter().copied() {
            sets.extend(a.tags.iter().filter(|t| t.schema == schema));
        }
        sets
    }

    /// Scenario sets for `schema`, regime first then addons in order.
    pub fn scenario_sets(&self, schema: &str) -> Vec<&'a ScenarioSet> {
        let mut sets: Vec<&'a ScenarioSet> = Vec::new();
        if let Some(r) = self.regime {
            sets.extend(r.scenarios.iter().filter(|s| s.schema == schema));
        }
        for a in self.addons.iter().copied() {
            sets.extend(a.scenarios.iter().filter(|s| s.schema == schema));
        }
        sets
    }

    /// Correction rules for `schema` merged across regime and addons.
    pub fn correction(&self, schema: &str) -> Option<CorrectionDefinition> {
        let mut merged: Option<CorrectionDefinition> = None;
        let defs = self
            .regime
            .and_then(|r| r.correction_for(schema))
            .into_iter()
            .chain(self.addons.iter().copied().filter_map(|a| a.correction_for(schema)));
        for def in defs {
            match &mut merged {
                Some(m) => m.merge(def),
                None => merged = Some(def.clone()),
            }
        }
        merged
    }

    /// Errors for regimes and addons the document names but the registry
    /// lacks, keyed by the document fields that name them.
    pub fn unknown_errors(&self) -> FieldErrors {
        let mut errs = FieldErrors::new();
        if self.unknown_regime.is_some() {
            errs.add("$regime", "must be a valid value");
        }
        if !self.unknown_addons.is_empty() {
            let mut inner = FieldErrors::new();
            for key in &self.unknown_addons {
                inner.add(key.as_str(), "addon not registered");
            }
            errs.nest("$addons", inner);
        }
        errs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{RateDef, Scenario, ScenarioExt};
    use docket_core::{Code, CurrencyCode};

    fn regime(code: &str, alts: &[&str]) -> RegimeDef {
        RegimeDef {
            country: Code::from(code),
            alt_country_codes: alts.iter().map(|c| Code::from(*c)).collect(),
            name: code.into(),
            currency: CurrencyCode::new("EUR"),
            ..Default::default()
        }
    }

    fn addon(key: &str) -> AddonDef {
        AddonDef {
            key: Key::from(key),
            name: key.into(),
            ..Default::default()
        }
    }

    #[test]
    fn regime_lookup_is_case_insensitive_with_aliases() {
        let mut reg = Registry::new();
        reg.register_regime(regime("EL", &["GR"])).unwrap();
        assert_eq!(reg.regime_for("el").unwrap().country, "EL");
        assert_eq!(reg.regime_for("GR").unwrap().country, "EL");
        assert_eq!(reg.regime_for("gr").unwrap().country, "EL");
        assert!(reg.regime_for("ES").is_none());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut reg = Registry::new();
        reg.register_regime(regime("EL", &["GR"])).unwrap();
        assert_eq!(
            reg.register_regime(regime("GR", &[])),
            Err(RegistryError::DuplicateRegime("GR".into()))
        );
        reg.register_addon(addon("it-sdi-v1")).unwrap();
        assert_eq!(
            reg.register_addon(addon("IT-SDI-V1")),
            Err(RegistryError::DuplicateAddon("it-sdi-v1".into()))
        );
    }

    #[test]
    fn scenario_extensions_must_be_defined() {
        let mut a = addon("ar-arca-v4");
        a.scenarios = vec![ScenarioSet {
            schema: "bill/invoice".into(),
            list: vec![Scenario {
                ext: vec![ScenarioExt::new("ar-arca-doc-type", "001")],
                ..Default::default()
            }],
        }];
        let mut reg = Registry::new();
        let err = reg.register_addon(a.clone()).unwrap_err();
        assert!(matches!(err, RegistryError::UndefinedExtension { ref key, .. } if key == "ar-arca-doc-type"));

        a.extensions.push(ExtensionDef {
            key: Key::from("ar-arca-doc-type"),
            name: "Doc Type".into(),
            ..Default::default()
        });
        reg.register_addon(a).unwrap();
    }

    #[test]
    fn rate_keys_must_belong_to_category() {
        let mut r = regime("ES", &[]);
        r.categories.push(CategoryDef {
            code: Code::from("VAT"),
            name: "VAT".into(),
            keys: vec![KeyDefinition::new("standard", "Standard")],
            rates: vec![RateDef {
                key: Key::from("general"),
                keys: vec![Key::from("export")],
                name: "General".into(),
                ..Default::default()
            }],
            ..Default::default()
        });
        let err = Registry::new().register_regime(r).unwrap_err();
        assert!(matches!(err, RegistryError::UndefinedRateKey { .. }));
    }

    #[test]
    fn context_records_unknowns() {
        let mut reg = Registry::new();
        reg.register_regime(regime("ES", &[])).unwrap();
        reg.register_addon(addon("es-facturae-v3")).unwrap();
        let ctx = reg.context(
            Some("XX"),
            &[Key::from("es-facturae-v3"), Key::from("nope"), Key::from("es-facturae-v3")],
        );
        assert!(ctx.regime.is_none());
        assert_eq!(ctx.addons.len(), 1);
        let errs = ctx.unknown_errors();
        assert_eq!(errs.message_at("$regime"), Some("must be a valid value"));
        assert_eq!(errs.message_at("$addons.nope"), Some("addon not registered"));
    }

    #[test]
    fn corrections_merge_across_sources() {
        let mut r = regime("ES", &[]);
        r.corrections.push(CorrectionDefinition {
            types: vec![Key::from("credit-note")],
            ..CorrectionDefinition::new("bill/invoice")
        });
        let mut a = addon("es-facturae-v3");
        a.extensions.push(ExtensionDef {
            key: Key::from("es-facturae-correction"),
            name: "Correction".into(),
            ..Default::default()
        });
        a.corrections.push(CorrectionDefinition {
            types: vec![Key::from("corrective")],
            extensions: vec![Key::from("es-facturae-correction")],
            ..CorrectionDefinition::new("bill/invoice")
        });
        let mut reg = Registry::new();
        reg.register_regime(r).unwrap();
        reg.register_addon(a).unwrap();
        let ctx = reg.context(Some("ES"), &[Key::from("es-facturae-v3")]);
        let def = ctx.correction("bill/invoice").unwrap();
        assert_eq!(def.types.len(), 2);
        assert_eq!(def.extensions, vec![Key::from("es-facturae-correction")]);
        assert!(ctx.correction("note/message").is_none());
    }
}
