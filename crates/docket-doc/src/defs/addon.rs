//! # Addon Definitions
//!
//! An addon packages the rules of one e-invoicing standard. A document
//! opts in by listing the addon key in `$addons`; any number of addons may
//! apply alongside the document's regime.

use std::sync::Arc;

use docket_core::Key;
use serde::{Deserialize, Serialize};

use super::{CorrectionDefinition, ExtensionDef, ScenarioSet, TagSet};
use crate::hooks::RuleHooks;

/// A published reference the addon is based on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Document title.
    pub title: String,
    /// Where to find it.
    pub url: String,
}

/// Rules of one e-invoicing standard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddonDef {
    /// Addon key (`es-facturae-v3`).
    pub key: Key,
    /// Display name.
    pub name: String,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Published references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    /// Extension definitions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<ExtensionDef>,
    /// Tags per schema.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagSet>,
    /// Scenario sets per schema.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenarios: Vec<ScenarioSet>,
    /// Correction rules per schema.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<CorrectionDefinition>,
    /// Inbox keys recognised by the standard.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inboxes: Vec<Key>,
    /// Normalizer and validator.
    #[serde(skip)]
    pub hooks: Option<Arc<dyn RuleHooks>>,
}

impl AddonDef {
    /// Extension defined by the addon.
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
}
