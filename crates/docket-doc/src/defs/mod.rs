//! # Rule Definitions
//!
//! Regimes and addons are data. This module holds the shapes that data
//! takes: categories and their rates, extension definitions, tag sets,
//! scenarios and correction definitions. Behaviour beyond what the data
//! can express lives in a [`RuleHooks`](crate::hooks::RuleHooks)
//! implementation attached to the definition.
//!
//! All definitions serialize to JSON so the `regime` bulk action and the
//! `GET /regimes/:code` route can return them as-is.

pub mod addon;
pub mod category;
pub mod correction;
pub mod ext;
pub mod regime;
pub mod scenario;
pub mod tags;

use docket_core::Key;
use serde::{Deserialize, Serialize};

pub use addon::{AddonDef, Source};
pub use category::{CategoryDef, RateDef, RateValueDef};
pub use correction::CorrectionDefinition;
pub use ext::{CodeDefinition, ExtPattern, ExtensionDef};
pub use regime::{RegimeDef, RoundingRule};
pub use scenario::{ExtMode, Scenario, ScenarioExt, ScenarioSet};
pub use tags::TagSet;

/// A key with human labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDefinition {
    /// The key itself.
    pub key: Key,
    /// Short label.
    pub name: String,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl KeyDefinition {
    /// Build a definition with a name and no description.
    pub fn new(key: &str, name: &str) -> Self {
        Self {
            key: Key::from(key),
            name: name.to_string(),
            desc: None,
        }
    }

    /// Attach a description.
    pub fn with_desc(mut self, desc: &str) -> Self {
        self.desc = Some(desc.to_string());
        self
    }
}

/// Find a key definition in a list.
pub fn key_definition<'a>(list: &'a [KeyDefinition], key: &str) -> Option<&'a KeyDefinition> {
    list.iter().find(|kd| kd.key == key)
}

pub(crate) fn is_false(b: &bool) -> bool {
    !*b
}
