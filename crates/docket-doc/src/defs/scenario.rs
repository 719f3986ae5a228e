//! # Scenarios
//!
//! A scenario is a guarded rule: when a document's type and tags (and
//! optionally one extension value) match, the scenario contributes
//! extension values and a note. Scenarios are grouped per document schema
//! in a [`ScenarioSet`] and evaluated in declared order.
//!
//! Each extension a scenario sets carries an [`ExtMode`]. The default,
//! `SetIfAbsent`, never replaces a value that is already present, whether
//! it came from the input data or from an earlier scenario. `SetAlways`
//! replaces unconditionally.

use docket_core::{Extensions, Key};
use serde::{Deserialize, Serialize};

use crate::org::Note;

/// How a scenario extension interacts with an existing value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtMode {
    /// Only set when the key has no value yet.
    #[default]
    SetIfAbsent,
    /// Always set, replacing any value.
    SetAlways,
}

impl ExtMode {
    fn is_default(&self) -> bool {
        *self == Self::SetIfAbsent
    }
}

/// One extension value produced by a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioExt {
    /// Extension key.
    pub key: Key,
    /// Coded value.
    pub code: String,
    /// Write mode.
    #[serde(default, skip_serializing_if = "ExtMode::is_default")]
    pub mode: ExtMode,
}

impl ScenarioExt {
    /// Set `key` to `code` unless already present.
    pub fn new(key: &str, code: &str) -> Self {
        Self {
            key: Key::from(key),
            code: code.to_string(),
            mode: ExtMode::SetIfAbsent,
        }
    }

    /// Set `key` to `code`, replacing any value.
    pub fn always(key: &str, code: &str) -> Self {
        Self {
            mode: ExtMode::SetAlways,
            ..Self::new(key, code)
        }
    }
}

/// A guarded rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Label for humans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Document types the scenario applies to. Empty matches any type.
    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<Key>,
    /// Tags that must all be present.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Key>,
    /// Extension key that must be present on the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_key: Option<Key>,
    /// Value the `ext_key` extension must hold. Any value when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_value: Option<String>,
    /// Note appended on match. An empty text with a `src` tag takes the
    /// tag's description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<Note>,
    /// Extensions set on match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ext: Vec<ScenarioExt>,
}

impl Scenario {
    /// True if the scenario's guards hold for a document.
    pub fn matches(&self, doc_type: &Key, tags: &[Key], ext: &Extensions) -> bool {
        if !self.types.is_empty() && !doc_type.is_in(&self.types) {
            return false;
        }
        if !self.tags.iter().all(|t| t.is_in(tags)) {
            return false;
        }
        if let Some(key) = &self.ext_key {
            match (ext.get(key.as_str()), &self.ext_value) {
                (None, _) => return false,
                (Some(v), Some(want)) if v != want.as_str() => return false,
                _ => {}
            }
        }
        true
    }
}

/// Scenarios for one schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSet {
    /// Schema short name.
    pub schema: String,
    /// Scenarios in precedence order.
    pub list: Vec<Scenario>,
}

impl ScenarioSet {
    /// Every extension key any scenario in the set may write.
    pub fn extension_keys(&self) -> Vec<&Key> {
        let mut keys: Vec<&Key> = Vec::new();
        for s in &self.list {
            for e in &s.ext {
                if !keys.contains(&&e.key) {
                    keys.push(&e.key);
                }
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[&str]) -> Vec<Key> {
        list.iter().map(|k| Key::from(*k)).collect()
    }

    #[test]
    fn empty_guards_match_everything() {
        let s = Scenario::default();
        assert!(s.matches(&Key::from("standard"), &[], &Extensions::new()));
    }

    #[test]
    fn type_guard() {
        let s = Scenario {
            types: keys(&["credit-note"]),
            ..Default::default()
        };
        assert!(s.matches(&Key::from("credit-note"), &[], &Extensions::new()));
        assert!(!s.matches(&Key::from("standard"), &[], &Extensions::new()));
    }

    #[test]
    fn all_tags_required() {
        let s = Scenario {
            tags: keys(&["simplified", "self-billed"]),
            ..Default::default()
        };
        let std = Key::from("standard");
        assert!(!s.matches(&std, &keys(&["simplified"]), &Extensions::new()));
        assert!(s.matches(&std, &keys(&["self-billed", "simplified"]), &Extensions::new()));
    }

    #[test]
    fn ext_guard() {
        let s = Scenario {
            ext_key: Some(Key::from("x-regime")),
            ext_value: Some("01".into()),
            ..Default::default()
        };
        let std = Key::from("standard");
        let hit: Extensions = [("x-regime", "01")].into_iter().collect();
        let miss: Extensions = [("x-regime", "02")].into_iter().collect();
        assert!(s.matches(&std, &[], &hit));
        assert!(!s.matches(&std, &[], &miss));
        assert!(!s.matches(&std, &[], &Extensions::new()));
    }

    #[test]
    fn mode_serialization() {
        let v = serde_json::to_value(ScenarioExt::new("a", "1")).unwrap();
        assert!(v.get("mode").is_none());
        let v = serde_json::to_value(ScenarioExt::always("a", "1")).unwrap();
        assert_eq!(v["mode"], "set_always");
    }

    #[test]
    fn extension_keys_are_unique() {
        let set = ScenarioSet {
            schema: "bill/invoice".into(),
            list: vec![
                Scenario {
                    ext: vec![ScenarioExt::new("a", "1")],
                    ..Default::default()
                },
                Scenario {
                    ext: vec![ScenarioExt::new("a", "2"), ScenarioExt::new("b", "1")],
                    ..Default::default()
                },
            ],
        };
        assert_eq!(set.extension_keys().len(), 2);
    }
}
