//! # Extensions Map
//!
//! An unordered mapping from extension key to coded value, attached to
//! invoices, parties, tax combos, payment instructions and preceding
//! references. Keys are unique; iteration is in key order so that
//! serialized output is stable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::key::Key;

/// Extension key → coded value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extensions(BTreeMap<Key, String>);

impl Extensions {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no extension is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// True if every key in `keys` has a value.
    pub fn has(&self, keys: &[&str]) -> bool {
        keys.iter().all(|k| self.0.contains_key(*k))
    }

    /// Set a value, replacing any previous one.
    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Move the value stored under `from` to `to`, unless `to` already
    /// has a value.
    pub fn rename(&mut self, from: &str, to: &str) {
        if let Some(v) = self.0.remove(from) {
            self.0.entry(Key::from(to)).or_insert(v);
        }
    }

    /// Drop entries with empty values.
    pub fn normalize(&mut self) {
        self.0.retain(|_, v| !v.trim().is_empty());
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &str)> {
        self.0.iter().map(|(k, v)| (k, v.as_str()))
    }
}

impl<K: Into<Key>, V: Into<String>> FromIterator<(K, V)> for Extensions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
