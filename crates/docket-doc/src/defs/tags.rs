//! Tag sets: the Boolean attributes a document of one schema may carry.

use docket_core::Key;
use serde::{Deserialize, Serialize};

use super::KeyDefinition;

/// Tags available to one document schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    /// Schema short name.
    pub schema: String,
    /// Tag definitions.
    pub list: Vec<KeyDefinition>,
}

impl TagSet {
    /// Definition of `tag`, if listed.
    pub fn get(&self, tag: &str) -> Option<&KeyDefinition> {
        super::key_definition(&self.list, tag)
    }

    /// Keys of every listed tag.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.list.iter().map(|kd| &kd.key)
    }
}
