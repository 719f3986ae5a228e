//! # Messages
//!
//! `note/message` is a free-text document. It has no regime, addons or
//! totals; the only rule is that it says something.

use docket_core::FieldErrors;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::org::{clean, trim};
use crate::schema;
use crate::validate::REQUIRED;

/// A `note/message` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Schema identity.
    #[serde(rename = "$schema", default = "message_schema")]
    pub schema: String,
    /// Identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    /// Summary line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Body.
    #[serde(default)]
    pub content: String,
}

fn message_schema() -> String {
    schema::MESSAGE.to_string()
}

impl Default for Message {
    fn default() -> Self {
        Self {
            schema: message_schema(),
            uuid: None,
            title: None,
            content: String::new(),
        }
    }
}

impl Message {
    /// A message with `content`.
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
            ..Default::default()
        }
    }

    /// Trim the title and content.
    pub fn normalize(&mut self) {
        self.schema = message_schema();
        clean(&mut self.title);
        trim(&mut self.content);
    }

    /// Intrinsic rules.
    pub fn validate(&self) -> FieldErrors {
        let mut errs = FieldErrors::new();
        if self.content.trim().is_empty() {
            errs.add("content", REQUIRED);
        }
        errs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_required() {
        let errs = Message::default().validate();
        assert_eq!(errs.message_at("content"), Some("cannot be blank"));
        assert!(Message::new("hello").validate().is_empty());
    }

    #[test]
    fn normalize_trims() {
        let mut m = Message {
            title: Some("  ".into()),
            content: " hello \n".into(),
            ..Default::default()
        };
        m.normalize();
        assert_eq!(m.title, None);
        assert_eq!(m.content, "hello");
    }

    #[test]
    fn parses_with_schema_default() {
        let m: Message = serde_json::from_value(serde_json::json!({"content": "x"})).unwrap();
        assert_eq!(m.schema, schema::MESSAGE);
    }
}
