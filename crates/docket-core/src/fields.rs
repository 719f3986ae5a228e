//! # Field Errors
//!
//! A recursive map from field-path segment to either a leaf message or a
//! nested map. Validation functions return a `FieldErrors` and compose by
//! nesting the child result under the field name that led to it.
//!
//! ## Rendering
//!
//! `Display` produces the compact form used in CLI and bulk messages:
//!
//! ```text
//! doc: (totals: cannot be blank.); head: cannot be blank.
//! ```
//!
//! Keys are sorted, nested trees are wrapped in parentheses, and every
//! level ends with a period.
//!
//! ## Serde
//!
//! Serializes as plain JSON: `{"doc": {"totals": "cannot be blank"}}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One entry in a [`FieldErrors`] tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldError {
    /// A leaf failure message.
    Message(String),
    /// Failures inside a nested structure.
    Nested(FieldErrors),
}

/// A recursive tree of field-level validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, FieldError>);

impl FieldErrors {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree holding a single leaf message.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errs = Self::new();
        errs.add(field, message);
        errs
    }

    /// True when no failure has been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of direct entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Record a leaf message against `field`.
    ///
    /// A leaf replaces any nested errors already recorded for the field: a
    /// structural failure of the parent makes the children irrelevant. An
    /// earlier leaf is kept.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        match self.0.get(&field) {
            Some(FieldError::Message(_)) => {}
            _ => {
                self.0.insert(field, FieldError::Message(message.into()));
            }
        }
    }

    /// Nest `child` under `field`. Empty children are ignored.
    pub fn nest(&mut self, field: impl Into<String>, child: FieldErrors) {
        if child.is_empty() {
            return;
        }
        let field = field.into();
        match self.0.get_mut(&field) {
            Some(FieldError::Message(_)) => {}
            Some(FieldError::Nested(existing)) => existing.merge(child),
            None => {
                self.0.insert(field, FieldError::Nested(child));
            }
        }
    }

    /// Deep-merge another tree into this one.
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, entry) in other.0 {
            match entry {
                FieldError::Message(m) => self.add(field, m),
                FieldError::Nested(n) => self.nest(field, n),
            }
        }
    }

    /// Wrap this tree under a single field.
    pub fn prefixed(self, field: impl Into<String>) -> FieldErrors {
        let mut out = FieldErrors::new();
        out.nest(field, self);
        out
    }

    /// Convert into `Ok(())` when empty.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Direct entry for a field.
    pub fn entry(&self, field: &str) -> Option<&FieldError> {
        self.0.get(field)
    }

    /// Leaf message at a dotted path such as `lines.0.taxes.1.ext.it-sdi-retained`.
    pub fn message_at(&self, path: &str) -> Option<&str> {
        let mut current = self;
        let mut segments = path.split('.').peekable();
        while let Some(seg) = segments.next() {
            match current.0.get(seg)? {
                FieldError::Message(m) if segments.peek().is_none() => return Some(m),
                FieldError::Message(_) => return None,
                FieldError::Nested(n) => current = n,
            }
        }
        None
    }

    /// Flatten into `(dotted.path, message)` pairs in key order.
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        for (field, entry) in &self.0 {
            let path = if prefix.is_empty() {
                field.clone()
            } else {
                format!("{prefix}.{field}")
            };
            match entry {
                FieldError::Message(m) => out.push((path, m.clone())),
                FieldError::Nested(n) => n.flatten_into(&path, out),
            }
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        for (i, (field, entry)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            match entry {
                FieldError::Message(m) => write!(f, "{field}: {m}")?,
                FieldError::Nested(n) => write!(f, "{field}: ({n})")?,
            }
        }
        f.write_str(".")
    }
}

impl std::error::Error for FieldErrors {}
