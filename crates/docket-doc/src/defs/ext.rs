//! # Extension Definitions
//!
//! An extension key either enumerates the coded values it accepts or
//! constrains free-form values with an [`ExtPattern`]. Validation of an
//! [`Extensions`] map against a set of definitions yields one of:
//!
//! | failure | message |
//! |---------|---------|
//! | key not defined by any applicable regime/addon | `undefined` |
//! | value outside the enumeration | `code 'x' invalid` |
//! | value failing the pattern | `does not match pattern` |
//! | key demanded by a rule but absent | `required` |

use docket_core::{Extensions, FieldErrors, Key};
use serde::{Deserialize, Serialize};

/// One accepted coded value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDefinition {
    /// The value stored in the extensions map.
    pub code: String,
    /// Short label.
    pub name: String,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl CodeDefinition {
    /// Build a code with its label.
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            desc: None,
        }
    }
}

/// Shape constraint for free-form extension values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtPattern {
    /// ASCII digits only, length within `min..=max`.
    Digits { min: usize, max: usize },
    /// ASCII letters and digits, length within `min..=max`.
    Alphanumeric { min: usize, max: usize },
}

impl ExtPattern {
    /// True if `value` satisfies the pattern.
    pub fn matches(&self, value: &str) -> bool {
        let (min, max, letters) = match *self {
            Self::Digits { min, max } => (min, max, false),
            Self::Alphanumeric { min, max } => (min, max, true),
        };
        let len = value.chars().count();
        len >= min
            && len <= max
            && value.chars().all(|c| {
                c.is_ascii_digit() || (letters && c.is_ascii_alphabetic())
            })
    }
}

/// Definition of one extension key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDef {
    /// Extension key.
    pub key: Key,
    /// Short label.
    pub name: String,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Closed list of accepted codes. Empty means free-form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<CodeDefinition>,
    /// Constraint on free-form values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<ExtPattern>,
}

impl ExtensionDef {
    /// Code definition for `code`, when enumerated.
    pub fn code(&self, code: &str) -> Option<&CodeDefinition> {
        self.values.iter().find(|c| c.code == code)
    }

    /// Check a value, returning the failure message if it is not accepted.
    pub fn check(&self, value: &str) -> Option<String> {
        if !self.values.is_empty() && self.code(value).is_none() {
            return Some(format!("code '{value}' invalid"));
        }
        if let Some(p) = &self.pattern {
            if !p.matches(value) {
                return Some("does not match pattern".to_string());
            }
        }
        None
    }
}

/// Check every entry of `ext` against the definition `lookup` returns
/// for its key.
pub fn validate_extensions<'a>(
    ext: &Extensions,
    lookup: impl Fn(&str) -> Option<&'a ExtensionDef>,
) -> FieldErrors {
    let mut errs = FieldErrors::new();
    for (key, value) in ext.iter() {
        match lookup(key.as_str()) {
            None => errs.add(key.as_str(), "undefined"),
            Some(def) => {
                if let Some(msg) = def.check(value) {
                    errs.add(key.as_str(), msg);
                }
            }
        }
    }
    errs
}

/// Report each of `keys` missing from `ext` as `required`.
pub fn require_extensions(ext: &Extensions, keys: &[&str]) -> FieldErrors {
    let mut errs = FieldErrors::new();
    for key in keys {
        if ext.get(key).is_none() {
            errs.add(*key, "required");
        }
    }
    errs
}

/// Report each of `keys` present in `ext` as `must be blank`.
pub fn exclude_extensions(ext: &Extensions, keys: &[&str]) -> FieldErrors {
    let mut errs = FieldErrors::new();
    for key in keys {
        if ext.get(key).is_some() {
            errs.add(*key, "must be blank");
        }
    }
    errs
}
