//! # Keys and Codes
//!
//! Two string newtypes used across the rule definitions and documents.
//!
//! - [`Key`]: a lowercase slug (`credit-note`, `it-sdi-retained`,
//!   `reverse-charge`). Letters, digits, `-` and `+`; must start and end
//!   with an alphanumeric.
//! - [`Code`]: an externally defined identifier (`IRPEF`, `001`, `TD01`).
//!   Alphanumeric runs separated by at most one of `.`, `-`, `/`, ` `, `_`.
//!
//! Deserialization accepts any string; shape checks are reported by the
//! validator so the failure lands on a field path.

use serde::{Deserialize, Serialize};

/// A lowercase slug identifying a concept.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Wrap a string without checking its shape.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if the key is a well-formed slug.
    pub fn is_valid(&self) -> bool {
        let b = self.0.as_bytes();
        let edge = |c: &u8| c.is_ascii_lowercase() || c.is_ascii_digit();
        match b {
            [] => false,
            [c] => c.is_ascii_lowercase(),
            [first, middle @ .., last] => {
                edge(first)
                    && edge(last)
                    && middle
                        .iter()
                        .all(|c| edge(c) || *c == b'-' || *c == b'+')
            }
        }
    }

    /// True if this key equals any of `others`.
    pub fn is_in(&self, others: &[Key]) -> bool {
        others.iter().any(|k| k == self)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for Key {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Key {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// An externally defined code.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    /// Wrap a string without checking its shape.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The code text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty code.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Clean free text into a code: trim, drop characters that are neither
    /// alphanumeric nor separators, and collapse separator runs to the
    /// first separator.
    pub fn normalize(s: &str) -> Self {
        let mut out = String::with_capacity(s.len());
        let mut after_sep = false;
        for c in s.trim().chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c);
                after_sep = false;
            } else if matches!(c, '.' | '-' | '/' | ' ' | '_') && !after_sep {
                out.push(c);
                after_sep = true;
            }
        }
        Self(out)
    }

    /// Upper-case alphanumeric form: every other character removed.
    pub fn normalize_alphanumeric(s: &str) -> Self {
        Self(
            s.chars()
                .filter(char::is_ascii_alphanumeric)
                .map(|c| c.to_ascii_uppercase())
                .collect(),
        )
    }

    /// True if the code is alphanumeric runs joined by single separators.
    pub fn is_valid(&self) -> bool {
        let b = self.0.as_bytes();
        if b.is_empty() {
            return false;
        }
        let sep = |c: u8| matches!(c, b'.' | b'-' | b'/' | b' ' | b'_');
        let mut prev_sep = true;
        for &c in b {
            if sep(c) {
                if prev_sep {
                    return false;
                }
                prev_sep = true;
            } else if c.is_ascii_alphanumeric() {
                prev_sep = false;
            } else {
                return false;
            }
        }
        !prev_sep
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Code {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Code {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<&str> for Code {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
