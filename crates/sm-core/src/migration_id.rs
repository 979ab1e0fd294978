//! Globally ordered migration identifiers.
//!
//! Ids are either timestamp-prefixed strings (`20260206003331_add_columns`,
//! `20260206003331`) or plain increasing integers (`1`, `2`, `10`). The
//! leading digit run compares by value so that `10` sorts after `9` and
//! `1_x` before both; the remainder compares byte-wise.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A non-empty, totally ordered migration identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MigrationId(String);

impl MigrationId {
    /// Parse an id, rejecting empty or whitespace-bearing input.
    pub fn parse(id: impl Into<String>) -> CoreResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(CoreError::InvalidId {
                id,
                reason: "id must not be empty".to_string(),
            });
        }
        if id.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidId {
                id,
                reason: "id must not contain whitespace".to_string(),
            });
        }
        Ok(Self(id))
    }

    /// Create an id, panicking on invalid input.
    ///
    /// Prefer [`parse`](Self::parse) when handling untrusted input.
    pub fn new(id: impl Into<String>) -> Self {
        match Self::parse(id) {
            Ok(id) => id,
            Err(e) => panic!("{e}"),
        }
    }

    /// Return the underlying id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Split into the significant digits of the leading digit run and the rest.
    fn sort_key(&self) -> (&str, &str) {
        let split = self
            .0
            .bytes()
            .position(|b| !b.is_ascii_digit())
            .unwrap_or(self.0.len());
        let (digits, rest) = self.0.split_at(split);
        (digits.trim_start_matches('0'), rest)
    }
}

impl Ord for MigrationId {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a_digits, a_rest) = self.sort_key();
        let (b_digits, b_rest) = other.sort_key();
        // "007" and "7" share a key; the raw text breaks the tie so the
        // order stays consistent with Eq.
        a_digits
            .len()
            .cmp(&b_digits.len())
            .then_with(|| a_digits.cmp(b_digits))
            .then_with(|| a_rest.cmp(b_rest))
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for MigrationId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'de> Deserialize<'de> for MigrationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // YAML authors often write integer ids unquoted.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        let raw = match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s,
            Raw::Number(n) => n.to_string(),
        };
        MigrationId::parse(raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MigrationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for MigrationId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for MigrationId {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for MigrationId {
    type Error = CoreError;

    fn try_from(s: &str) -> CoreResult<Self> {
        Self::parse(s)
    }
}

impl PartialEq<str> for MigrationId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for MigrationId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
#[path = "migration_id_test.rs"]
mod tests;
