//! Status codes and per-entity-type vocabularies.

use super::PropagationDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Short status key such as `ip`, `apv`, or `stcomp`.
///
/// Keys are case-sensitive; each entity type owns an independent
/// vocabulary, so the same key may carry different meanings on tasks and
/// shots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StatusCode(String);

impl StatusCode {
    /// Creates a validated status code.
    ///
    /// # Errors
    ///
    /// Returns [`PropagationDomainError::EmptyStatusCode`] when the value is
    /// empty after trimming, or [`PropagationDomainError::InvalidStatusCode`]
    /// when it contains interior whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, PropagationDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PropagationDomainError::EmptyStatusCode);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(PropagationDomainError::InvalidStatusCode(raw));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the status code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StatusCode {
    type Error = PropagationDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StatusCode> for String {
    fn from(value: StatusCode) -> Self {
        value.0
    }
}

impl AsRef<str> for StatusCode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Vocabulary entry pairing a status key with its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDefinition {
    key: StatusCode,
    label: String,
}

impl StatusDefinition {
    /// Creates a vocabulary entry.
    #[must_use]
    pub fn new(key: StatusCode, label: impl Into<String>) -> Self {
        Self {
            key,
            label: label.into(),
        }
    }

    /// Returns the status key.
    #[must_use]
    pub const fn key(&self) -> &StatusCode {
        &self.key
    }

    /// Returns the human-readable label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Finite, ordered set of valid statuses for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusVocabulary {
    entries: Vec<StatusDefinition>,
}

impl StatusVocabulary {
    /// Builds a vocabulary, returning the first repeated key on conflict.
    ///
    /// # Errors
    ///
    /// Returns the duplicated [`StatusCode`] when two entries share a key.
    pub fn new(entries: Vec<StatusDefinition>) -> Result<Self, StatusCode> {
        for (index, entry) in entries.iter().enumerate() {
            let repeated = entries
                .iter()
                .skip(index + 1)
                .any(|other| other.key == entry.key);
            if repeated {
                return Err(entry.key.clone());
            }
        }
        Ok(Self { entries })
    }

    /// Returns `true` when `status` belongs to the vocabulary.
    #[must_use]
    pub fn contains(&self, status: &StatusCode) -> bool {
        self.entries.iter().any(|entry| entry.key == *status)
    }

    /// Returns the label for `status`, if defined.
    #[must_use]
    pub fn label(&self, status: &StatusCode) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.key == *status)
            .map(StatusDefinition::label)
    }

    /// Returns the entries in document order.
    #[must_use]
    pub fn entries(&self) -> &[StatusDefinition] {
        &self.entries
    }

    /// Returns the number of statuses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the vocabulary defines no statuses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
