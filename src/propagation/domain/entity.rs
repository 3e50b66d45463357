//! Entity references and workflow step names.

use super::{ParseEntityTypeError, PropagationDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity types participating in status propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    /// Smallest trackable unit of work, owned by a workflow step.
    Task,
    /// Submitted work product linked to a task.
    Version,
    /// Deliverable scope composed of tasks across steps.
    Shot,
}

impl EntityType {
    /// Returns the tracking-service entity name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "Task",
            Self::Version => "Version",
            Self::Shot => "Shot",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for EntityType {
    type Error = ParseEntityTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "task" => Ok(Self::Task),
            "version" => Ok(Self::Version),
            "shot" => Ok(Self::Shot),
            _ => Err(ParseEntityTypeError(value.to_owned())),
        }
    }
}

/// Identifier assigned to an entity by the tracking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a validated entity identifier.
    ///
    /// # Errors
    ///
    /// Returns [`PropagationDomainError::InvalidEntityId`] when `value` is
    /// zero.
    pub const fn new(value: u64) -> Result<Self, PropagationDomainError> {
        if value == 0 {
            return Err(PropagationDomainError::InvalidEntityId);
        }
        Ok(Self(value))
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for EntityId {
    type Error = PropagationDomainError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntityId> for u64 {
    fn from(value: EntityId) -> Self {
        value.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Typed pointer to one tracking-service entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "type")]
    entity_type: EntityType,
    id: EntityId,
}

impl EntityRef {
    /// Creates an entity reference.
    #[must_use]
    pub const fn new(entity_type: EntityType, id: EntityId) -> Self {
        Self { entity_type, id }
    }

    /// Creates a task reference.
    #[must_use]
    pub const fn task(id: EntityId) -> Self {
        Self::new(EntityType::Task, id)
    }

    /// Creates a version reference.
    #[must_use]
    pub const fn version(id: EntityId) -> Self {
        Self::new(EntityType::Version, id)
    }

    /// Creates a shot reference.
    #[must_use]
    pub const fn shot(id: EntityId) -> Self {
        Self::new(EntityType::Shot, id)
    }

    /// Returns the entity type.
    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Returns the entity identifier.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.entity_type, self.id)
    }
}

/// Name of a workflow step such as `Rotoscoping` or `Composite`.
///
/// Step names are compared exactly after trimming; the tracking service
/// treats them as display codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StepName(String);

impl StepName {
    /// Creates a validated step name.
    ///
    /// # Errors
    ///
    /// Returns [`PropagationDomainError::EmptyStepName`] when the value is
    /// empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, PropagationDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PropagationDomainError::EmptyStepName);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the step name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StepName {
    type Error = PropagationDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StepName> for String {
    fn from(value: StepName) -> Self {
        value.0
    }
}

impl AsRef<str> for StepName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
