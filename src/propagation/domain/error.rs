//! Error types for propagation domain validation and parsing.

use super::EntityType;
use thiserror::Error;

/// Errors returned while constructing propagation domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PropagationDomainError {
    /// The status code is empty after trimming.
    #[error("status code must not be empty")]
    EmptyStatusCode,

    /// The status code contains whitespace.
    #[error("status code '{0}' must not contain whitespace")]
    InvalidStatusCode(String),

    /// The workflow step name is empty after trimming.
    #[error("workflow step name must not be empty")]
    EmptyStepName,

    /// The entity identifier is zero.
    #[error("entity identifier must be a positive integer")]
    InvalidEntityId,
}

/// Error returned while parsing an entity type name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown entity type: {0}")]
pub struct ParseEntityTypeError(pub String);

/// Errors raised while loading the status mapping document.
///
/// Any of these prevents the process from serving requests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MappingConfigError {
    /// The document could not be read from disk.
    #[error("failed to read status mapping document '{path}': {reason}")]
    Read {
        /// Path of the document.
        path: String,
        /// Underlying I/O failure.
        reason: String,
    },

    /// The document is not well-formed or does not match the schema.
    #[error("malformed status mapping document: {0}")]
    Malformed(String),

    /// A vocabulary entry or rule carries an invalid value.
    #[error("invalid value in {context}: {source}")]
    InvalidValue {
        /// Where in the document the value appeared.
        context: String,
        /// Domain validation failure.
        #[source]
        source: PropagationDomainError,
    },

    /// A status key appears twice in one vocabulary.
    #[error("duplicate {entity_type} status '{status}' in vocabulary")]
    DuplicateStatus {
        /// Vocabulary owner.
        entity_type: EntityType,
        /// Repeated key.
        status: String,
    },

    /// A rule references a status missing from the relevant vocabulary.
    #[error("{context} references undefined {entity_type} status '{status}'")]
    UndefinedStatus {
        /// Rule that carries the reference.
        context: String,
        /// Vocabulary that was consulted.
        entity_type: EntityType,
        /// Missing key.
        status: String,
    },

    /// A mapping rule lists no target statuses.
    #[error("{context} maps status '{status}' to an empty target list")]
    EmptyTargets {
        /// Mapping direction.
        context: String,
        /// Source status with no targets.
        status: String,
    },

    /// A fanout rule lists no sibling steps.
    #[error("step fanout rule for '{0}' has no update_steps")]
    EmptyFanoutSteps(String),

    /// The version-created rule lists no eligible steps.
    #[error("version_created rule has no eligible_steps")]
    EmptyEligibleSteps,
}

impl MappingConfigError {
    /// Wraps a domain validation failure with its document location.
    pub fn invalid_value(context: impl Into<String>, source: PropagationDomainError) -> Self {
        Self::InvalidValue {
            context: context.into(),
            source,
        }
    }
}
