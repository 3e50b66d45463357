//! Tracking-service port used to read hierarchy context and write statuses.

use crate::propagation::domain::{EntityId, EntityRef, StatusCode, StepName};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Result type for tracking-service operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Snapshot of the fields propagation reads from one tracked entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntity {
    entity: EntityRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<StatusCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    step: Option<StepName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shot: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    task: Option<EntityId>,
}

impl TrackedEntity {
    /// Creates a snapshot with no fields populated.
    #[must_use]
    pub const fn new(entity: EntityRef) -> Self {
        Self {
            entity,
            status: None,
            step: None,
            shot: None,
            task: None,
        }
    }

    /// Sets the current status.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the workflow step (tasks only).
    #[must_use]
    pub fn with_step(mut self, step: StepName) -> Self {
        self.step = Some(step);
        self
    }

    /// Sets the owning shot.
    #[must_use]
    pub const fn with_shot(mut self, shot: EntityId) -> Self {
        self.shot = Some(shot);
        self
    }

    /// Sets the linked task (versions only).
    #[must_use]
    pub const fn with_task(mut self, task: EntityId) -> Self {
        self.task = Some(task);
        self
    }

    /// Replaces the current status.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// Returns the entity reference.
    #[must_use]
    pub const fn entity(&self) -> EntityRef {
        self.entity
    }

    /// Returns the current status, if set.
    #[must_use]
    pub const fn status(&self) -> Option<&StatusCode> {
        self.status.as_ref()
    }

    /// Returns the workflow step, if known.
    #[must_use]
    pub const fn step(&self) -> Option<&StepName> {
        self.step.as_ref()
    }

    /// Returns the owning shot, if known.
    #[must_use]
    pub const fn shot(&self) -> Option<EntityId> {
        self.shot
    }

    /// Returns the linked task, if known.
    #[must_use]
    pub const fn task(&self) -> Option<EntityId> {
        self.task
    }
}

/// Read/update contract of the production-tracking service.
#[async_trait]
pub trait TrackingService: Send + Sync {
    /// Fetches one entity.
    ///
    /// Returns `None` when the entity does not exist.
    async fn find_entity(&self, entity: EntityRef) -> TrackerResult<Option<TrackedEntity>>;

    /// Fetches every task on `shot` whose workflow step is in `steps`.
    async fn find_step_tasks(
        &self,
        shot: EntityId,
        steps: &[StepName],
    ) -> TrackerResult<Vec<TrackedEntity>>;

    /// Sets the status field of one entity.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError`] when the tracking service rejects or fails the
    /// write.
    async fn update_status(&self, entity: EntityRef, status: &StatusCode) -> TrackerResult<()>;
}

/// Errors returned by tracking-service adapters.
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    /// The service answered with a non-success HTTP status.
    #[error("tracking service rejected the request with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The call did not complete before its deadline.
    #[error("tracking service call timed out")]
    Timeout,

    /// The response could not be interpreted.
    #[error("invalid tracking service response: {0}")]
    InvalidResponse(String),

    /// Transport or adapter failure.
    #[error("tracking service unavailable: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl TrackerError {
    /// Wraps a transport or adapter failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
