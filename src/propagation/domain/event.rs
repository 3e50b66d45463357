//! Observed status events handed to the rule resolver.
//!
//! Events carry the transition itself plus whatever hierarchy context the
//! webhook handler gathered (step, shot, linked task). Missing context simply
//! disables the rules that need it.

use super::{EntityId, EntityType, StatusCode, StepName};
use serde::{Deserialize, Serialize};

/// Observed change of an entity's status field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    old: Option<StatusCode>,
    new: StatusCode,
}

impl StatusTransition {
    /// Creates a transition; `old` is absent when the field was previously
    /// unset.
    #[must_use]
    pub const fn new(old: Option<StatusCode>, new: StatusCode) -> Self {
        Self { old, new }
    }

    /// Returns the status before the change.
    #[must_use]
    pub const fn old(&self) -> Option<&StatusCode> {
        self.old.as_ref()
    }

    /// Returns the status after the change.
    #[must_use]
    pub const fn new_status(&self) -> &StatusCode {
        &self.new
    }
}

/// Task status change with its step and shot context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatusChange {
    task: EntityId,
    transition: StatusTransition,
    step: Option<StepName>,
    shot: Option<EntityId>,
}

impl TaskStatusChange {
    /// Creates a task status change without hierarchy context.
    #[must_use]
    pub const fn new(task: EntityId, transition: StatusTransition) -> Self {
        Self {
            task,
            transition,
            step: None,
            shot: None,
        }
    }

    /// Sets the workflow step owning the task.
    #[must_use]
    pub fn with_step(mut self, step: StepName) -> Self {
        self.step = Some(step);
        self
    }

    /// Sets the shot the task belongs to.
    #[must_use]
    pub const fn with_shot(mut self, shot: EntityId) -> Self {
        self.shot = Some(shot);
        self
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn task(&self) -> EntityId {
        self.task
    }

    /// Returns the observed transition.
    #[must_use]
    pub const fn transition(&self) -> &StatusTransition {
        &self.transition
    }

    /// Returns the task's workflow step, if known.
    #[must_use]
    pub const fn step(&self) -> Option<&StepName> {
        self.step.as_ref()
    }

    /// Returns the task's shot, if known.
    #[must_use]
    pub const fn shot(&self) -> Option<EntityId> {
        self.shot
    }
}

/// Version status change with its linked task context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionStatusChange {
    version: EntityId,
    transition: StatusTransition,
    task: Option<EntityId>,
    shot: Option<EntityId>,
}

impl VersionStatusChange {
    /// Creates a version status change without hierarchy context.
    #[must_use]
    pub const fn new(version: EntityId, transition: StatusTransition) -> Self {
        Self {
            version,
            transition,
            task: None,
            shot: None,
        }
    }

    /// Sets the task the version was submitted for.
    #[must_use]
    pub const fn with_task(mut self, task: EntityId) -> Self {
        self.task = Some(task);
        self
    }

    /// Sets the shot owning the linked task.
    #[must_use]
    pub const fn with_shot(mut self, shot: EntityId) -> Self {
        self.shot = Some(shot);
        self
    }

    /// Returns the version identifier.
    #[must_use]
    pub const fn version(&self) -> EntityId {
        self.version
    }

    /// Returns the observed transition.
    #[must_use]
    pub const fn transition(&self) -> &StatusTransition {
        &self.transition
    }

    /// Returns the linked task, if known.
    #[must_use]
    pub const fn task(&self) -> Option<EntityId> {
        self.task
    }

    /// Returns the linked task's shot, if known.
    #[must_use]
    pub const fn shot(&self) -> Option<EntityId> {
        self.shot
    }
}

/// Newly created version with the context of its linked task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCreation {
    version: EntityId,
    initial_status: Option<StatusCode>,
    task: Option<EntityId>,
    step: Option<StepName>,
    shot: Option<EntityId>,
}

impl VersionCreation {
    /// Creates a version-created event without context.
    #[must_use]
    pub const fn new(version: EntityId) -> Self {
        Self {
            version,
            initial_status: None,
            task: None,
            step: None,
            shot: None,
        }
    }

    /// Sets the status the version was created with.
    #[must_use]
    pub fn with_initial_status(mut self, status: StatusCode) -> Self {
        self.initial_status = Some(status);
        self
    }

    /// Sets the linked task.
    #[must_use]
    pub const fn with_task(mut self, task: EntityId) -> Self {
        self.task = Some(task);
        self
    }

    /// Sets the workflow step of the linked task.
    #[must_use]
    pub fn with_step(mut self, step: StepName) -> Self {
        self.step = Some(step);
        self
    }

    /// Sets the shot of the linked task.
    #[must_use]
    pub const fn with_shot(mut self, shot: EntityId) -> Self {
        self.shot = Some(shot);
        self
    }

    /// Returns the version identifier.
    #[must_use]
    pub const fn version(&self) -> EntityId {
        self.version
    }

    /// Returns the status the version was created with, if known.
    #[must_use]
    pub const fn initial_status(&self) -> Option<&StatusCode> {
        self.initial_status.as_ref()
    }

    /// Returns the linked task, if known.
    #[must_use]
    pub const fn task(&self) -> Option<EntityId> {
        self.task
    }

    /// Returns the linked task's workflow step, if known.
    #[must_use]
    pub const fn step(&self) -> Option<&StepName> {
        self.step.as_ref()
    }

    /// Returns the linked task's shot, if known.
    #[must_use]
    pub const fn shot(&self) -> Option<EntityId> {
        self.shot
    }
}

/// Any event the resolver understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// A task's status changed.
    TaskStatusChanged(TaskStatusChange),
    /// A version's status changed.
    VersionStatusChanged(VersionStatusChange),
    /// A version was created.
    VersionCreated(VersionCreation),
}

impl StatusEvent {
    /// Returns the type of the entity that emitted the event.
    #[must_use]
    pub const fn source_type(&self) -> EntityType {
        match self {
            Self::TaskStatusChanged(_) => EntityType::Task,
            Self::VersionStatusChanged(_) | Self::VersionCreated(_) => EntityType::Version,
        }
    }

    /// Returns the identifier of the entity that emitted the event.
    #[must_use]
    pub const fn source_id(&self) -> EntityId {
        match self {
            Self::TaskStatusChanged(change) => change.task(),
            Self::VersionStatusChanged(change) => change.version(),
            Self::VersionCreated(created) => created.version(),
        }
    }
}
