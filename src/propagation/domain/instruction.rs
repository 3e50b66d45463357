//! Propagation instructions produced by the resolver.

use super::{EntityId, EntityRef, EntityType, StatusCode, StepName};
use serde::Serialize;

/// Entity or entity set an instruction addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstructionTarget {
    /// One known entity.
    Entity {
        /// Target entity.
        entity: EntityRef,
    },
    /// Every task on `shot` whose step is in `steps`, minus `exclude`.
    StepTasks {
        /// Shot owning the tasks.
        shot: EntityId,
        /// Workflow steps whose tasks are updated.
        steps: Vec<StepName>,
        /// Task that triggered the fanout, never updated by it.
        #[serde(skip_serializing_if = "Option::is_none")]
        exclude: Option<EntityId>,
    },
}

/// Why an instruction was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum InstructionReason {
    /// A source-to-target status mapping matched.
    StatusMapping {
        /// Entity type whose status matched.
        source: EntityType,
        /// Matched source status.
        status: StatusCode,
    },
    /// A step fanout rule fired.
    StepFanout {
        /// Step whose rule fired.
        step: StepName,
    },
    /// The version-created rule assigned an initial status.
    VersionCreated,
}

/// Single "set status" order for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropagationInstruction {
    target: InstructionTarget,
    status: StatusCode,
    satisfied_by: Vec<StatusCode>,
    reason: InstructionReason,
}

impl PropagationInstruction {
    /// Creates an instruction whose only satisfying status is `status`.
    #[must_use]
    pub fn new(target: InstructionTarget, status: StatusCode, reason: InstructionReason) -> Self {
        Self {
            satisfied_by: vec![status.clone()],
            target,
            status,
            reason,
        }
    }

    /// Creates an instruction for one entity.
    #[must_use]
    pub fn for_entity(entity: EntityRef, status: StatusCode, reason: InstructionReason) -> Self {
        Self::new(InstructionTarget::Entity { entity }, status, reason)
    }

    /// Replaces the set of statuses that leave a target untouched.
    ///
    /// The instruction's own status is always part of the set.
    #[must_use]
    pub fn with_satisfied_by(mut self, statuses: impl IntoIterator<Item = StatusCode>) -> Self {
        let mut satisfied_by: Vec<StatusCode> = statuses.into_iter().collect();
        if !satisfied_by.contains(&self.status) {
            satisfied_by.insert(0, self.status.clone());
        }
        self.satisfied_by = satisfied_by;
        self
    }

    /// Returns the target.
    #[must_use]
    pub const fn target(&self) -> &InstructionTarget {
        &self.target
    }

    /// Returns the status to apply.
    #[must_use]
    pub const fn status(&self) -> &StatusCode {
        &self.status
    }

    /// Returns the statuses that already satisfy the instruction.
    #[must_use]
    pub fn satisfied_by(&self) -> &[StatusCode] {
        &self.satisfied_by
    }

    /// Returns `true` when an entity in `current` needs no update.
    #[must_use]
    pub fn is_satisfied_by(&self, current: Option<&StatusCode>) -> bool {
        current.is_some_and(|status| self.satisfied_by.contains(status))
    }

    /// Returns the rule that produced the instruction.
    #[must_use]
    pub const fn reason(&self) -> &InstructionReason {
        &self.reason
    }
}
