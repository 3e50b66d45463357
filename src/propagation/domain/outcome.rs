//! Per-entity dispatch outcomes and batch reports.

use super::{EntityRef, StatusCode};
use serde::Serialize;

/// What happened to one entity addressed by an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OutcomeKind {
    /// The status was written.
    Applied {
        /// Status before the write, when the tracker reported one.
        #[serde(skip_serializing_if = "Option::is_none")]
        previous: Option<StatusCode>,
    },
    /// The entity already held a satisfying status.
    AlreadySatisfied {
        /// Status found on the entity.
        current: StatusCode,
    },
    /// The target entity does not exist in the tracker.
    TargetMissing,
    /// A tracker call failed.
    Failed {
        /// Rendered tracker error.
        error: String,
    },
    /// The dispatch deadline passed before the instruction ran.
    NotAttempted,
}

/// Outcome of one instruction against one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructionOutcome {
    instruction: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    entity: Option<EntityRef>,
    status: StatusCode,
    #[serde(flatten)]
    kind: OutcomeKind,
}

impl InstructionOutcome {
    /// Creates an outcome for the instruction at index `instruction`.
    ///
    /// `entity` is `None` when the failure happened before a concrete entity
    /// was known, such as a failed step-task search.
    #[must_use]
    pub const fn new(
        instruction: usize,
        entity: Option<EntityRef>,
        status: StatusCode,
        kind: OutcomeKind,
    ) -> Self {
        Self {
            instruction,
            entity,
            status,
            kind,
        }
    }

    /// Returns the index of the originating instruction.
    #[must_use]
    pub const fn instruction(&self) -> usize {
        self.instruction
    }

    /// Returns the affected entity, if one was resolved.
    #[must_use]
    pub const fn entity(&self) -> Option<EntityRef> {
        self.entity
    }

    /// Returns the status the instruction asked for.
    #[must_use]
    pub const fn status(&self) -> &StatusCode {
        &self.status
    }

    /// Returns the outcome kind.
    #[must_use]
    pub const fn kind(&self) -> &OutcomeKind {
        &self.kind
    }
}

/// Aggregate counts over a dispatch report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    /// Entities whose status was written.
    pub applied: usize,
    /// Entities left untouched because they already satisfied the rule.
    pub already_satisfied: usize,
    /// Targets absent from the tracker.
    pub target_missing: usize,
    /// Tracker calls that failed.
    pub failed: usize,
    /// Instructions skipped after the deadline.
    pub not_attempted: usize,
}

impl DispatchSummary {
    /// Returns `true` when nothing failed or was skipped by the deadline.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failed == 0 && self.not_attempted == 0
    }
}

/// Ordered outcomes of one dispatched batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    outcomes: Vec<InstructionOutcome>,
}

impl DispatchReport {
    /// Creates an empty report.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }

    /// Appends an outcome.
    pub fn record(&mut self, outcome: InstructionOutcome) {
        self.outcomes.push(outcome);
    }

    /// Returns outcomes in dispatch order.
    #[must_use]
    pub fn outcomes(&self) -> &[InstructionOutcome] {
        &self.outcomes
    }

    /// Consumes the report, returning its outcomes.
    #[must_use]
    pub fn into_outcomes(self) -> Vec<InstructionOutcome> {
        self.outcomes
    }

    /// Counts outcomes by kind.
    #[must_use]
    pub fn summary(&self) -> DispatchSummary {
        self.outcomes
            .iter()
            .fold(DispatchSummary::default(), |mut summary, outcome| {
                match outcome.kind {
                    OutcomeKind::Applied { .. } => summary.applied += 1,
                    OutcomeKind::AlreadySatisfied { .. } => summary.already_satisfied += 1,
                    OutcomeKind::TargetMissing => summary.target_missing += 1,
                    OutcomeKind::Failed { .. } => summary.failed += 1,
                    OutcomeKind::NotAttempted => summary.not_attempted += 1,
                }
                summary
            })
    }
}
