//! Best-effort execution of propagation instructions.
//!
//! Instructions run in order. Each one is independent: a failed read or write
//! is recorded in the [`DispatchReport`] and the next instruction still runs.
//! Already-applied writes are never rolled back.

use crate::propagation::{
    domain::{
        DispatchReport, EntityId, EntityRef, EntityType, InstructionOutcome, InstructionTarget,
        OutcomeKind, PropagationInstruction, StatusCode, StepName,
    },
    ports::{TrackerError, TrackerResult, TrackingService},
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Executes instructions against a [`TrackingService`].
#[derive(Debug)]
pub struct PropagationDispatcher<T>
where
    T: TrackingService,
{
    tracker: Arc<T>,
    timeout: Option<Duration>,
}

impl<T> Clone for PropagationDispatcher<T>
where
    T: TrackingService,
{
    fn clone(&self) -> Self {
        Self {
            tracker: Arc::clone(&self.tracker),
            timeout: self.timeout,
        }
    }
}

impl<T> PropagationDispatcher<T>
where
    T: TrackingService,
{
    /// Creates a dispatcher with no overall deadline.
    #[must_use]
    pub const fn new(tracker: Arc<T>) -> Self {
        Self {
            tracker,
            timeout: None,
        }
    }

    /// Bounds each batch to `timeout`.
    ///
    /// Once the budget is spent, remaining instructions are reported as
    /// [`OutcomeKind::NotAttempted`] and a tracker call still in flight is
    /// reported as failed.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Executes `instructions` in order and reports every outcome.
    pub async fn dispatch(&self, instructions: &[PropagationInstruction]) -> DispatchReport {
        let deadline = self.timeout.map(|budget| Instant::now() + budget);
        let mut report = DispatchReport::new();

        for (index, instruction) in instructions.iter().enumerate() {
            if is_expired(deadline) {
                tracing::warn!(
                    instruction = index,
                    status = %instruction.status(),
                    "dispatch deadline passed; instruction not attempted"
                );
                report.record(InstructionOutcome::new(
                    index,
                    single_entity(instruction),
                    instruction.status().clone(),
                    OutcomeKind::NotAttempted,
                ));
                continue;
            }

            match instruction.target() {
                InstructionTarget::Entity { entity } => {
                    let kind = self.apply_to_entity(*entity, instruction, deadline).await;
                    report.record(InstructionOutcome::new(
                        index,
                        Some(*entity),
                        instruction.status().clone(),
                        kind,
                    ));
                }
                InstructionTarget::StepTasks {
                    shot,
                    steps,
                    exclude,
                } => {
                    let scope = StepScope {
                        shot: *shot,
                        steps,
                        exclude: *exclude,
                    };
                    self.apply_to_step_tasks(index, instruction, &scope, deadline, &mut report)
                        .await;
                }
            }
        }

        let summary = report.summary();
        tracing::info!(
            applied = summary.applied,
            already_satisfied = summary.already_satisfied,
            target_missing = summary.target_missing,
            failed = summary.failed,
            not_attempted = summary.not_attempted,
            "dispatched propagation batch"
        );
        report
    }

    async fn apply_to_entity(
        &self,
        entity: EntityRef,
        instruction: &PropagationInstruction,
        deadline: Option<Instant>,
    ) -> OutcomeKind {
        let current = match bounded(deadline, self.tracker.find_entity(entity)).await {
            Ok(Some(found)) => found.status().cloned(),
            Ok(None) => {
                tracing::warn!(%entity, "propagation target not found");
                return OutcomeKind::TargetMissing;
            }
            Err(err) => {
                tracing::warn!(%entity, error = %err, "failed to read propagation target");
                return OutcomeKind::Failed {
                    error: err.to_string(),
                };
            }
        };

        match current {
            Some(status) if instruction.is_satisfied_by(Some(&status)) => {
                tracing::info!(%entity, current = %status, "target already satisfies rule");
                OutcomeKind::AlreadySatisfied { current: status }
            }
            previous => {
                self.write(entity, instruction.status(), previous, deadline)
                    .await
            }
        }
    }

    async fn apply_to_step_tasks(
        &self,
        index: usize,
        instruction: &PropagationInstruction,
        scope: &StepScope<'_>,
        deadline: Option<Instant>,
        report: &mut DispatchReport,
    ) {
        let status = instruction.status();
        let tasks =
            match bounded(deadline, self.tracker.find_step_tasks(scope.shot, scope.steps)).await {
                Ok(tasks) => tasks,
                Err(err) => {
                    tracing::warn!(
                        shot = %scope.shot,
                        error = %err,
                        "failed to search sibling step tasks"
                    );
                    report.record(InstructionOutcome::new(
                        index,
                        None,
                        status.clone(),
                        OutcomeKind::Failed {
                            error: err.to_string(),
                        },
                    ));
                    return;
                }
            };

        let siblings = tasks.into_iter().filter(|task| {
            let entity = task.entity();
            entity.entity_type() == EntityType::Task && Some(entity.id()) != scope.exclude
        });
        for task in siblings {
            let entity = task.entity();
            let kind = if is_expired(deadline) {
                OutcomeKind::NotAttempted
            } else {
                match task.status() {
                    Some(current) if instruction.is_satisfied_by(Some(current)) => {
                        OutcomeKind::AlreadySatisfied {
                            current: current.clone(),
                        }
                    }
                    previous => {
                        self.write(entity, status, previous.cloned(), deadline)
                            .await
                    }
                }
            };
            report.record(InstructionOutcome::new(
                index,
                Some(entity),
                status.clone(),
                kind,
            ));
        }
    }

    async fn write(
        &self,
        entity: EntityRef,
        status: &StatusCode,
        previous: Option<StatusCode>,
        deadline: Option<Instant>,
    ) -> OutcomeKind {
        match bounded(deadline, self.tracker.update_status(entity, status)).await {
            Ok(()) => {
                tracing::info!(
                    %entity,
                    from = previous.as_ref().map_or("-", StatusCode::as_str),
                    to = %status,
                    "applied status"
                );
                OutcomeKind::Applied { previous }
            }
            Err(err) => {
                tracing::warn!(%entity, to = %status, error = %err, "status update failed");
                OutcomeKind::Failed {
                    error: err.to_string(),
                }
            }
        }
    }
}

struct StepScope<'a> {
    shot: EntityId,
    steps: &'a [StepName],
    exclude: Option<EntityId>,
}

fn is_expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|at| Instant::now() >= at)
}

const fn single_entity(instruction: &PropagationInstruction) -> Option<EntityRef> {
    match instruction.target() {
        InstructionTarget::Entity { entity } => Some(*entity),
        InstructionTarget::StepTasks { .. } => None,
    }
}

async fn bounded<R>(
    deadline: Option<Instant>,
    call: impl Future<Output = TrackerResult<R>>,
) -> TrackerResult<R> {
    match deadline {
        Some(at) => tokio::time::timeout_at(at, call)
            .await
            .unwrap_or(Err(TrackerError::Timeout)),
        None => call.await,
    }
}
