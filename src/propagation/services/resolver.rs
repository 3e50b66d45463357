//! Rule resolver translating observed status events into instructions.
//!
//! Resolution is a pure function of the mapping table and the event: the
//! same input always yields the same instructions in the same order, and no
//! tracker is consulted. Anything the table does not explicitly cover
//! resolves to nothing.

use crate::propagation::domain::{
    EntityId, EntityRef, EntityType, InstructionReason, InstructionTarget,
    PropagationInstruction, StatusCode, StatusEvent, StatusMappingTable, TaskStatusChange,
    VersionCreation, VersionStatusChange,
};
use std::sync::Arc;

/// Resolves status events against a shared [`StatusMappingTable`].
#[derive(Debug, Clone)]
pub struct RuleResolver {
    table: Arc<StatusMappingTable>,
}

impl RuleResolver {
    /// Creates a resolver over `table`.
    #[must_use]
    pub const fn new(table: Arc<StatusMappingTable>) -> Self {
        Self { table }
    }

    /// Returns the mapping table.
    #[must_use]
    pub fn table(&self) -> &StatusMappingTable {
        &self.table
    }

    /// Resolves any supported event.
    #[must_use]
    pub fn resolve(&self, event: &StatusEvent) -> Vec<PropagationInstruction> {
        let instructions = match event {
            StatusEvent::TaskStatusChanged(change) => self.resolve_task_change(change),
            StatusEvent::VersionStatusChanged(change) => self.resolve_version_change(change),
            StatusEvent::VersionCreated(created) => self.resolve_version_created(created),
        };
        tracing::debug!(
            source = %EntityRef::new(event.source_type(), event.source_id()),
            instructions = instructions.len(),
            "resolved status event"
        );
        instructions
    }

    /// Resolves a task status change.
    ///
    /// Emits the task-to-shot mapping for the new status when the shot is
    /// known, then the fanout for the task's step when its trigger matches.
    /// Either, both, or neither may fire.
    #[must_use]
    pub fn resolve_task_change(&self, change: &TaskStatusChange) -> Vec<PropagationInstruction> {
        let status = change.transition().new_status();
        let Some(shot) = change.shot() else {
            tracing::debug!(task = %change.task(), "task has no shot; nothing to propagate");
            return Vec::new();
        };

        let mut instructions: Vec<PropagationInstruction> = self
            .mapped_instruction(EntityType::Task, status, EntityRef::shot(shot))
            .into_iter()
            .collect();

        if let Some(step) = change.step()
            && let Some(rule) = self.table.fanout_rule(step)
            && rule.fires_on(status)
        {
            instructions.push(PropagationInstruction::new(
                InstructionTarget::StepTasks {
                    shot,
                    steps: rule.update_steps().to_vec(),
                    exclude: Some(change.task()),
                },
                rule.new_status().clone(),
                InstructionReason::StepFanout { step: step.clone() },
            ));
        }

        instructions
    }

    /// Resolves a version status change onto its linked task.
    ///
    /// Produces at most one task instruction, followed by the task's shot
    /// mapping when the table chains version updates to shots.
    #[must_use]
    pub fn resolve_version_change(
        &self,
        change: &VersionStatusChange,
    ) -> Vec<PropagationInstruction> {
        self.version_to_task(
            change.transition().new_status(),
            change.task(),
            change.shot(),
        )
    }

    /// Resolves a newly created version.
    ///
    /// Without a `version_created` rule this is a pass-through and returns
    /// nothing.
    #[must_use]
    pub fn resolve_version_created(&self, created: &VersionCreation) -> Vec<PropagationInstruction> {
        let Some(rule) = self.table.version_created_rule() else {
            return Vec::new();
        };
        let version = EntityRef::version(created.version());

        if rule.is_eligible(created.step()) {
            let initial = rule.initial_status();
            let mut instructions = vec![PropagationInstruction::for_entity(
                version,
                initial.clone(),
                InstructionReason::VersionCreated,
            )];
            instructions.extend(self.version_to_task(initial, created.task(), created.shot()));
            return instructions;
        }

        rule.ineligible_status()
            .map(|status| {
                PropagationInstruction::for_entity(
                    version,
                    status.clone(),
                    InstructionReason::VersionCreated,
                )
            })
            .into_iter()
            .collect()
    }

    fn version_to_task(
        &self,
        status: &StatusCode,
        task: Option<EntityId>,
        shot: Option<EntityId>,
    ) -> Vec<PropagationInstruction> {
        let Some(task_id) = task else {
            return Vec::new();
        };
        let Some(task_instruction) =
            self.mapped_instruction(EntityType::Version, status, EntityRef::task(task_id))
        else {
            return Vec::new();
        };

        let chained = match shot {
            Some(shot_id) if self.table.chains_version_to_shot() => self.mapped_instruction(
                EntityType::Task,
                task_instruction.status(),
                EntityRef::shot(shot_id),
            ),
            _ => None,
        };

        std::iter::once(task_instruction).chain(chained).collect()
    }

    fn mapped_instruction(
        &self,
        source_type: EntityType,
        status: &StatusCode,
        target: EntityRef,
    ) -> Option<PropagationInstruction> {
        let rule = self.table.rule(source_type, status, target.entity_type())?;
        Some(
            PropagationInstruction::for_entity(
                target,
                rule.preferred().clone(),
                InstructionReason::StatusMapping {
                    source: source_type,
                    status: status.clone(),
                },
            )
            .with_satisfied_by(rule.targets().iter().cloned()),
        )
    }
}
