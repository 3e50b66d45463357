//! Tests for rule resolution.

use super::fixtures::{chaining_table, id, status, step, table};
use crate::propagation::{
    domain::{
        EntityRef, EntityType, InstructionReason, InstructionTarget, PropagationInstruction,
        StatusEvent, StatusTransition, TaskStatusChange, VersionCreation, VersionStatusChange,
    },
    services::RuleResolver,
};
use rstest::{fixture, rstest};

#[fixture]
fn resolver() -> RuleResolver {
    RuleResolver::new(table())
}

fn task_change(new: &str, step_name: Option<&str>, shot: Option<u64>) -> TaskStatusChange {
    let mut change = TaskStatusChange::new(id(101), StatusTransition::new(Some(status("ip")), status(new)));
    if let Some(name) = step_name {
        change = change.with_step(step(name));
    }
    if let Some(shot_id) = shot {
        change = change.with_shot(id(shot_id));
    }
    change
}

fn targets_of_type(instructions: &[PropagationInstruction], entity_type: EntityType) -> usize {
    instructions
        .iter()
        .filter(|instruction| {
            matches!(
                instruction.target(),
                InstructionTarget::Entity { entity } if entity.entity_type() == entity_type
            )
        })
        .count()
}

#[rstest]
fn rotoscoping_sent_to_comp_maps_shot_then_fans_out(resolver: RuleResolver) {
    let instructions = resolver.resolve_task_change(&task_change("stcomp", Some("Rotoscoping"), Some(7)));

    let [shot_update, fanout] = instructions.as_slice() else {
        panic!("expected shot mapping and fanout, got {instructions:?}");
    };
    assert_eq!(
        shot_update.target(),
        &InstructionTarget::Entity {
            entity: EntityRef::shot(id(7)),
        }
    );
    assert_eq!(shot_update.status(), &status("ip"));
    assert_eq!(
        fanout.target(),
        &InstructionTarget::StepTasks {
            shot: id(7),
            steps: vec![step("Composite"), step("Secondary Composite")],
            exclude: Some(id(101)),
        }
    );
    assert_eq!(fanout.status(), &status("bfr"));
    assert_eq!(
        fanout.reason(),
        &InstructionReason::StepFanout {
            step: step("Rotoscoping"),
        }
    );
}

#[rstest]
fn fanout_requires_matching_step(resolver: RuleResolver) {
    let instructions = resolver.resolve_task_change(&task_change("stcomp", Some("Composite"), Some(7)));
    assert_eq!(instructions.len(), 1);
    assert_eq!(targets_of_type(&instructions, EntityType::Shot), 1);
}

#[rstest]
fn fanout_requires_trigger_status(resolver: RuleResolver) {
    let instructions = resolver.resolve_task_change(&task_change("ip", Some("Rotoscoping"), Some(7)));
    assert_eq!(instructions.len(), 1);
    assert!(
        instructions
            .iter()
            .all(|instruction| matches!(instruction.target(), InstructionTarget::Entity { .. }))
    );
}

#[rstest]
fn task_change_without_shot_resolves_to_nothing(resolver: RuleResolver) {
    let instructions = resolver.resolve_task_change(&task_change("stcomp", Some("Rotoscoping"), None));
    assert!(instructions.is_empty());
}

#[rstest]
fn shot_instruction_is_satisfied_by_every_candidate(resolver: RuleResolver) {
    let instructions = resolver.resolve_task_change(&task_change("rev", None, Some(7)));
    let [shot_update] = instructions.as_slice() else {
        panic!("expected one shot instruction, got {instructions:?}");
    };
    assert_eq!(shot_update.status(), &status("rev"));
    assert_eq!(shot_update.satisfied_by(), [status("rev"), status("ip")].as_slice());
    assert_eq!(
        shot_update.reason(),
        &InstructionReason::StatusMapping {
            source: EntityType::Task,
            status: status("rev"),
        }
    );
}

#[rstest]
fn version_approval_emits_exactly_one_task_instruction(resolver: RuleResolver) {
    let change = VersionStatusChange::new(id(55), StatusTransition::new(Some(status("rev")), status("apv")))
        .with_task(id(101))
        .with_shot(id(7));
    let instructions = resolver.resolve_version_change(&change);

    assert_eq!(instructions.len(), 1);
    assert_eq!(targets_of_type(&instructions, EntityType::Task), 1);
    assert_eq!(
        instructions.first().map(PropagationInstruction::status),
        Some(&status("apv"))
    );
}

#[rstest]
fn version_change_without_task_resolves_to_nothing(resolver: RuleResolver) {
    let change = VersionStatusChange::new(id(55), StatusTransition::new(None, status("apv")));
    assert!(resolver.resolve_version_change(&change).is_empty());
}

#[rstest]
fn chained_version_change_also_maps_the_shot() {
    let chained = RuleResolver::new(chaining_table());
    let change = VersionStatusChange::new(id(55), StatusTransition::new(None, status("apv")))
        .with_task(id(101))
        .with_shot(id(7));
    let instructions = chained.resolve_version_change(&change);

    assert_eq!(targets_of_type(&instructions, EntityType::Task), 1);
    assert_eq!(targets_of_type(&instructions, EntityType::Shot), 1);
    assert_eq!(
        instructions.last().map(PropagationInstruction::target),
        Some(&InstructionTarget::Entity {
            entity: EntityRef::shot(id(7)),
        })
    );
}

#[rstest]
fn eligible_version_creation_sets_initial_status_then_task(resolver: RuleResolver) {
    let created = VersionCreation::new(id(55))
        .with_task(id(101))
        .with_step(step("Composite"))
        .with_shot(id(7));
    let instructions = resolver.resolve_version_created(&created);

    let [version_update, task_update] = instructions.as_slice() else {
        panic!("expected version and task instructions, got {instructions:?}");
    };
    assert_eq!(version_update.status(), &status("cnv"));
    assert_eq!(version_update.reason(), &InstructionReason::VersionCreated);
    assert_eq!(
        task_update.target(),
        &InstructionTarget::Entity {
            entity: EntityRef::task(id(101)),
        }
    );
    assert_eq!(task_update.status(), &status("cnv"));
}

#[rstest]
#[case(Some("Rotoscoping"))]
#[case(None)]
fn ineligible_version_creation_sets_fallback_status(
    resolver: RuleResolver,
    #[case] step_name: Option<&str>,
) {
    let mut created = VersionCreation::new(id(55)).with_task(id(101));
    if let Some(name) = step_name {
        created = created.with_step(step(name));
    }
    let instructions = resolver.resolve_version_created(&created);

    let [version_update] = instructions.as_slice() else {
        panic!("expected one version instruction, got {instructions:?}");
    };
    assert_eq!(
        version_update.target(),
        &InstructionTarget::Entity {
            entity: EntityRef::version(id(55)),
        }
    );
    assert_eq!(version_update.status(), &status("na"));
}

#[rstest]
fn version_creation_without_rule_is_pass_through() {
    let bare = crate::propagation::domain::StatusMappingTable::from_yaml_str(
        "statuses:\n  task: []\n  version: []\n  shot: []\n",
    )
    .expect("empty mapping should load");
    let passthrough = RuleResolver::new(std::sync::Arc::new(bare));
    let created = VersionCreation::new(id(55)).with_step(step("Composite"));
    assert!(passthrough.resolve_version_created(&created).is_empty());
}

#[rstest]
#[case(StatusEvent::TaskStatusChanged(task_change("wtg", Some("Rotoscoping"), Some(7))))]
#[case(StatusEvent::VersionStatusChanged(
    VersionStatusChange::new(id(55), StatusTransition::new(None, status("na"))).with_task(id(101))
))]
fn unmapped_transitions_resolve_to_nothing(resolver: RuleResolver, #[case] event: StatusEvent) {
    assert!(resolver.resolve(&event).is_empty());
}

#[rstest]
fn resolution_is_deterministic(resolver: RuleResolver) {
    let event = StatusEvent::TaskStatusChanged(task_change("stcomp", Some("Rotoscoping"), Some(7)));
    assert_eq!(resolver.resolve(&event), resolver.resolve(&event));
}
