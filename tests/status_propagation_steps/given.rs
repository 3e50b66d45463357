//! Given steps for status propagation BDD scenarios.

use super::world::{PropagationWorld, entity_id, status_code};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use statusflow::propagation::{
    domain::{EntityRef, StepName},
    ports::TrackedEntity,
};

#[given(r#"a shot {shot:u64} with status "{status}""#)]
fn a_shot_with_status(
    world: &mut PropagationWorld,
    shot: u64,
    status: String,
) -> Result<(), eyre::Report> {
    let entity = TrackedEntity::new(EntityRef::shot(entity_id(shot)?))
        .with_status(status_code(&status)?);
    world.tracker.insert(entity).wrap_err("seed shot")?;
    Ok(())
}

#[given(r#"a "{step}" task {task:u64} on shot {shot:u64} with status "{status}""#)]
fn a_task_on_shot(
    world: &mut PropagationWorld,
    step: String,
    task: u64,
    shot: u64,
    status: String,
) -> Result<(), eyre::Report> {
    let entity = TrackedEntity::new(EntityRef::task(entity_id(task)?))
        .with_status(status_code(&status)?)
        .with_step(StepName::new(step)?)
        .with_shot(entity_id(shot)?);
    world.tracker.insert(entity).wrap_err("seed task")?;
    Ok(())
}

#[given("version {version:u64} linked to task {task:u64}")]
fn version_linked_to_task(
    world: &mut PropagationWorld,
    version: u64,
    task: u64,
) -> Result<(), eyre::Report> {
    let entity = TrackedEntity::new(EntityRef::version(entity_id(version)?))
        .with_status(status_code("rev")?)
        .with_task(entity_id(task)?);
    world.tracker.insert(entity).wrap_err("seed version")?;
    Ok(())
}

#[given("writes to shot {shot:u64} fail")]
fn writes_to_shot_fail(world: &mut PropagationWorld, shot: u64) -> Result<(), eyre::Report> {
    world
        .tracker
        .fail_writes_for(EntityRef::shot(entity_id(shot)?))
        .wrap_err("configure failing writes")?;
    Ok(())
}
