//! Then steps for status propagation BDD scenarios.

use super::world::{PropagationWorld, entity_id, status_code};
use rstest_bdd_macros::then;
use statusflow::propagation::domain::EntityRef;

#[then("the response status is {status:u16}")]
fn response_status_is(world: &PropagationWorld, status: u16) -> Result<(), eyre::Report> {
    let response = world.response()?;
    if response.status() != status {
        return Err(eyre::eyre!(
            "expected status {status}, got {} with body {}",
            response.status(),
            response.body()
        ));
    }
    Ok(())
}

fn assert_status(
    world: &PropagationWorld,
    entity: EntityRef,
    expected: &str,
) -> Result<(), eyre::Report> {
    let current = world
        .tracker
        .status_of(entity)
        .map_err(|err| eyre::eyre!("status lookup failed: {err}"))?;
    if current != Some(status_code(expected)?) {
        return Err(eyre::eyre!("expected {entity} at '{expected}', found {current:?}"));
    }
    Ok(())
}

#[then(r#"shot {shot:u64} has status "{status}""#)]
fn shot_has_status(world: &PropagationWorld, shot: u64, status: String) -> Result<(), eyre::Report> {
    assert_status(world, EntityRef::shot(entity_id(shot)?), &status)
}

#[then(r#"task {task:u64} has status "{status}""#)]
fn task_has_status(world: &PropagationWorld, task: u64, status: String) -> Result<(), eyre::Report> {
    assert_status(world, EntityRef::task(entity_id(task)?), &status)
}

fn summary_count(world: &PropagationWorld, field: &str) -> Result<u64, eyre::Report> {
    world.response()?.body()["summary"][field]
        .as_u64()
        .ok_or_else(|| eyre::eyre!("response has no summary.{field}"))
}

#[then("{count:u64} updates were applied")]
fn updates_applied(world: &PropagationWorld, count: u64) -> Result<(), eyre::Report> {
    let applied = summary_count(world, "applied")?;
    if applied != count {
        return Err(eyre::eyre!("expected {count} applied updates, found {applied}"));
    }
    Ok(())
}

#[then("{count:u64} updates failed")]
fn updates_failed(world: &PropagationWorld, count: u64) -> Result<(), eyre::Report> {
    let failed = summary_count(world, "failed")?;
    if failed != count {
        return Err(eyre::eyre!("expected {count} failed updates, found {failed}"));
    }
    Ok(())
}

#[then("{count:u64} instructions were resolved")]
fn instructions_resolved(world: &PropagationWorld, count: u64) -> Result<(), eyre::Report> {
    let resolved = world.response()?.body()["instructions"].as_u64();
    if resolved != Some(count) {
        return Err(eyre::eyre!("expected {count} instructions, found {resolved:?}"));
    }
    Ok(())
}

#[then("the tracker was never called")]
fn tracker_never_called(world: &PropagationWorld) -> Result<(), eyre::Report> {
    let calls = world
        .tracker
        .call_count()
        .map_err(|err| eyre::eyre!("call count failed: {err}"))?;
    if calls != 0 {
        return Err(eyre::eyre!("expected no tracker calls, found {calls}"));
    }
    Ok(())
}
