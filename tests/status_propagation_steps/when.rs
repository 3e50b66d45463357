//! When steps for status propagation BDD scenarios.

use super::world::PropagationWorld;
use rstest_bdd_macros::when;
use serde_json::{Value, json};

fn status_change(entity_type: &str, entity_id: u64, new_status: &str) -> Value {
    json!({
        "data": {
            "entity": { "type": entity_type, "id": entity_id },
            "meta": {
                "type": "attribute_change",
                "attribute_name": "sg_status_list",
                "new_value": new_status
            }
        }
    })
}

#[when(r#"task {task:u64} changes to "{status}""#)]
fn task_changes(
    world: &mut PropagationWorld,
    task: u64,
    status: String,
) -> Result<(), eyre::Report> {
    world.deliver("/task", &status_change("Task", task, &status), true)
}

#[when(r#"version {version:u64} changes to "{status}""#)]
fn version_changes(
    world: &mut PropagationWorld,
    version: u64,
    status: String,
) -> Result<(), eyre::Report> {
    world.deliver("/version", &status_change("Version", version, &status), true)
}

#[when(r#"an unsigned webhook reports task {task:u64} changing to "{status}""#)]
fn unsigned_task_change(
    world: &mut PropagationWorld,
    task: u64,
    status: String,
) -> Result<(), eyre::Report> {
    world.deliver("/task", &status_change("Task", task, &status), false)
}
