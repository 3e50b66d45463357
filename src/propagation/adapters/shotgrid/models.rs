//! ShotGrid REST wire models and their conversion into tracker snapshots.

use crate::propagation::{
    domain::{EntityId, EntityRef, EntityType, StatusCode, StepName},
    ports::{TrackedEntity, TrackerError, TrackerResult},
};
use serde::{Deserialize, Serialize};

/// Response of `POST /api/v1/auth/access_token`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    /// Bearer token.
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

/// Envelope of a single-record read.
#[derive(Debug, Clone, Deserialize)]
pub struct SingleRecordResponse {
    /// The record.
    pub data: EntityRecord,
}

/// Envelope of a search.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordListResponse {
    /// Matching records.
    #[serde(default)]
    pub data: Vec<EntityRecord>,
}

/// One entity record.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityRecord {
    /// ShotGrid entity type name.
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Record identifier.
    pub id: u64,
    /// Scalar fields.
    #[serde(default)]
    pub attributes: RecordAttributes,
    /// Entity link fields.
    #[serde(default)]
    pub relationships: RecordRelationships,
}

/// Scalar fields requested by the adapter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordAttributes {
    /// Status field.
    #[serde(default)]
    pub sg_status_list: Option<String>,
}

/// Link fields requested by the adapter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordRelationships {
    /// Workflow step of a task.
    #[serde(default)]
    pub step: Option<Relationship>,
    /// Parent entity of a task or version.
    #[serde(default)]
    pub entity: Option<Relationship>,
    /// Task linked to a version.
    #[serde(default)]
    pub sg_task: Option<Relationship>,
}

/// A single-entity link.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Relationship {
    /// Linked record, absent when the field is empty.
    #[serde(default)]
    pub data: Option<LinkedRecord>,
}

/// Summary of a linked record.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkedRecord {
    /// ShotGrid entity type name.
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Record identifier.
    pub id: u64,
    /// Display name of the linked record.
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of a status update.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdateBody<'a> {
    /// New status key.
    pub sg_status_list: &'a str,
}

/// Returns the REST collection name for `entity_type`.
#[must_use]
pub const fn collection(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Task => "tasks",
        EntityType::Version => "versions",
        EntityType::Shot => "shots",
    }
}

/// Returns the field list read for `entity_type`.
#[must_use]
pub const fn fields(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Task => "sg_status_list,step,entity",
        EntityType::Version => "sg_status_list,sg_task,entity",
        EntityType::Shot => "sg_status_list",
    }
}

impl TryFrom<EntityRecord> for TrackedEntity {
    type Error = TrackerError;

    fn try_from(record: EntityRecord) -> TrackerResult<Self> {
        let EntityRecord {
            entity_type,
            id,
            attributes,
            relationships,
        } = record;

        let parsed_type = EntityType::try_from(entity_type.as_str())
            .map_err(|err| TrackerError::InvalidResponse(err.to_string()))?;
        let entity_id = parse_id(id)?;
        let mut tracked = Self::new(EntityRef::new(parsed_type, entity_id));

        if let Some(raw) = attributes.sg_status_list.filter(|raw| !raw.trim().is_empty()) {
            let status = StatusCode::new(raw)
                .map_err(|err| TrackerError::InvalidResponse(err.to_string()))?;
            tracked = tracked.with_status(status);
        }

        let step_name = linked(relationships.step.as_ref(), "Step").and_then(|link| link.name.clone());
        if let Some(name) = step_name {
            let step =
                StepName::new(name).map_err(|err| TrackerError::InvalidResponse(err.to_string()))?;
            tracked = tracked.with_step(step);
        }

        if let Some(shot) = linked(relationships.entity.as_ref(), "Shot") {
            tracked = tracked.with_shot(parse_id(shot.id)?);
        }

        if let Some(task) = linked(relationships.sg_task.as_ref(), "Task") {
            tracked = tracked.with_task(parse_id(task.id)?);
        }

        Ok(tracked)
    }
}

fn linked<'a>(relationship: Option<&'a Relationship>, entity_type: &str) -> Option<&'a LinkedRecord> {
    relationship
        .and_then(|link| link.data.as_ref())
        .filter(|record| record.entity_type == entity_type)
}

fn parse_id(raw: u64) -> TrackerResult<EntityId> {
    EntityId::new(raw).map_err(|err| TrackerError::InvalidResponse(err.to_string()))
}
