//! ShotGrid webhook payload envelope and field extraction.

use super::WebhookError;
use crate::propagation::domain::{EntityId, StatusCode, StatusTransition, StepName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Attribute name of the status field.
pub const STATUS_ATTRIBUTE: &str = "sg_status_list";

/// Top-level webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WebhookEnvelope {
    /// Event body.
    pub data: EventData,
    /// Delivery timestamp (RFC 3339).
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Event body of a delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventData {
    /// Event type such as `Shotgun_Task_Change`.
    #[serde(default)]
    pub event_type: Option<String>,
    /// Entity identifier, when sent flat.
    #[serde(default)]
    pub entity_id: Option<u64>,
    /// Entity link.
    #[serde(default)]
    pub entity: Option<EntityLink>,
    /// Workflow step of a task, when the sender includes it.
    #[serde(default)]
    pub step: Option<NamedLink>,
    /// Shot owning the entity, when the sender includes it.
    #[serde(default)]
    pub shot: Option<EntityLink>,
    /// Task linked to a version, when the sender includes it.
    #[serde(default)]
    pub task: Option<EntityLink>,
    /// Change metadata.
    #[serde(default)]
    pub meta: EventMeta,
}

/// Link to another entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EntityLink {
    /// ShotGrid entity type name.
    #[serde(rename = "type", default)]
    pub entity_type: Option<String>,
    /// Linked identifier.
    #[serde(default)]
    pub id: Option<u64>,
}

/// Link carrying a display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NamedLink {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Attribute-change metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventMeta {
    /// Changed attribute.
    #[serde(default)]
    pub attribute_name: Option<String>,
    /// Entity identifier, as repeated in the metadata.
    #[serde(default)]
    pub entity_id: Option<u64>,
    /// Previous value.
    #[serde(default)]
    pub old_value: Option<String>,
    /// New value: `None` when the key is absent, `Some(None)` when it is
    /// `null` because the status was cleared.
    #[serde(default, deserialize_with = "present")]
    pub new_value: Option<Option<String>>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl WebhookEnvelope {
    /// Parses a raw request body.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::MalformedPayload`] when the body is not a
    /// JSON envelope with a `data` object.
    pub fn from_slice(body: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(body).map_err(|err| WebhookError::malformed(err.to_string()))
    }

    /// Returns the changed attribute, if reported.
    #[must_use]
    pub fn attribute_name(&self) -> Option<&str> {
        self.data.meta.attribute_name.as_deref()
    }

    /// Returns `true` when the delivery reports a status change.
    #[must_use]
    pub fn is_status_change(&self) -> bool {
        self.attribute_name() == Some(STATUS_ATTRIBUTE)
    }

    /// Returns the subject entity id from `data.entity_id`, `data.entity.id`
    /// or `data.meta.entity_id`, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::IncompletePayload`] when none is present or
    /// the id is zero.
    pub fn entity_id(&self) -> Result<EntityId, WebhookError> {
        let raw = self
            .data
            .entity_id
            .or_else(|| self.data.entity.as_ref().and_then(|link| link.id))
            .or(self.data.meta.entity_id)
            .ok_or_else(|| WebhookError::incomplete("payload carries no entity id"))?;
        EntityId::new(raw).map_err(|err| WebhookError::incomplete(err.to_string()))
    }

    /// Returns the reported status transition, or `None` when the new value
    /// is `null` because the status was cleared.
    ///
    /// An unusable old value is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::IncompletePayload`] when the `new_value` key is
    /// missing or holds an invalid status.
    pub fn transition(&self) -> Result<Option<StatusTransition>, WebhookError> {
        let reported = self
            .data
            .meta
            .new_value
            .as_ref()
            .ok_or_else(|| WebhookError::incomplete("payload carries no new status"))?;
        let Some(raw_new) = reported.as_deref() else {
            return Ok(None);
        };
        let new_status = StatusCode::new(raw_new)
            .map_err(|err| WebhookError::incomplete(format!("new status: {err}")))?;
        let old_status = self
            .data
            .meta
            .old_value
            .as_deref()
            .and_then(|raw| StatusCode::new(raw).ok());
        Ok(Some(StatusTransition::new(old_status, new_status)))
    }

    /// Returns the task's workflow step when included in the payload.
    #[must_use]
    pub fn step(&self) -> Option<StepName> {
        self.data
            .step
            .as_ref()
            .and_then(|link| link.name.as_deref())
            .and_then(|name| StepName::new(name).ok())
    }

    /// Returns the owning shot when included in the payload.
    #[must_use]
    pub fn shot(&self) -> Option<EntityId> {
        link_id(self.data.shot.as_ref())
    }

    /// Returns the linked task when included in the payload.
    #[must_use]
    pub fn task(&self) -> Option<EntityId> {
        link_id(self.data.task.as_ref())
    }

    /// Parses the delivery timestamp.
    ///
    /// Returns `None` when absent; an unparseable value is an error string
    /// for logging.
    #[must_use]
    pub fn sent_at(&self) -> Option<Result<DateTime<Utc>, String>> {
        self.timestamp.as_deref().map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|err| format!("bad timestamp '{raw}': {err}"))
        })
    }
}

fn link_id(link: Option<&EntityLink>) -> Option<EntityId> {
    link.and_then(|found| found.id)
        .and_then(|raw| EntityId::new(raw).ok())
}
