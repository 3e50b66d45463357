//! Acknowledgements, rejections and request stages.

use super::{WebhookError, WebhookRoute};
use crate::propagation::domain::{
    DispatchReport, DispatchSummary, EntityRef, InstructionOutcome, StatusTransition,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;

/// Lifecycle stage of one webhook request.
///
/// `Received → Authenticated → Parsed → Resolved → Dispatched →
/// Acknowledged`; `Rejected` is reachable from `Received`, `Authenticated`
/// and `Parsed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStage {
    /// Body and headers read.
    Received,
    /// Signature verified.
    Authenticated,
    /// Payload parsed and routed.
    Parsed,
    /// Instructions resolved.
    Resolved,
    /// Instructions dispatched.
    Dispatched,
    /// Acknowledgement produced.
    Acknowledged,
    /// Request refused.
    Rejected,
}

impl RequestStage {
    /// Returns the stage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Authenticated => "authenticated",
            Self::Parsed => "parsed",
            Self::Resolved => "resolved",
            Self::Dispatched => "dispatched",
            Self::Acknowledged => "acknowledged",
            Self::Rejected => "rejected",
        }
    }

    /// Returns the last stage reached before `error` rejected the request.
    #[must_use]
    pub const fn rejected_after(error: &WebhookError) -> Self {
        match error {
            WebhookError::Authentication(_) => Self::Received,
            WebhookError::MalformedPayload(_) => Self::Authenticated,
            WebhookError::IncompletePayload(_)
            | WebhookError::UnknownRoute(_)
            | WebhookError::UpstreamRead(_) => Self::Parsed,
        }
    }
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful acknowledgement body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookAck {
    route: WebhookRoute,
    #[serde(skip_serializing_if = "Option::is_none")]
    entity: Option<EntityRef>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    ignored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transition: Option<StatusTransition>,
    instructions: usize,
    outcomes: Vec<InstructionOutcome>,
    summary: DispatchSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    lag_ms: Option<i64>,
}

impl WebhookAck {
    /// Creates an acknowledgement with no propagation.
    #[must_use]
    pub const fn new(route: WebhookRoute) -> Self {
        Self {
            route,
            entity: None,
            ignored: false,
            reason: None,
            note: None,
            transition: None,
            instructions: 0,
            outcomes: Vec::new(),
            summary: DispatchSummary {
                applied: 0,
                already_satisfied: 0,
                target_missing: 0,
                failed: 0,
                not_attempted: 0,
            },
            lag_ms: None,
        }
    }

    /// Creates an acknowledgement for a delivery that was not acted on.
    #[must_use]
    pub fn ignored(route: WebhookRoute, reason: impl Into<String>) -> Self {
        let mut ack = Self::new(route);
        ack.ignored = true;
        ack.reason = Some(reason.into());
        ack
    }

    /// Sets the subject entity.
    #[must_use]
    pub const fn with_entity(mut self, entity: EntityRef) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Sets the reported transition.
    #[must_use]
    pub fn with_transition(mut self, transition: StatusTransition) -> Self {
        self.transition = Some(transition);
        self
    }

    /// Attaches an informational note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Records the dispatch of `instructions` instructions.
    #[must_use]
    pub fn with_dispatch(mut self, instructions: usize, report: DispatchReport) -> Self {
        self.instructions = instructions;
        self.summary = report.summary();
        self.outcomes = report.into_outcomes();
        self
    }

    /// Sets the delivery lag in milliseconds.
    #[must_use]
    pub const fn with_lag_ms(mut self, lag_ms: i64) -> Self {
        self.lag_ms = Some(lag_ms);
        self
    }

    /// Returns the route.
    #[must_use]
    pub const fn route(&self) -> WebhookRoute {
        self.route
    }

    /// Returns the subject entity.
    #[must_use]
    pub const fn entity(&self) -> Option<EntityRef> {
        self.entity
    }

    /// Returns `true` when the delivery was ignored.
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Returns the note, if any.
    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Returns the number of resolved instructions.
    #[must_use]
    pub const fn instructions(&self) -> usize {
        self.instructions
    }

    /// Returns the per-entity outcomes.
    #[must_use]
    pub fn outcomes(&self) -> &[InstructionOutcome] {
        &self.outcomes
    }

    /// Returns the outcome counts.
    #[must_use]
    pub const fn summary(&self) -> DispatchSummary {
        self.summary
    }

    /// Returns the delivery lag, when the payload carried a timestamp.
    #[must_use]
    pub const fn lag_ms(&self) -> Option<i64> {
        self.lag_ms
    }
}

/// Transport-neutral `(status, JSON body)` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    status: u16,
    body: Value,
}

impl WebhookResponse {
    /// Builds a `200` response from an acknowledgement.
    #[must_use]
    pub fn acknowledged(ack: &WebhookAck) -> Self {
        let body = serde_json::to_value(ack).unwrap_or_else(|err| {
            json!({ "route": ack.route(), "error": format!("unserializable acknowledgement: {err}") })
        });
        Self { status: 200, body }
    }

    /// Builds the rejection response for `error`.
    #[must_use]
    pub fn rejected(error: &WebhookError) -> Self {
        Self {
            status: error.http_status(),
            body: json!({
                "error": error.code(),
                "message": error.to_string(),
                "stage": RequestStage::rejected_after(error),
            }),
        }
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns the JSON body.
    #[must_use]
    pub const fn body(&self) -> &Value {
        &self.body
    }

    /// Splits the response into status and body.
    #[must_use]
    pub fn into_parts(self) -> (u16, Value) {
        (self.status, self.body)
    }
}
