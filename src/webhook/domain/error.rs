//! Error types for webhook handling.

use crate::propagation::ports::TrackerError;
use thiserror::Error;

/// Signature verification failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthenticationError {
    /// The request carried no signature header.
    #[error("missing webhook signature")]
    MissingSignature,

    /// The signature header is not a hex digest.
    #[error("malformed webhook signature")]
    MalformedSignature,

    /// The digest does not match the body.
    #[error("webhook signature mismatch")]
    SignatureMismatch,

    /// The shared secret cannot key the MAC.
    #[error("invalid webhook secret: {0}")]
    InvalidKey(String),
}

/// Reasons a webhook request is rejected.
#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    /// Signature verification failed.
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    /// The body is not a JSON webhook envelope.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The envelope parsed but a required field is missing or unusable.
    #[error("incomplete payload: {0}")]
    IncompletePayload(String),

    /// The path does not name a known webhook.
    #[error("unknown webhook route '{0}'")]
    UnknownRoute(String),

    /// A tracker read needed for context enrichment failed.
    #[error("tracking service read failed: {0}")]
    UpstreamRead(#[from] TrackerError),
}

impl WebhookError {
    /// Creates a malformed-payload error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload(reason.into())
    }

    /// Creates an incomplete-payload error.
    pub fn incomplete(reason: impl Into<String>) -> Self {
        Self::IncompletePayload(reason.into())
    }

    /// Returns the HTTP status code for this rejection.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Authentication(_) => 401,
            Self::MalformedPayload(_) | Self::IncompletePayload(_) => 400,
            Self::UnknownRoute(_) => 404,
            Self::UpstreamRead(_) => 502,
        }
    }

    /// Returns a stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "unauthorized",
            Self::MalformedPayload(_) | Self::IncompletePayload(_) => "malformed_payload",
            Self::UnknownRoute(_) => "unknown_route",
            Self::UpstreamRead(_) => "upstream_read_failed",
        }
    }
}
