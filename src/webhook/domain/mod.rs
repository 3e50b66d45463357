//! Webhook domain types.

mod error;
mod payload;
mod response;
mod route;
mod signature;

pub use error::{AuthenticationError, WebhookError};
pub use payload::{EntityLink, EventData, EventMeta, NamedLink, STATUS_ATTRIBUTE, WebhookEnvelope};
pub use response::{RequestStage, WebhookAck, WebhookResponse};
pub use route::WebhookRoute;
pub use signature::{SIGNATURE_HEADER, SignatureVerifier};
