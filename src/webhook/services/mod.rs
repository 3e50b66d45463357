//! Webhook request pipeline.

mod handler;

pub use handler::{WebhookRequest, WebhookService};
