//! Inbound ShotGrid webhooks.
//!
//! Each request is verified against its `X-SG-Signature`, parsed, routed by
//! the last path segment, enriched with tracker context, resolved into
//! propagation instructions, dispatched, and acknowledged with a JSON
//! summary.
//!
//! - Request and response types in [`domain`]
//! - The request pipeline in [`services`]
//! - The `axum` surface in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
