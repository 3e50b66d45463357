//! Transport adapters for the webhook pipeline.
//!
//! # Available Adapters
//!
//! - [`http::router`]: `axum` router serving webhooks on any `POST` path and
//!   liveness on `GET /healthz`

pub mod http;
