//! Port contracts for status propagation.
//!
//! Ports define infrastructure-agnostic interfaces used by propagation
//! services and webhook handlers.

pub mod tracker;

pub use tracker::{TrackedEntity, TrackerError, TrackerResult, TrackingService};
