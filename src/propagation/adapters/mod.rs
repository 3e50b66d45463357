//! Tracking-service adapters for the propagation module.
//!
//! # Available Adapters
//!
//! - [`memory::InMemoryTracker`]: Thread-safe in-memory tracker for tests and
//!   local simulation
//! - [`shotgrid::ShotgridTracker`]: ShotGrid REST API client
//!
//! Both implement the [`TrackingService`] port.
//!
//! [`TrackingService`]: crate::propagation::ports::TrackingService

pub mod memory;
pub mod shotgrid;
