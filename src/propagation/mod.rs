//! Status propagation across the task, version, and shot hierarchy.
//!
//! A declarative [`domain::StatusMappingTable`] decides which status on one
//! entity type implies which status on a related entity type, plus step
//! fanout rules that advance sibling tasks on the same shot. The module
//! follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Resolution and dispatch services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
