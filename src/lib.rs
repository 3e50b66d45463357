//! Statusflow: ShotGrid webhook status propagation.
//!
//! The crate receives signed ShotGrid webhooks and keeps related entities in
//! step: a version review drives its task, a task drives its shot, and a task
//! reaching a trigger status can advance sibling tasks in other workflow
//! steps. Which status implies which is declared in a YAML mapping document
//! loaded once at startup.
//!
//! # Architecture
//!
//! Statusflow follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (ShotGrid REST, HTTP)
//!
//! # Modules
//!
//! - [`propagation`]: Mapping table, rule resolution, and dispatch
//! - [`webhook`]: Signature checks, payload parsing, and request handling
//! - [`config`]: Process configuration and document loading
//! - [`observability`]: Logging initialisation

pub mod config;
pub mod observability;
pub mod propagation;
pub mod webhook;
