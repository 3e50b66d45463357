//! Step definitions for status propagation scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
