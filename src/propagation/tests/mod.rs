//! Unit tests for the propagation module.
//!
//! Tests are organised by component: domain values, mapping-table loading,
//! rule resolution, dispatch, and the two tracker adapters.

mod dispatcher_tests;
mod resolver_tests;
