//! Unit tests for the webhook module.

mod route_tests;
