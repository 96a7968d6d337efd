//! End-to-End Integration Tests
//!
//! These tests drive the search executor through its public entry point
//! against an in-memory directory tree.

mod common;
mod search_flow;
