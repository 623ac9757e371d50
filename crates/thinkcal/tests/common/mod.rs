//! Shared test utilities for thinkcal integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring an in-memory database, a scripted generator and
//!   the report service together
//! - Builders for harnesses and seeded reports
//! - Collaborator doubles that fail on demand

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::*;
