//! RowRefly fixtures - file-boundary loaders
//!
//! Reads the on-disk inputs of a validation run:
//! - Schema files (table → rules), split column schemas and lookup overrides
//! - Expected fixture documents per table
//! - Scenario files
//!
//! Everything is loaded eagerly so the [`SchemaRegistry`](rowrefly_core::SchemaRegistry)
//! is complete before any table is validated.

pub mod error;
pub mod expected;
pub mod project;
pub mod scenarios;
pub mod schemas;

pub use error::FixtureError;
pub use expected::load_expected;
pub use project::Project;
pub use scenarios::{load_scenarios, parse_scenarios};
pub use schemas::load_registry;
