//! Test helpers for service and handler unit tests
//!
//! In-memory implementations of the store traits plus fixtures for
//! building domain values. No database connection is needed, making
//! them suitable for isolated unit tests in any crate that enables
//! the `test-helpers` feature.

pub mod fixtures;
pub mod mock_stores;

pub use fixtures::*;
pub use mock_stores::*;
