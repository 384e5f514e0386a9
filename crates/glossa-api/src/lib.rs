//! Glossa API Library
//!
//! This crate provides the HTTP API handlers, middleware, domain services,
//! and application setup for the glossa learning engine.

// Module declarations
mod api_doc;
pub mod constants;
mod handlers;
mod middleware;
mod telemetry;
mod utils;

// Public modules
pub mod auth;
pub mod error;
pub mod ingestion;
pub mod services;
pub mod setup;
pub mod state;

// Re-exports
pub use error::ErrorResponse;
pub use ingestion::{IngestionJob, IngestionQueue};
pub use state::AppState;
