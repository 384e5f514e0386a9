//! Glossa Core Library
//!
//! This crate provides core domain models, error types, configuration, and the
//! pure learning algorithms (spaced repetition, quiz scoring, entitlements)
//! that are shared across all Glossa components.

pub mod config;
pub mod entitlements;
pub mod error;
pub mod models;
pub mod scoring;
pub mod srs;

// Re-export commonly used types
pub use config::Config;
pub use entitlements::Entitlements;
pub use error::{AppError, ErrorMetadata, LogLevel};
