//! Data models for the application
//!
//! This module contains all data structures used throughout the application,
//! organized by domain. Each sub-module represents a specific feature area.

mod chat;
mod flashcard;
mod material;
mod quiz;
mod subscription;

// Re-export all models for convenient imports
pub use chat::*;
pub use flashcard::*;
pub use material::*;
pub use quiz::*;
pub use subscription::*;
