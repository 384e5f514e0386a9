//! HTTP handlers
//!
//! Thin translation layer: extract, call the service, shape the response.
//! All domain rules live in `crate::services`.

pub mod cards;
pub mod chat;
pub mod health;
pub mod materials;
pub mod me;
pub mod payments;
pub mod quizzes;
