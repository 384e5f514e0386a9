//! JWT authentication
//!
//! Tokens come from the identity provider; this service validates HS256
//! signatures against the shared secret and exposes the learner as a
//! [`UserContext`] request extension.

pub mod middleware;
pub mod models;

pub use middleware::{auth_middleware, AuthState};
pub use models::{JwtClaims, UserContext};
