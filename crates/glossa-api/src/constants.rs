//! API constants
//!
//! All learner-facing routes are versioned under [`API_PREFIX`]. Handler
//! `utoipa` annotations spell the same prefix out as literals, so the served
//! OpenAPI spec and the mounted routes always agree.

/// API base path prefix (version-independent)
pub const API_BASE: &str = "/api";

/// Current API version segment
pub const API_VERSION: &str = "v1";

/// Versioned prefix for all protected routes
pub const API_PREFIX: &str = "/api/v1";
