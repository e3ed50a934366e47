//! # API Shared
//!
//! Shared utilities and definitions for the prior-authorization APIs.
//!
//! Contains:
//! - Wire types with OpenAPI schemas (`types` module)
//! - Shared services like `HealthService`
//! - Authentication utilities
//!
//! Used by `api-rest` for common functionality.

pub mod auth;
pub mod health;
pub mod types;

pub use auth::{AuthError, API_KEY_ENV, API_KEY_HEADER};
pub use health::{HealthRes, HealthService};
pub use types::*;
