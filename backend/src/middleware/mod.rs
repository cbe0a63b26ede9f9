//! Middleware for SessionKit API
//!
//! This module provides fault containment, request tracing, security headers,
//! and access-token authentication.

pub mod auth;
pub mod fault;
mod security;
mod tracing;

pub use auth::AuthenticatedUser;
pub use fault::{catch_panics, contain};
pub use security::{hsts_header, security_headers};
pub use tracing::request_tracing;
