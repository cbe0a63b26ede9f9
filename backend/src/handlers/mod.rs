//! API handlers for SessionKit backend

pub mod auth;
mod health;

pub use auth::*;
pub use health::health_check;
