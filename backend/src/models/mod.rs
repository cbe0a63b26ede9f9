//! Data models for SessionKit backend

pub mod auth;
pub mod user;

pub use auth::*;
pub use user::*;
