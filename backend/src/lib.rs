//! SessionKit Backend Library
//!
//! Credential hashing, access/refresh token sessions and the response
//! envelopes every endpoint answers with.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;
