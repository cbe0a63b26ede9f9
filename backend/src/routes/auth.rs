//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::auth;
use crate::state::AppState;

/// Create user/session routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/users/register", post(auth::register))
        .route("/api/v1/users/login", post(auth::login))
        .route("/api/v1/users/refresh-token", post(auth::refresh_token))
        .route("/api/v1/users/logout", post(auth::logout))
        .route("/api/v1/users/current-user", get(auth::current_user))
        .route("/api/v1/users/change-password", post(auth::change_password))
}
