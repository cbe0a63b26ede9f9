//! Health check endpoint

use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::response::ApiResponse;

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// GET /health
pub async fn health_check() -> Response {
    ApiResponse::new(
        200,
        HealthResponse {
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
    .into_response()
}
