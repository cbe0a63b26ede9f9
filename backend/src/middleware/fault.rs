//! Fault containment
//!
//! [`contain`] turns any failing or panicking handler body into a failure
//! envelope. [`catch_panics`] gives the whole router the same guarantee for
//! code that runs outside a handler body, such as extractors.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;

use crate::error::{ApiError, DEFAULT_ERROR_MESSAGE};

/// Run a handler body and always produce a response.
///
/// `Ok` passes through untouched. `Err` becomes the failure envelope using the
/// fault's status (500 when it carries none) and message; the fault stops here.
pub async fn contain<F, R, E>(operation: F) -> Response
where
    F: Future<Output = Result<R, E>>,
    R: IntoResponse,
    E: Into<ApiError>,
{
    match AssertUnwindSafe(operation).catch_unwind().await {
        Ok(Ok(response)) => response.into_response(),
        Ok(Err(fault)) => {
            let error: ApiError = fault.into();
            tracing::debug!(
                status = error.status_code,
                kind = error.kind.as_str(),
                "Fault contained"
            );
            error.into_response()
        }
        Err(payload) => panic_response(payload),
    }
}

/// Middleware converting a panic anywhere below it into a 500 envelope
pub async fn catch_panics(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            tracing::error!(method = %method, path = %path, "Panic escaped handler");
            panic_response(payload)
        }
    }
}

fn panic_response(payload: Box<dyn Any + Send>) -> Response {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());

    tracing::error!(panic = %detail, "Request handler panicked");
    ApiError::internal(DEFAULT_ERROR_MESSAGE).into_response()
}
