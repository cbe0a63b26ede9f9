//! Centralized API error handling for SessionKit
//!
//! Every fault that reaches a client does so as an [`ApiError`], rendered as
//! the failure envelope `{statusCode, message, errors, success: false}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{AuthError, JwtError, PasswordError};
use crate::store::StoreError;

/// Message used when a fault carries none
pub const DEFAULT_ERROR_MESSAGE: &str = "Something went wrong";

/// Classification of a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotFound,
    DuplicateKey,
    Authentication,
    TokenMalformed,
    TokenInvalid,
    TokenExpired,
    MalformedHash,
    Internal,
}

impl ErrorKind {
    /// Get the error code string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::DuplicateKey => "DUPLICATE_KEY",
            ErrorKind::Authentication => "AUTHENTICATION_ERROR",
            ErrorKind::TokenMalformed => "TOKEN_MALFORMED",
            ErrorKind::TokenInvalid => "TOKEN_INVALID",
            ErrorKind::TokenExpired => "TOKEN_EXPIRED",
            ErrorKind::MalformedHash => "MALFORMED_HASH",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }

    /// Default HTTP status for this kind
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::DuplicateKey => 409,
            ErrorKind::Authentication
            | ErrorKind::TokenMalformed
            | ErrorKind::TokenInvalid
            | ErrorKind::TokenExpired => 401,
            ErrorKind::MalformedHash | ErrorKind::Internal => 500,
        }
    }
}

/// One entry of the envelope's `errors` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubError {
    pub field: String,
    pub code: String,
    pub message: String,
}

/// API error carrying everything the failure envelope needs
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub status_code: u16,
    pub message: String,
    pub errors: Vec<SubError>,
    pub stack: Option<String>,
}

/// JSON failure envelope
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope<'a> {
    pub status_code: u16,
    pub message: &'a str,
    pub errors: &'a [SubError],
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<&'a str>,
}

impl ApiError {
    /// Error of `kind` with that kind's default status
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind,
            status_code: kind.status_code(),
            message: if message.is_empty() {
                DEFAULT_ERROR_MESSAGE.to_string()
            } else {
                message
            },
            errors: Vec::new(),
            stack: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateKey, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Override the carried status code
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_errors(mut self, errors: Vec<SubError>) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// HTTP status to put on the wire
    pub fn http_status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Failure envelope view. `success` is false whatever the status code says.
    pub fn envelope(&self) -> ErrorEnvelope<'_> {
        ErrorEnvelope {
            status_code: self.status_code,
            message: &self.message,
            errors: &self.errors,
            success: false,
            stack: self.stack.as_deref(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let code = self.kind.as_str();

        if status.is_server_error() {
            tracing::error!(error = %self.message, code = %code, "Server error occurred");
        } else {
            tracing::debug!(error = %self.message, code = %code, "Client error occurred");
        }

        (status, Json(self.envelope())).into_response()
    }
}

// Convenience conversions from common error types

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Malformed(_) => ApiError::new(ErrorKind::TokenMalformed, "Malformed token"),
            JwtError::Invalid(_) => ApiError::new(ErrorKind::TokenInvalid, "Invalid token"),
            JwtError::Expired => ApiError::new(ErrorKind::TokenExpired, "Token expired"),
            JwtError::Encoding(detail) => ApiError::internal(detail),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::MalformedHash(_) => {
                ApiError::new(ErrorKind::MalformedHash, "Stored credential is corrupt")
            }
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(_) => ApiError::conflict(err.to_string()),
            StoreError::NotFound => ApiError::not_found(err.to_string()),
            StoreError::Unavailable(_) => ApiError::internal(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(_) | AuthError::InvalidOldPassword => {
                ApiError::validation(err.to_string())
            }
            AuthError::UserExists => ApiError::conflict(err.to_string()),
            AuthError::UserNotFound => ApiError::not_found(err.to_string()),
            AuthError::InvalidCredentials
            | AuthError::InvalidAccessToken
            | AuthError::InvalidRefreshToken
            | AuthError::RefreshTokenReused => ApiError::unauthorized(err.to_string()),
            AuthError::Token(e) => e.into(),
            AuthError::Password(e) => e.into(),
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors: Vec<SubError> = err
            .field_errors()
            .into_iter()
            .flat_map(|(field, failures)| {
                failures.iter().map(move |failure| SubError {
                    field: field.to_string(),
                    code: failure.code.to_string(),
                    message: failure
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field)),
                })
            })
            .collect();
        errors.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::validation("Validation failed").with_errors(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::validation(err.body_text()).with_status_code(err.status().as_u16())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::internal(err.to_string())
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;
