//! Authentication middleware
//!
//! Extractor for access-token verification. Rejections are failure envelopes.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{jwt, AuthService, Claims, TokenKind};
use crate::error::ApiError;

/// Authenticated user extracted from JWT token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub claims: Claims,
}

/// Extractor for authenticated users
///
/// This extractor verifies the access token from the Authorization header.
/// It does not consult the store; handlers needing the live record load it.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(user: AuthenticatedUser) -> impl IntoResponse {
///     format!("Hello, user {}", user.user_id)
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::unauthorized("Unauthorized request"))?;

        let auth_service = Arc::<AuthService>::from_ref(state);

        let claims = jwt::verify(TokenKind::Access, bearer.token(), auth_service.token_config())?;

        let user_id = Uuid::parse_str(&claims.subject_id)
            .map_err(|_| ApiError::unauthorized("Invalid access token"))?;

        Ok(AuthenticatedUser { user_id, claims })
    }
}
