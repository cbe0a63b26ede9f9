//! Authentication HTTP handlers
//!
//! Every body runs inside [`contain`], so each endpoint answers with an
//! envelope whether it succeeds, fails or panics.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Response,
    Json,
};
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::{contain, AuthenticatedUser};
use crate::models::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RefreshTokenRequest, RegisterRequest,
    UserResponse,
};
use crate::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/users/register - Create an account
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    contain(async move {
        let Json(req) = payload?;
        req.validate()?;

        let user = state.auth_service.register(req.into()).await?;

        Ok::<_, ApiError>(ApiResponse::with_message(
            StatusCode::CREATED.as_u16(),
            UserResponse::from(&user),
            "User registered successfully",
        ))
    })
    .await
}

/// POST /api/v1/users/login - Verify credentials and issue tokens
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    contain(async move {
        let Json(req) = payload?;
        req.validate()?;

        let session = state
            .auth_service
            .login(req.username.as_deref(), req.email.as_deref(), &req.password)
            .await?;

        Ok::<_, ApiError>(ApiResponse::with_message(
            StatusCode::OK.as_u16(),
            LoginResponse {
                user: UserResponse::from(&session.user),
                access_token: session.tokens.access_token,
                refresh_token: session.tokens.refresh_token,
            },
            "User logged in successfully",
        ))
    })
    .await
}

/// POST /api/v1/users/refresh-token - Exchange a refresh token for a new pair
pub async fn refresh_token(
    State(state): State<AppState>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Response {
    contain(async move {
        let Json(req) = payload?;
        let incoming = req
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

        let tokens = state.auth_service.refresh_tokens(&incoming).await?;

        Ok::<_, ApiError>(ApiResponse::with_message(
            StatusCode::OK.as_u16(),
            tokens,
            "Access token refreshed",
        ))
    })
    .await
}

/// POST /api/v1/users/logout - Drop the stored refresh token
pub async fn logout(
    State(state): State<AppState>,
    user: Result<AuthenticatedUser, ApiError>,
) -> Response {
    contain(async move {
        let user = user?;
        state.auth_service.logout(user.user_id).await?;

        Ok::<_, ApiError>(ApiResponse::with_message(
            StatusCode::OK.as_u16(),
            serde_json::json!({}),
            "User logged out",
        ))
    })
    .await
}

/// GET /api/v1/users/current-user - Get current authenticated user
pub async fn current_user(
    State(state): State<AppState>,
    user: Result<AuthenticatedUser, ApiError>,
) -> Response {
    contain(async move {
        let user = user?;
        let record = state.auth_service.current_user(user.user_id).await?;

        Ok::<_, ApiError>(ApiResponse::with_message(
            StatusCode::OK.as_u16(),
            UserResponse::from(&record),
            "User fetched successfully",
        ))
    })
    .await
}

/// POST /api/v1/users/change-password - Replace the credential
pub async fn change_password(
    State(state): State<AppState>,
    user: Result<AuthenticatedUser, ApiError>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Response {
    contain(async move {
        let user = user?;
        let Json(req) = payload?;
        req.validate()?;

        state
            .auth_service
            .change_password(user.user_id, &req.old_password, &req.new_password)
            .await?;

        Ok::<_, ApiError>(ApiResponse::with_message(
            StatusCode::OK.as_u16(),
            serde_json::json!({}),
            "Password changed successfully",
        ))
    })
    .await
}
