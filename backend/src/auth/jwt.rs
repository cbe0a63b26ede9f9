//! JWT token generation and validation
//!
//! Handles creation and verification of access and refresh tokens. Each kind
//! has its own secret and lifetime.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT-related errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    Encoding(String),

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token expired")]
    Expired,
}

/// Token type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Secret and lifetime for one token kind
#[derive(Clone)]
pub struct TokenSettings {
    secret: String,
    ttl: Duration,
}

impl TokenSettings {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"****")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Signing material for both token kinds
#[derive(Debug, Clone)]
pub struct TokenConfig {
    access: TokenSettings,
    refresh: TokenSettings,
}

impl TokenConfig {
    pub fn new(access: TokenSettings, refresh: TokenSettings) -> Self {
        Self { access, refresh }
    }

    fn settings(&self, kind: TokenKind) -> &TokenSettings {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn secret(&self, kind: TokenKind) -> &str {
        &self.settings(kind).secret
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.settings(kind).ttl
    }

    /// True when one secret signs both token kinds
    pub fn shares_secret(&self) -> bool {
        self.access.secret == self.refresh.secret
    }
}

/// Identity snapshot embedded in every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject (user ID)
    pub subject_id: String,
    pub email: String,
    pub username: String,
    pub display_name: String,
}

/// Wire payload: identity plus timestamps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(flatten)]
    pub claims: Claims,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Issue a token of `kind` that expires `ttl(kind)` from now
pub fn issue(kind: TokenKind, claims: &Claims, config: &TokenConfig) -> Result<String, JwtError> {
    issue_at(kind, claims, config, Utc::now())
}

/// Issue a token as if the clock read `now`
pub fn issue_at(
    kind: TokenKind,
    claims: &Claims,
    config: &TokenConfig,
    now: DateTime<Utc>,
) -> Result<String, JwtError> {
    let iat = now.timestamp();
    let payload = TokenClaims {
        claims: claims.clone(),
        iat,
        exp: iat + config.ttl(kind).num_seconds(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &payload,
        &EncodingKey::from_secret(config.secret(kind).as_bytes()),
    )
    .map_err(|e| JwtError::Encoding(e.to_string()))
}

/// Verify a token of `kind` and return the identity it carries
pub fn verify(kind: TokenKind, token: &str, config: &TokenConfig) -> Result<Claims, JwtError> {
    decode_token(kind, token, config).map(|payload| payload.claims)
}

/// Verify a token of `kind` and return the full payload, timestamps included
pub fn decode_token(
    kind: TokenKind,
    token: &str,
    config: &TokenConfig,
) -> Result<TokenClaims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;

    decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(config.secret(kind).as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(classify)
}

fn classify(err: jsonwebtoken::errors::Error) -> JwtError {
    match err.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::MissingRequiredClaim(_) => JwtError::Malformed(err.to_string()),
        _ => JwtError::Invalid(err.to_string()),
    }
}
