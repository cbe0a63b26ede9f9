//! Authentication module for SessionKit
//!
//! - bcrypt credential hashing off the async executor
//! - Access/refresh JWT issuance and verification
//! - Session management with a single stored refresh token per user

pub mod jwt;
pub mod password;
mod service;

pub use jwt::{Claims, JwtError, TokenClaims, TokenConfig, TokenKind, TokenSettings};
pub use password::{PasswordError, PasswordHasher, DEFAULT_COST};
pub use service::{AuthError, AuthService, Session};
