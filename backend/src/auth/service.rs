//! Authentication service
//!
//! Core business logic for password login and token sessions.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewUser, TokenPair, User};
use crate::store::{StoreError, UserRepository};

use super::jwt::{self, JwtError, TokenConfig, TokenKind};
use super::password::{PasswordError, PasswordHasher};

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("User with email or username already exists")]
    UserExists,

    #[error("User does not exist")]
    UserNotFound,

    #[error("Invalid user credentials")]
    InvalidCredentials,

    #[error("Invalid old password")]
    InvalidOldPassword,

    #[error("Invalid access token")]
    InvalidAccessToken,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Refresh token is expired or used")]
    RefreshTokenReused,

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Successful login: the user and a fresh token pair
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub tokens: TokenPair,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    tokens: TokenConfig,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(store: Arc<dyn UserRepository>, hasher: PasswordHasher, tokens: TokenConfig) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    pub fn token_config(&self) -> &TokenConfig {
        &self.tokens
    }

    /// Create an account with a hashed credential
    pub async fn register(&self, input: NewUser) -> Result<User, AuthError> {
        let mut user = User::new(input);
        if user.username.is_empty() || user.email.is_empty() || user.fullname.is_empty() {
            return Err(AuthError::Validation("All fields are required".to_string()));
        }

        let existing = self
            .store
            .find_by_username_or_email(Some(&user.username), Some(&user.email))
            .await?;
        if existing.is_some() {
            return Err(AuthError::UserExists);
        }

        user.prepare_for_persistence(true, &self.hasher).await?;

        let user = self.store.insert(user).await.map_err(|e| match e {
            StoreError::DuplicateKey(_) => AuthError::UserExists,
            other => AuthError::Store(other),
        })?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Check credentials and open a session
    pub async fn login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        password: &str,
    ) -> Result<Session, AuthError> {
        let username = username.filter(|s| !s.trim().is_empty());
        let email = email.filter(|s| !s.trim().is_empty());
        if username.is_none() && email.is_none() {
            return Err(AuthError::Validation(
                "username or email is required".to_string(),
            ));
        }

        let user = self
            .store
            .find_by_username_or_email(username, email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.is_password_correct(password, &self.hasher).await? {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_tokens(&user).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(Session { user, tokens })
    }

    /// Issue a token pair and make its refresh token the user's only valid one
    pub async fn issue_tokens(&self, user: &User) -> Result<TokenPair, AuthError> {
        let access_token = user.generate_access_token(&self.tokens)?;
        let refresh_token = user.generate_refresh_token(&self.tokens)?;

        self.store
            .set_refresh_token(user.id, Some(refresh_token.clone()))
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// Requests that read the stored token before either has rotated it both
    /// succeed, and the store keeps whichever pair was written last. A token
    /// presented after its rotation has completed is refused.
    pub async fn refresh_tokens(&self, incoming: &str) -> Result<TokenPair, AuthError> {
        let claims = jwt::verify(TokenKind::Refresh, incoming, &self.tokens)?;
        let user_id =
            Uuid::parse_str(&claims.subject_id).map_err(|_| AuthError::InvalidRefreshToken)?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        // Only the most recently issued refresh token is accepted.
        if user.refresh_token.as_deref() != Some(incoming) {
            tracing::warn!(user_id = %user.id, "Superseded refresh token presented");
            return Err(AuthError::RefreshTokenReused);
        }

        let tokens = self.issue_tokens(&user).await?;
        tracing::debug!(user_id = %user.id, "Tokens refreshed");
        Ok(tokens)
    }

    /// Clear the stored refresh token (logout)
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.store
            .set_refresh_token(user_id, None)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AuthError::InvalidAccessToken,
                other => AuthError::Store(other),
            })?;

        tracing::info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    /// Load the account behind a verified access token
    pub async fn current_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidAccessToken)
    }

    /// Replace the credential after checking the current one
    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let mut user = self.current_user(user_id).await?;

        if !user.is_password_correct(old_password, &self.hasher).await? {
            return Err(AuthError::InvalidOldPassword);
        }

        user.set_password(new_password);
        user.prepare_for_persistence(true, &self.hasher).await?;

        // Only the hash is written back; the refresh token read above may be stale by now.
        self.store.set_password(user_id, user.password).await?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenSettings;
    use crate::store::InMemoryUserStore;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use tokio::sync::Barrier;

    fn tokens() -> TokenConfig {
        TokenConfig::new(
            TokenSettings::new("access-secret", Duration::minutes(15)),
            TokenSettings::new("refresh-secret", Duration::days(10)),
        )
    }

    fn service() -> (AuthService, InMemoryUserStore) {
        let store = InMemoryUserStore::new();
        let service = AuthService::new(Arc::new(store.clone()), PasswordHasher::new(4), tokens());
        (service, store)
    }

    /// Holds every `find_by_id` until `readers` calls are waiting, so their
    /// reads all land before any of them writes.
    struct LockstepReads {
        inner: InMemoryUserStore,
        gate: Barrier,
    }

    impl LockstepReads {
        fn new(inner: InMemoryUserStore, readers: usize) -> Self {
            Self {
                inner,
                gate: Barrier::new(readers),
            }
        }
    }

    #[async_trait]
    impl UserRepository for LockstepReads {
        async fn insert(&self, user: User) -> Result<User, StoreError> {
            self.inner.insert(user).await
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            let found = self.inner.find_by_id(id).await;
            self.gate.wait().await;
            found
        }

        async fn find_by_username_or_email(
            &self,
            username: Option<&str>,
            email: Option<&str>,
        ) -> Result<Option<User>, StoreError> {
            self.inner.find_by_username_or_email(username, email).await
        }

        async fn set_password(&self, id: Uuid, password_hash: String) -> Result<(), StoreError> {
            self.inner.set_password(id, password_hash).await
        }

        async fn set_refresh_token(&self, id: Uuid, token: Option<String>) -> Result<(), StoreError> {
            self.inner.set_refresh_token(id, token).await
        }
    }

    fn ada() -> NewUser {
        NewUser {
            username: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            fullname: "Ada Lovelace".to_string(),
            password: "analytical-engine".to_string(),
            avatar: None,
            cover_image: None,
        }
    }

    #[tokio::test]
    async fn test_register_stores_hash_not_plaintext() {
        let (service, store) = service();
        let user = service.register(ada()).await.unwrap();

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_ne!(stored.password, "analytical-engine");
        assert!(stored.password.starts_with("$2"));
    }

    #[tokio::test]
    async fn test_register_duplicate() {
        let (service, _) = service();
        service.register(ada()).await.unwrap();

        let mut again = ada();
        again.username = "someone-else".to_string();
        assert!(matches!(
            service.register(again).await,
            Err(AuthError::UserExists)
        ));
    }

    #[tokio::test]
    async fn test_register_requires_fields() {
        let (service, _) = service();
        let mut input = ada();
        input.fullname = "   ".to_string();
        assert!(matches!(
            service.register(input).await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_login_by_username_or_email() {
        let (service, store) = service();
        service.register(ada()).await.unwrap();

        let by_name = service
            .login(Some("ada"), None, "analytical-engine")
            .await
            .unwrap();
        let by_email = service
            .login(None, Some("ADA@example.com"), "analytical-engine")
            .await
            .unwrap();
        assert_eq!(by_name.user.id, by_email.user.id);

        let stored = store.find_by_id(by_email.user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token, Some(by_email.tokens.refresh_token));
    }

    #[tokio::test]
    async fn test_login_prefers_username_when_keys_disagree() {
        let (service, _) = service();
        let first = service.register(ada()).await.unwrap();
        let mut grace = ada();
        grace.username = "grace".to_string();
        grace.email = "grace@example.com".to_string();
        grace.password = "cobol".to_string();
        service.register(grace).await.unwrap();

        let session = service
            .login(Some("ada"), Some("grace@example.com"), "analytical-engine")
            .await
            .unwrap();
        assert_eq!(session.user.id, first.id);
    }

    #[tokio::test]
    async fn test_login_failures() {
        let (service, _) = service();
        service.register(ada()).await.unwrap();

        assert!(matches!(
            service.login(None, Some(""), "x").await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            service.login(Some("grace"), None, "x").await,
            Err(AuthError::UserNotFound)
        ));
        assert!(matches!(
            service.login(Some("ada"), None, "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates_stored_token() {
        let (service, store) = service();
        let user = service.register(ada()).await.unwrap();

        // Backdate the first pair so the reissued one differs.
        let earlier = Utc::now() - Duration::minutes(1);
        let first = jwt::issue_at(
            TokenKind::Refresh,
            &user.claims(),
            service.token_config(),
            earlier,
        )
        .unwrap();
        store
            .set_refresh_token(user.id, Some(first.clone()))
            .await
            .unwrap();

        let second = service.refresh_tokens(&first).await.unwrap();
        assert_ne!(second.refresh_token, first);

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some(second.refresh_token.as_str()));

        assert!(matches!(
            service.refresh_tokens(&first).await,
            Err(AuthError::RefreshTokenReused)
        ));
    }

    #[tokio::test]
    async fn test_overlapping_refreshes_both_succeed() {
        let store = InMemoryUserStore::new();
        let service = AuthService::new(
            Arc::new(LockstepReads::new(store.clone(), 2)),
            PasswordHasher::new(4),
            tokens(),
        );
        let user = store.insert(User::new(ada())).await.unwrap();

        let earlier = Utc::now() - Duration::minutes(1);
        let first = jwt::issue_at(
            TokenKind::Refresh,
            &user.claims(),
            service.token_config(),
            earlier,
        )
        .unwrap();
        store
            .set_refresh_token(user.id, Some(first.clone()))
            .await
            .unwrap();

        let (a, b) = tokio::join!(service.refresh_tokens(&first), service.refresh_tokens(&first));
        let a = a.unwrap();
        let b = b.unwrap();

        let stored = store
            .find_by_id(user.id)
            .await
            .unwrap()
            .unwrap()
            .refresh_token
            .unwrap();
        assert!(stored == a.refresh_token || stored == b.refresh_token);
        assert_ne!(stored, first);

        // Once both rotations have landed the original token is spent.
        let plain = AuthService::new(Arc::new(store.clone()), PasswordHasher::new(4), tokens());
        assert!(matches!(
            plain.refresh_tokens(&first).await,
            Err(AuthError::RefreshTokenReused)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let (service, _) = service();
        service.register(ada()).await.unwrap();
        let session = service
            .login(Some("ada"), None, "analytical-engine")
            .await
            .unwrap();

        assert!(matches!(
            service.refresh_tokens(&session.tokens.access_token).await,
            Err(AuthError::Token(JwtError::Invalid(_)))
        ));
    }

    #[tokio::test]
    async fn test_logout_clears_refresh_token() {
        let (service, store) = service();
        service.register(ada()).await.unwrap();
        let session = service
            .login(Some("ada"), None, "analytical-engine")
            .await
            .unwrap();

        service.logout(session.user.id).await.unwrap();

        let stored = store.find_by_id(session.user.id).await.unwrap().unwrap();
        assert!(stored.refresh_token.is_none());
        assert!(matches!(
            service.refresh_tokens(&session.tokens.refresh_token).await,
            Err(AuthError::RefreshTokenReused)
        ));
    }

    #[tokio::test]
    async fn test_change_password() {
        let (service, _) = service();
        let user = service.register(ada()).await.unwrap();

        assert!(matches!(
            service.change_password(user.id, "wrong", "new-secret").await,
            Err(AuthError::InvalidOldPassword)
        ));

        service
            .change_password(user.id, "analytical-engine", "new-secret")
            .await
            .unwrap();

        assert!(service.login(Some("ada"), None, "new-secret").await.is_ok());
        assert!(matches!(
            service.login(Some("ada"), None, "analytical-engine").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_logout_during_password_change_stays_logged_out() {
        let (service, store) = service();
        service.register(ada()).await.unwrap();
        let session = service
            .login(Some("ada"), None, "analytical-engine")
            .await
            .unwrap();
        let user_id = session.user.id;

        // The logout lands while the password change is still hashing.
        let (changed, logged_out) = tokio::join!(
            service.change_password(user_id, "analytical-engine", "difference-engine"),
            service.logout(user_id),
        );
        changed.unwrap();
        logged_out.unwrap();

        let stored = store.find_by_id(user_id).await.unwrap().unwrap();
        assert!(stored.refresh_token.is_none());
        assert!(matches!(
            service.refresh_tokens(&session.tokens.refresh_token).await,
            Err(AuthError::RefreshTokenReused)
        ));
        assert!(service
            .login(Some("ada"), None, "difference-engine")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_current_user_missing() {
        let (service, _) = service();
        assert!(matches!(
            service.current_user(Uuid::new_v4()).await,
            Err(AuthError::InvalidAccessToken)
        ));
    }
}
