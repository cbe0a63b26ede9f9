//! User record
//!
//! The store owns persistence; this type owns the credential and token
//! behaviour that runs against a record before it is handed over.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{jwt, Claims, JwtError, PasswordError, PasswordHasher, TokenConfig, TokenKind};

/// Fields supplied when creating an account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub password: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
}

/// User model
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    /// Trimmed and lowercased
    pub username: String,
    /// Trimmed and lowercased
    pub email: String,
    pub fullname: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    /// bcrypt hash once prepared for persistence
    pub password: String,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build an unsaved record. `password` still holds the plaintext until
    /// [`User::prepare_for_persistence`] runs.
    pub fn new(input: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: normalize_key(&input.username),
            email: normalize_key(&input.email),
            fullname: input.fullname.trim().to_string(),
            avatar: input.avatar,
            cover_image: input.cover_image,
            password: input.password,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Hash the credential if it changed since the record was last persisted.
    ///
    /// With `credential_changed == false` the stored hash is left untouched.
    pub async fn prepare_for_persistence(
        &mut self,
        credential_changed: bool,
        hasher: &PasswordHasher,
    ) -> Result<(), PasswordError> {
        if credential_changed {
            self.password = hasher.hash(&self.password).await?;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replace the credential with a new plaintext; the caller must then
    /// prepare with `credential_changed = true`.
    pub fn set_password(&mut self, plaintext: impl Into<String>) {
        self.password = plaintext.into();
    }

    pub async fn is_password_correct(
        &self,
        candidate: &str,
        hasher: &PasswordHasher,
    ) -> Result<bool, PasswordError> {
        hasher.verify(candidate, &self.password).await
    }

    /// Identity snapshot embedded in tokens
    pub fn claims(&self) -> Claims {
        Claims {
            subject_id: self.id.to_string(),
            email: self.email.clone(),
            username: self.username.clone(),
            display_name: self.fullname.clone(),
        }
    }

    pub fn generate_access_token(&self, config: &TokenConfig) -> Result<String, JwtError> {
        jwt::issue(TokenKind::Access, &self.claims(), config)
    }

    pub fn generate_refresh_token(&self, config: &TokenConfig) -> Result<String, JwtError> {
        jwt::issue(TokenKind::Refresh, &self.claims(), config)
    }
}

/// Lookup keys are stored trimmed and lowercased
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// User response (sanitized for API)
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            fullname: user.fullname.clone(),
            avatar: user.avatar.clone(),
            cover_image: user.cover_image.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenSettings;
    use chrono::Duration;

    fn new_user() -> User {
        User::new(NewUser {
            username: "  Ada ".to_string(),
            email: "ADA@Example.com ".to_string(),
            fullname: " Ada Lovelace ".to_string(),
            password: "analytical-engine".to_string(),
            avatar: None,
            cover_image: None,
        })
    }

    #[test]
    fn test_new_user_normalizes_fields() {
        let user = new_user();
        assert_eq!(user.username, "ada");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.fullname, "Ada Lovelace");
        assert!(user.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_prepare_hashes_changed_credential() {
        let hasher = PasswordHasher::new(4);
        let mut user = new_user();

        user.prepare_for_persistence(true, &hasher).await.unwrap();

        assert_ne!(user.password, "analytical-engine");
        assert!(user.is_password_correct("analytical-engine", &hasher).await.unwrap());
        assert!(!user.is_password_correct("difference-engine", &hasher).await.unwrap());
    }

    #[tokio::test]
    async fn test_resave_without_change_keeps_hash() {
        let hasher = PasswordHasher::new(4);
        let mut user = new_user();
        user.prepare_for_persistence(true, &hasher).await.unwrap();
        let stored = user.password.clone();

        user.fullname = "Augusta Ada King".to_string();
        user.prepare_for_persistence(false, &hasher).await.unwrap();
        user.prepare_for_persistence(false, &hasher).await.unwrap();

        assert_eq!(user.password.as_bytes(), stored.as_bytes());
    }

    #[tokio::test]
    async fn test_password_change_rehashes() {
        let hasher = PasswordHasher::new(4);
        let mut user = new_user();
        user.prepare_for_persistence(true, &hasher).await.unwrap();
        let old_hash = user.password.clone();

        user.set_password("new-secret");
        user.prepare_for_persistence(true, &hasher).await.unwrap();

        assert_ne!(user.password, old_hash);
        assert!(user.is_password_correct("new-secret", &hasher).await.unwrap());
    }

    #[test]
    fn test_tokens_carry_record_snapshot() {
        let config = TokenConfig::new(
            TokenSettings::new("a", Duration::minutes(5)),
            TokenSettings::new("r", Duration::days(1)),
        );
        let user = new_user();

        let access = user.generate_access_token(&config).unwrap();
        let refresh = user.generate_refresh_token(&config).unwrap();

        let claims = jwt::verify(TokenKind::Access, &access, &config).unwrap();
        assert_eq!(claims.subject_id, user.id.to_string());
        assert_eq!(claims.display_name, "Ada Lovelace");
        assert_eq!(jwt::verify(TokenKind::Refresh, &refresh, &config).unwrap(), claims);
    }

    #[test]
    fn test_response_hides_secrets() {
        let mut user = new_user();
        user.refresh_token = Some("stored-refresh".to_string());

        let body = serde_json::to_string(&UserResponse::from(&user)).unwrap();
        assert!(!body.contains("analytical-engine"));
        assert!(!body.contains("stored-refresh"));
        assert!(body.contains("coverImage"));
    }
}
