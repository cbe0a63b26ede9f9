//! User persistence seam
//!
//! The real document store lives outside this crate. Anything implementing
//! [`UserRepository`] must enforce uniqueness of `username` and `email`.
//! Updates touch a single field atomically; there is no whole-record write,
//! so a slow credential change can never undo a concurrent logout.

mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::User;

pub use memory::InMemoryUserStore;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Duplicate value for unique field: {0}")]
    DuplicateKey(String),

    #[error("Record not found")]
    NotFound,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new record. Fails with `DuplicateKey` on a taken username or email.
    async fn insert(&self, user: User) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Record matching `username`, else the record matching `email`
    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError>;

    /// Overwrite the stored credential hash, leaving every other field alone
    async fn set_password(&self, id: Uuid, password_hash: String) -> Result<(), StoreError>;

    /// Overwrite (or clear) the single stored refresh token. Last write wins.
    async fn set_refresh_token(&self, id: Uuid, token: Option<String>) -> Result<(), StoreError>;
}
