//! In-process user store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, UserRepository};
use crate::models::{normalize_key, User};

/// `HashMap` behind a tokio `RwLock`; every mutation holds the write lock
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

fn check_unique(users: &HashMap<Uuid, User>, candidate: &User) -> Result<(), StoreError> {
    for existing in users.values().filter(|u| u.id != candidate.id) {
        if existing.username == candidate.username {
            return Err(StoreError::DuplicateKey("username".to_string()));
        }
        if existing.email == candidate.email {
            return Err(StoreError::DuplicateKey("email".to_string()));
        }
    }
    Ok(())
}

#[async_trait]
impl UserRepository for InMemoryUserStore {
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(StoreError::DuplicateKey("id".to_string()));
        }
        check_unique(&users, &user)?;

        users.insert(user.id, user.clone());
        tracing::debug!(user_id = %user.id, "User inserted");
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError> {
        let username = username.map(normalize_key);
        let email = email.map(normalize_key);

        let users = self.users.read().await;
        let by_username = username
            .as_deref()
            .and_then(|name| users.values().find(|u| u.username == name));
        let by_email = || {
            email
                .as_deref()
                .and_then(|addr| users.values().find(|u| u.email == addr))
        };

        Ok(by_username.or_else(by_email).cloned())
    }

    async fn set_password(&self, id: Uuid, password_hash: String) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.password = password_hash;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<String>) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.refresh_token = token;
        user.updated_at = Utc::now();
        Ok(())
    }
}
