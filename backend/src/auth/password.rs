//! Password hashing
//!
//! bcrypt with a configurable cost. The async entry points run on tokio's
//! blocking pool so a login never stalls unrelated requests.

use thiserror::Error;

/// Work factor used when none is configured.
pub const DEFAULT_COST: u32 = 10;

/// Errors raised by the credential hasher
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("Hashing worker failed: {0}")]
    Worker(String),
}

/// Salted one-way hasher for user credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash on the calling thread. Every call draws a fresh salt.
    pub fn hash_blocking(&self, plaintext: &str) -> Result<String, PasswordError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    /// Compare on the calling thread.
    ///
    /// A mismatch is `Ok(false)`; only an unparseable `hashed` value is an error.
    pub fn verify_blocking(&self, plaintext: &str, hashed: &str) -> Result<bool, PasswordError> {
        bcrypt::verify(plaintext, hashed).map_err(|e| PasswordError::MalformedHash(e.to_string()))
    }

    /// Hash a credential on the blocking pool
    pub async fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let hasher = *self;
        let plaintext = plaintext.to_owned();

        tokio::task::spawn_blocking(move || hasher.hash_blocking(&plaintext))
            .await
            .map_err(|e| PasswordError::Worker(e.to_string()))?
    }

    /// Verify a credential against a stored hash on the blocking pool
    pub async fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool, PasswordError> {
        let hasher = *self;
        let plaintext = plaintext.to_owned();
        let hashed = hashed.to_owned();

        tokio::task::spawn_blocking(move || hasher.verify_blocking(&plaintext, &hashed))
            .await
            .map_err(|e| PasswordError::Worker(e.to_string()))?
    }
}
