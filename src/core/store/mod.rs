//! Storage seams for accounts and refresh tokens
//!
//! The session lifecycle only talks to these traits. Two backends exist:
//! dashmap-backed stores in [`memory`] and sqlx-backed repositories in
//! [`crate::core::db::repositories`].

pub mod memory;

use async_trait::async_trait;

use crate::core::db::models::{Account, NewAccount, RefreshTokenRecord};

pub use memory::{MemoryAccountStore, MemoryRefreshTokenStore};

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key is already taken
    #[error("Record already exists")]
    Conflict,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => StoreError::Conflict,
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

/// Persistence for member accounts
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    /// Insert a new account. Fails with [`StoreError::Conflict`] when the
    /// username is taken, even if a concurrent insert won the race.
    async fn save(&self, account: NewAccount) -> Result<Account, StoreError>;
}

/// Persistence for the one live refresh token per subject
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn find_by_key(&self, key: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Upsert by key
    async fn save(&self, record: RefreshTokenRecord) -> Result<RefreshTokenRecord, StoreError>;

    /// Returns whether a record was removed
    async fn delete_by_key(&self, key: &str) -> Result<bool, StoreError>;

    /// Replace the record for `record.key` only if its current value is
    /// `expected`. Returns false when the record is gone or holds another value.
    async fn compare_and_swap(
        &self,
        expected: &str,
        record: RefreshTokenRecord,
    ) -> Result<bool, StoreError>;
}
