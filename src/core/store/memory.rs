//! In-memory stores backed by `DashMap`
//!
//! Used when no `DATABASE_URL` is configured and throughout the tests.
//! Per-key atomicity comes from dashmap's shard locks: the vacant-entry
//! insert enforces username uniqueness and `compare_and_swap` holds the
//! entry lock across the compare and the write.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::{AccountStore, RefreshTokenStore, StoreError};
use crate::core::db::models::{Account, NewAccount, RefreshTokenRecord};

/// Accounts keyed by username
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: DashMap<String, Account>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.accounts.contains_key(username))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.get(username).map(|a| a.clone()))
    }

    async fn save(&self, account: NewAccount) -> Result<Account, StoreError> {
        match self.accounts.entry(account.username.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                let saved = Account {
                    id: Uuid::new_v4(),
                    username: account.username,
                    password_hash: account.password_hash,
                    nickname: account.nickname,
                    role: account.role,
                    created_at: Utc::now(),
                };
                slot.insert(saved.clone());
                Ok(saved)
            }
        }
    }
}

/// Refresh token records keyed by subject
#[derive(Default)]
pub struct MemoryRefreshTokenStore {
    records: DashMap<String, RefreshTokenRecord>,
}

impl MemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn find_by_key(&self, key: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self.records.get(key).map(|r| r.clone()))
    }

    async fn save(&self, record: RefreshTokenRecord) -> Result<RefreshTokenRecord, StoreError> {
        self.records.insert(record.key.clone(), record.clone());
        Ok(record)
    }

    async fn delete_by_key(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.records.remove(key).is_some())
    }

    async fn compare_and_swap(
        &self,
        expected: &str,
        record: RefreshTokenRecord,
    ) -> Result<bool, StoreError> {
        let Some(mut current) = self.records.get_mut(&record.key) else {
            return Ok(false);
        };

        if current.value != expected {
            return Ok(false);
        }

        *current = record;
        Ok(true)
    }
}
