//! Account repository for PostgreSQL
//!
//! Implements [`AccountStore`] on the `members` table. Username uniqueness is
//! enforced by the table's `UNIQUE` constraint, so a racing signup surfaces
//! as [`StoreError::Conflict`].

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::db::models::{Account, NewAccount};
use crate::core::store::{AccountStore, StoreError};

/// Account repository for database operations
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Create a new account repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM members WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists.0)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, password_hash, nickname, role, created_at
            FROM members
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn save(&self, account: NewAccount) -> Result<Account, StoreError> {
        let saved = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO members (id, username, password_hash, nickname, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, password_hash, nickname, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(&account.nickname)
        .bind(account.role)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }
}
