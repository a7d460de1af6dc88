//! Refresh token repository for PostgreSQL
//!
//! One row per subject key in `refresh_tokens`. Rotation goes through a
//! conditional `UPDATE` so the compare and the write happen in one statement.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::db::models::RefreshTokenRecord;
use crate::core::store::{RefreshTokenStore, StoreError};

/// Refresh token repository for database operations
#[derive(Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    /// Create a new refresh token repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn find_by_key(&self, key: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT key, value
            FROM refresh_tokens
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn save(&self, record: RefreshTokenRecord) -> Result<RefreshTokenRecord, StoreError> {
        let saved = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            INSERT INTO refresh_tokens (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            RETURNING key, value
            "#,
        )
        .bind(&record.key)
        .bind(&record.value)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }

    async fn delete_by_key(&self, key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn compare_and_swap(
        &self,
        expected: &str,
        record: RefreshTokenRecord,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET value = $3
            WHERE key = $1 AND value = $2
            "#,
        )
        .bind(&record.key)
        .bind(expected)
        .bind(&record.value)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
