//! Database models for memberauth
//!
//! This module defines the entity structs that map to PostgreSQL tables and
//! the values the in-memory stores keep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Role
// ============================================================================

/// Authority granted to an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

// ============================================================================
// Account Model
// ============================================================================

/// Account entity representing a registered member
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub nickname: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Account data for creation (password_hash must already be hashed)
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub nickname: String,
    pub role: Role,
}

/// Account without sensitive data (for API responses)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub username: String,
    pub nickname: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            nickname: account.nickname,
            role: account.role,
            created_at: account.created_at,
        }
    }
}

// ============================================================================
// Refresh Token Model
// ============================================================================

/// The single live refresh token of a subject
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RefreshTokenRecord {
    /// Subject key (the username)
    pub key: String,
    /// Signed refresh token, compared byte-for-byte on reissue
    pub value: String,
}

impl RefreshTokenRecord {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Copy of this record carrying a rotated token value
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self {
            key: self.key.clone(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_account() -> Account {
        Account {
            id: Uuid::new_v4(),
            username: "tongsin".to_string(),
            password_hash: "$2b$04$abcdefghijklmnopqrstuv".to_string(),
            nickname: "Tong".to_string(),
            role: Role::User,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_default_is_user() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""admin""#);

        let role: Role = serde_json::from_str(r#""admin""#).unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn test_account_serialization_skips_password_hash() {
        let account = sample_account();
        let json = serde_json::to_string(&account).unwrap();

        assert!(json.contains("tongsin"));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("$2b$"));
    }

    #[test]
    fn test_account_response_from_account() {
        let account = sample_account();
        let id = account.id;

        let response: AccountResponse = account.into();

        assert_eq!(response.id, id);
        assert_eq!(response.username, "tongsin");
        assert_eq!(response.nickname, "Tong");
        assert_eq!(response.role, Role::User);
    }

    #[test]
    fn test_refresh_token_record_with_value_keeps_key() {
        let record = RefreshTokenRecord::new("tongsin", "old.token.value");
        let rotated = record.with_value("new.token.value");

        assert_eq!(rotated.key, "tongsin");
        assert_eq!(rotated.value, "new.token.value");
        // the source record is untouched
        assert_eq!(record.value, "old.token.value");
    }
}
