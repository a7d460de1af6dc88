//! Credential authentication
//!
//! Checks a username/password pair against whatever an [`IdentityProvider`]
//! knows about the account. The only provider today reads the account store;
//! the trait is the seam for others.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::auth::jwt::Claims;
use crate::core::auth::password::PasswordHasher;
use crate::core::auth::service::AuthError;
use crate::core::db::models::{Account, Role};
use crate::core::store::{AccountStore, StoreError};

/// Who a request acts as. Passed explicitly through every call chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    /// Rebuild the identity carried by a token, without a store lookup
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            username: claims.sub.clone(),
            role: claims.role,
        }
    }

    /// Key of this subject's refresh token record
    pub fn subject_key(&self) -> &str {
        &self.username
    }
}

impl From<&Account> for Identity {
    fn from(account: &Account) -> Self {
        Self::new(account.username.clone(), account.role)
    }
}

/// An identity together with the secret it authenticates with
#[derive(Debug, Clone)]
pub struct Principal {
    pub identity: Identity,
    pub password_hash: String,
}

/// Source of principals keyed by username
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn load_principal(&self, username: &str) -> Result<Option<Principal>, StoreError>;
}

/// Identity provider backed by the account store
pub struct AccountIdentityProvider {
    accounts: Arc<dyn AccountStore>,
}

impl AccountIdentityProvider {
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }
}

#[async_trait]
impl IdentityProvider for AccountIdentityProvider {
    async fn load_principal(&self, username: &str) -> Result<Option<Principal>, StoreError> {
        let principal = self
            .accounts
            .find_by_username(username)
            .await?
            .map(|account| Principal {
                identity: Identity::from(&account),
                password_hash: account.password_hash,
            });

        Ok(principal)
    }
}

/// Validates raw credentials. Never writes to any store.
#[derive(Clone)]
pub struct Authenticator {
    provider: Arc<dyn IdentityProvider>,
    hasher: PasswordHasher,
}

impl Authenticator {
    pub fn new(provider: Arc<dyn IdentityProvider>, hasher: PasswordHasher) -> Self {
        Self { provider, hasher }
    }

    /// Authenticate a username/password pair
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        let principal = self
            .provider
            .load_principal(username)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let is_valid = self
            .hasher
            .verify(password, &principal.password_hash)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        if !is_valid {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(principal.identity)
    }
}
