//! Member service
//!
//! Signup, login, token reissue, duplicate-check and logout. Coordinates the
//! account store, the refresh token store, the authenticator and the JWT codec.
//!
//! Per subject the session state is read off the refresh token store:
//! no record means anonymous (or logged out), a record means authenticated,
//! and a rotated record makes every earlier refresh token unusable.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::core::auth::authenticator::{AccountIdentityProvider, Authenticator, Identity};
use crate::core::auth::jwt::{JwtError, JwtService, TokenPair};
use crate::core::auth::password::{PasswordError, PasswordHasher};
use crate::core::db::models::{AccountResponse, NewAccount, RefreshTokenRecord, Role};
use crate::core::store::{AccountStore, RefreshTokenStore, StoreError};

/// Authentication service error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Username already registered")]
    DuplicateAccount,

    #[error("Password and password confirmation do not match")]
    PasswordMismatch,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Refresh token is invalid or expired")]
    InvalidRefreshToken,

    #[error("Session has ended, please log in again")]
    SessionEnded,

    #[error("Refresh token does not match the active session")]
    TokenMismatch,

    #[error("Malformed token")]
    MalformedToken,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => AuthError::DuplicateAccount,
            StoreError::Unavailable(msg) => AuthError::StoreUnavailable(msg),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired | JwtError::InvalidToken | JwtError::InvalidTokenType => {
                AuthError::Unauthorized
            }
            JwtError::DecodingError(_) => AuthError::MalformedToken,
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

/// Signup request data
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
    pub nickname: String,
}

/// Login request data
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token reissue request
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ReissueRequest {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub account: AccountResponse,
    pub tokens: TokenPair,
}

/// Short SHA-256 fingerprint of a token, safe to log
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}

/// Member service
#[derive(Clone)]
pub struct MemberService {
    accounts: Arc<dyn AccountStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    authenticator: Authenticator,
    jwt_service: JwtService,
    hasher: PasswordHasher,
}

impl MemberService {
    /// Create a new member service
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        jwt_service: JwtService,
        hasher: PasswordHasher,
    ) -> Self {
        let provider = Arc::new(AccountIdentityProvider::new(accounts.clone()));

        Self {
            accounts,
            refresh_tokens,
            authenticator: Authenticator::new(provider, hasher),
            jwt_service,
            hasher,
        }
    }

    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Register a new account with role USER
    pub async fn create_account(&self, request: SignupRequest) -> Result<AccountResponse, AuthError> {
        if self.accounts.exists_by_username(&request.username).await? {
            return Err(AuthError::DuplicateAccount);
        }

        if request.password != request.password_confirm {
            return Err(AuthError::PasswordMismatch);
        }

        let password_hash = self.hasher.hash(&request.password).await?;

        // The store's uniqueness guard still applies if a concurrent signup won
        let account = self
            .accounts
            .save(NewAccount {
                username: request.username,
                password_hash,
                nickname: request.nickname,
                role: Role::User,
            })
            .await?;

        tracing::info!("Account created: {}", account.username);

        Ok(account.into())
    }

    /// Authenticate and open (or replace) the subject's session
    pub async fn login(&self, request: LoginRequest) -> Result<LoginOutcome, AuthError> {
        let identity = self
            .authenticator
            .authenticate(&request.username, &request.password)
            .await?;

        let account = self
            .accounts
            .find_by_username(&identity.username)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let tokens = self.jwt_service.issue(&identity.username, identity.role)?;

        self.refresh_tokens
            .save(RefreshTokenRecord::new(
                identity.subject_key(),
                tokens.refresh_token.clone(),
            ))
            .await?;

        tracing::info!(
            "Session opened for {} (refresh {})",
            identity.username,
            token_fingerprint(&tokens.refresh_token)
        );

        Ok(LoginOutcome {
            account: account.into(),
            tokens,
        })
    }

    /// Exchange a (possibly expired) access token and the current refresh
    /// token for a new pair, rotating the stored refresh token
    pub async fn reissue(&self, request: ReissueRequest) -> Result<TokenPair, AuthError> {
        if !self.jwt_service.verify_refresh(&request.refresh_token) {
            return Err(AuthError::InvalidRefreshToken);
        }

        let claims = self
            .jwt_service
            .extract_identity(&request.access_token)
            .map_err(|_| AuthError::MalformedToken)?;
        let identity = Identity::from_claims(&claims);

        let record = self
            .refresh_tokens
            .find_by_key(identity.subject_key())
            .await?
            .ok_or(AuthError::SessionEnded)?;

        if record.value != request.refresh_token {
            tracing::warn!(
                "Stale refresh token for {} ({})",
                identity.username,
                token_fingerprint(&request.refresh_token)
            );
            return Err(AuthError::TokenMismatch);
        }

        let tokens = self.jwt_service.issue(&identity.username, identity.role)?;

        let swapped = self
            .refresh_tokens
            .compare_and_swap(
                &request.refresh_token,
                record.with_value(tokens.refresh_token.clone()),
            )
            .await?;

        if !swapped {
            tracing::warn!(
                "Concurrent reissue lost for {} ({})",
                identity.username,
                token_fingerprint(&request.refresh_token)
            );
            return Err(AuthError::TokenMismatch);
        }

        tracing::debug!(
            "Tokens reissued for {} (refresh {} -> {})",
            identity.username,
            token_fingerprint(&request.refresh_token),
            token_fingerprint(&tokens.refresh_token)
        );

        Ok(tokens)
    }

    /// Whether a username is still free. Read-only.
    pub async fn check_username_available(&self, username: &str) -> Result<bool, AuthError> {
        Ok(!self.accounts.exists_by_username(username).await?)
    }

    /// End the subject's session. Returns whether a session existed.
    pub async fn logout(&self, identity: &Identity) -> Result<bool, AuthError> {
        let removed = self
            .refresh_tokens
            .delete_by_key(identity.subject_key())
            .await?;

        tracing::info!("Session closed for {} (active: {})", identity.username, removed);

        Ok(removed)
    }

    /// Account of the given identity
    pub async fn current_account(&self, identity: &Identity) -> Result<AccountResponse, AuthError> {
        let account = self
            .accounts
            .find_by_username(&identity.username)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        Ok(account.into())
    }

    /// Resolve a bearer access token to the identity it carries
    pub fn authenticate_access_token(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.jwt_service.validate_access_token(token)?;
        Ok(Identity::from_claims(&claims))
    }
}
