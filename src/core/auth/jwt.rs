//! JWT token codec
//!
//! Issues and verifies the HS256-signed access/refresh token pairs.
//! Access tokens are short-lived (15 minutes), refresh tokens are long-lived (7 days).
//! Every token carries a `token_type` claim so one kind can never stand in for the other.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::db::models::Role;

/// Default access token expiration time (15 minutes)
const ACCESS_TOKEN_EXPIRATION_MINUTES: i64 = 15;

/// Default refresh token expiration time (7 days)
const REFRESH_TOKEN_EXPIRATION_DAYS: i64 = 7;

/// Issuer claim written and required when `JWT_ISSUER` is unset
const DEFAULT_ISSUER: &str = "memberauth";

/// Grant type reported with every token pair
pub const GRANT_TYPE: &str = "Bearer";

/// Prefix of the `Authorization` header value
pub const BEARER_PREFIX: &str = "Bearer ";

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Access token expiration in minutes
    pub access_token_expiration_minutes: i64,
    /// Refresh token expiration in days
    pub refresh_token_expiration_days: i64,
    /// Token issuer
    pub issuer: String,
}

impl JwtConfig {
    /// Create a new JWT configuration
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_token_expiration_minutes: ACCESS_TOKEN_EXPIRATION_MINUTES,
            refresh_token_expiration_days: REFRESH_TOKEN_EXPIRATION_DAYS,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Result<Self, JwtError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| JwtError::MissingSecret)?;

        let access_exp = std::env::var("JWT_ACCESS_EXPIRATION_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(ACCESS_TOKEN_EXPIRATION_MINUTES);

        let refresh_exp = std::env::var("JWT_REFRESH_EXPIRATION_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(REFRESH_TOKEN_EXPIRATION_DAYS);

        let issuer = std::env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string());

        Ok(Self {
            secret,
            access_token_expiration_minutes: access_exp,
            refresh_token_expiration_days: refresh_exp,
            issuer,
        })
    }

    /// Set access token expiration
    pub fn access_token_expiration(mut self, minutes: i64) -> Self {
        self.access_token_expiration_minutes = minutes;
        self
    }

    /// Set refresh token expiration
    pub fn refresh_token_expiration(mut self, days: i64) -> Self {
        self.refresh_token_expiration_days = days;
        self
    }

    /// Set issuer
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field(
                "access_token_expiration_minutes",
                &self.access_token_expiration_minutes,
            )
            .field(
                "refresh_token_expiration_days",
                &self.refresh_token_expiration_days,
            )
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// JWT errors
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT_SECRET environment variable not set")]
    MissingSecret,

    #[error("Token encoding failed: {0}")]
    EncodingError(String),

    #[error("Token decoding failed: {0}")]
    DecodingError(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid token type")]
    InvalidTokenType,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidToken | ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                JwtError::InvalidToken
            }
            _ => JwtError::DecodingError(err.to_string()),
        }
    }
}

/// Token type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Role of the subject
    pub role: Role,
    /// Token type (access or refresh)
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// JWT ID, makes two tokens issued in the same second distinct
    pub jti: String,
}

impl Claims {
    /// Check if this is an access token
    pub fn is_access_token(&self) -> bool {
        self.token_type == TokenType::Access
    }

    /// Check if this is a refresh token
    pub fn is_refresh_token(&self) -> bool {
        self.token_type == TokenType::Refresh
    }
}

/// Token pair (access + refresh)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Always "Bearer"
    pub grant_type: String,
    /// Access token (short-lived)
    pub access_token: String,
    /// Refresh token (long-lived)
    pub refresh_token: String,
    /// Access token expiration (Unix timestamp)
    pub access_token_expires_at: i64,
}

/// JWT service for token operations
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// Create a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    fn sign(
        &self,
        subject: &str,
        role: Role,
        token_type: TokenType,
        lifetime: Duration,
    ) -> Result<(String, i64), JwtError> {
        let now = Utc::now();
        let exp = now + lifetime;

        let claims = Claims {
            sub: subject.to_string(),
            role,
            token_type,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))?;

        Ok((token, exp.timestamp()))
    }

    /// Issue a fresh access/refresh pair for a subject
    pub fn issue(&self, subject: &str, role: Role) -> Result<TokenPair, JwtError> {
        let (access_token, access_token_expires_at) = self.sign(
            subject,
            role,
            TokenType::Access,
            Duration::minutes(self.config.access_token_expiration_minutes),
        )?;
        let (refresh_token, _) = self.sign(
            subject,
            role,
            TokenType::Refresh,
            Duration::days(self.config.refresh_token_expiration_days),
        )?;

        Ok(TokenPair {
            grant_type: GRANT_TYPE.to_string(),
            access_token,
            refresh_token,
            access_token_expires_at,
        })
    }

    fn validation(&self, check_expiry: bool) -> Validation {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);
        validation.validate_exp = check_expiry;
        // Strict expiration checking
        validation.leeway = 0;
        validation
    }

    /// Validate signature, issuer and expiry, and decode the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation(true))?;

        Ok(token_data.claims)
    }

    /// Whether the token is well-formed, correctly signed and unexpired
    pub fn verify(&self, token: &str) -> bool {
        match self.validate_token(token) {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!("Token rejected: {}", err);
                false
            }
        }
    }

    /// Like [`verify`](Self::verify), and the token must be a refresh token
    pub fn verify_refresh(&self, token: &str) -> bool {
        self.validate_refresh_token(token).is_ok()
    }

    /// Validate an access token specifically
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.validate_token(token)?;

        if !claims.is_access_token() {
            return Err(JwtError::InvalidTokenType);
        }

        Ok(claims)
    }

    /// Validate a refresh token specifically
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        let claims = self.validate_token(token)?;

        if !claims.is_refresh_token() {
            return Err(JwtError::InvalidTokenType);
        }

        Ok(claims)
    }

    /// Decode the claims of an access token without checking its expiry.
    ///
    /// The signature is still checked. Reissue relies on this: the access
    /// token being replaced is usually already expired.
    pub fn extract_identity(&self, token: &str) -> Result<Claims, JwtError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation(false))?;
        let claims = token_data.claims;

        if !claims.is_access_token() {
            return Err(JwtError::InvalidTokenType);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> JwtService {
        let config = JwtConfig::new("test_secret_key_for_testing_only_32bytes!");
        JwtService::new(config)
    }

    // ========================================================================
    // JwtConfig Tests
    // ========================================================================

    #[test]
    fn test_jwt_config_new() {
        let config = JwtConfig::new("my_secret");

        assert_eq!(config.secret, "my_secret");
        assert_eq!(
            config.access_token_expiration_minutes,
            ACCESS_TOKEN_EXPIRATION_MINUTES
        );
        assert_eq!(
            config.refresh_token_expiration_days,
            REFRESH_TOKEN_EXPIRATION_DAYS
        );
        assert_eq!(config.issuer, DEFAULT_ISSUER);
    }

    #[test]
    fn test_jwt_config_builder() {
        let config = JwtConfig::new("secret")
            .access_token_expiration(30)
            .refresh_token_expiration(14)
            .issuer("my_app");

        assert_eq!(config.access_token_expiration_minutes, 30);
        assert_eq!(config.refresh_token_expiration_days, 14);
        assert_eq!(config.issuer, "my_app");
    }

    #[test]
    fn test_jwt_config_debug_redacts_secret() {
        let config = JwtConfig::new("super_secret_value");
        let debug = format!("{:?}", config);

        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("super_secret_value"));
    }

    #[test]
    fn test_token_type_serialization() {
        assert_eq!(
            serde_json::to_string(&TokenType::Access).unwrap(),
            r#""access""#
        );
        assert_eq!(
            serde_json::to_string(&TokenType::Refresh).unwrap(),
            r#""refresh""#
        );
        assert_eq!(TokenType::Refresh.to_string(), "refresh");
    }

    // ========================================================================
    // Issue Tests
    // ========================================================================

    #[test]
    fn test_issue_token_pair() {
        let service = create_test_service();

        let pair = service.issue("alice", Role::User).unwrap();

        assert_eq!(pair.grant_type, "Bearer");
        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());
        assert_ne!(pair.access_token, pair.refresh_token);
        assert!(pair.access_token_expires_at > Utc::now().timestamp());
    }

    #[test]
    fn test_issued_tokens_carry_subject_role_and_type() {
        let service = create_test_service();
        let pair = service.issue("admin", Role::Admin).unwrap();

        let access = service.validate_access_token(&pair.access_token).unwrap();
        assert_eq!(access.sub, "admin");
        assert_eq!(access.role, Role::Admin);
        assert!(access.is_access_token());

        let refresh = service.validate_refresh_token(&pair.refresh_token).unwrap();
        assert_eq!(refresh.sub, "admin");
        assert!(refresh.is_refresh_token());
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn test_two_pairs_for_same_subject_differ() {
        let service = create_test_service();

        let first = service.issue("alice", Role::User).unwrap();
        let second = service.issue("alice", Role::User).unwrap();

        assert_ne!(first.access_token, second.access_token);
        assert_ne!(first.refresh_token, second.refresh_token);
    }

    // ========================================================================
    // Verify Tests
    // ========================================================================

    #[test]
    fn test_verify_accepts_both_issued_tokens() {
        let service = create_test_service();
        let pair = service.issue("alice", Role::User).unwrap();

        assert!(service.verify(&pair.access_token));
        assert!(service.verify(&pair.refresh_token));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let service = create_test_service();

        assert!(!service.verify(""));
        assert!(!service.verify("invalid.token.here"));
        assert!(!service.verify("not-even-a-jwt"));
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let service1 = JwtService::new(JwtConfig::new("secret_one"));
        let service2 = JwtService::new(JwtConfig::new("secret_two"));

        let pair = service1.issue("alice", Role::User).unwrap();

        assert!(!service2.verify(&pair.refresh_token));
        assert!(matches!(
            service2.validate_token(&pair.refresh_token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_verify_rejects_other_issuer() {
        let ours = JwtService::new(JwtConfig::new("shared_secret"));
        let theirs = JwtService::new(JwtConfig::new("shared_secret").issuer("someone_else"));

        let pair = theirs.issue("alice", Role::User).unwrap();

        assert!(!ours.verify(&pair.access_token));
    }

    #[test]
    fn test_verify_rejects_expired_refresh_token() {
        let service =
            JwtService::new(JwtConfig::new("test_secret").refresh_token_expiration(-1));
        let pair = service.issue("alice", Role::User).unwrap();

        assert!(!service.verify(&pair.refresh_token));
        assert!(!service.verify_refresh(&pair.refresh_token));
        assert!(matches!(
            service.validate_token(&pair.refresh_token),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn test_verify_refresh_rejects_access_token() {
        let service = create_test_service();
        let pair = service.issue("alice", Role::User).unwrap();

        assert!(service.verify_refresh(&pair.refresh_token));
        assert!(!service.verify_refresh(&pair.access_token));
    }

    #[test]
    fn test_validate_access_token_with_refresh_token_fails() {
        let service = create_test_service();
        let pair = service.issue("alice", Role::User).unwrap();

        let result = service.validate_access_token(&pair.refresh_token);
        assert!(matches!(result, Err(JwtError::InvalidTokenType)));
    }

    // ========================================================================
    // Extract Identity Tests
    // ========================================================================

    #[test]
    fn test_extract_identity_from_valid_access_token() {
        let service = create_test_service();
        let pair = service.issue("alice", Role::User).unwrap();

        let claims = service.extract_identity(&pair.access_token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn test_extract_identity_ignores_expiry() {
        let service =
            JwtService::new(JwtConfig::new("test_secret").access_token_expiration(-5));
        let pair = service.issue("alice", Role::User).unwrap();

        assert!(!service.verify(&pair.access_token));

        let claims = service.extract_identity(&pair.access_token).unwrap();
        assert_eq!(claims.sub, "alice");
    }

    #[test]
    fn test_extract_identity_rejects_unparseable_token() {
        let service = create_test_service();

        assert!(service.extract_identity("garbage").is_err());
        assert!(service.extract_identity("a.b.c").is_err());
    }

    #[test]
    fn test_extract_identity_rejects_forged_signature() {
        let forger = JwtService::new(JwtConfig::new("attacker_secret"));
        let service = create_test_service();

        let pair = forger.issue("admin", Role::Admin).unwrap();

        assert!(matches!(
            service.extract_identity(&pair.access_token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_extract_identity_rejects_refresh_token() {
        let service = create_test_service();
        let pair = service.issue("alice", Role::User).unwrap();

        assert!(matches!(
            service.extract_identity(&pair.refresh_token),
            Err(JwtError::InvalidTokenType)
        ));
    }

    // ========================================================================
    // Error and Serialization Tests
    // ========================================================================

    #[test]
    fn test_jwt_error_display() {
        assert_eq!(
            JwtError::MissingSecret.to_string(),
            "JWT_SECRET environment variable not set"
        );
        assert_eq!(JwtError::Expired.to_string(), "Token expired");
        assert_eq!(JwtError::InvalidToken.to_string(), "Invalid token");
        assert_eq!(JwtError::InvalidTokenType.to_string(), "Invalid token type");
    }

    #[test]
    fn test_token_pair_serialization() {
        let pair = TokenPair {
            grant_type: GRANT_TYPE.to_string(),
            access_token: "access123".to_string(),
            refresh_token: "refresh456".to_string(),
            access_token_expires_at: 1234567890,
        };

        let json = serde_json::to_string(&pair).unwrap();
        assert!(json.contains(r#""grant_type":"Bearer""#));
        assert!(json.contains("access123"));
        assert!(json.contains("refresh456"));
    }
}
