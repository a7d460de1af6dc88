//! Authentication module
//!
//! This module provides authentication functionality including:
//! - JWT access/refresh token issuing and validation
//! - Member signup and credential login
//! - Session lifecycle with refresh token rotation
//! - REST API endpoints for member operations

pub mod api;
pub mod authenticator;
pub mod jwt;
pub mod password;
pub mod service;

pub use api::{AuthApiState, auth_api_router};
pub use authenticator::{AccountIdentityProvider, Authenticator, Identity, IdentityProvider};
pub use jwt::{Claims, JwtConfig, JwtError, JwtService, TokenPair, TokenType};
pub use password::PasswordHasher;
pub use service::{
    AuthError, LoginOutcome, LoginRequest, MemberService, ReissueRequest, SignupRequest,
};
