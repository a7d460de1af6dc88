//! Member API endpoints
//!
//! Provides REST API endpoints for accounts and sessions:
//! - POST /api/members/signup - Register a new account
//! - POST /api/members/login - Login, tokens returned in response headers
//! - POST /api/members/reissue - Rotate the token pair
//! - GET /api/members/check/{username} - Username duplicate check
//! - POST /api/members/logout - End the session (Bearer access token)
//! - GET /api/members/me - Current account (Bearer access token)

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;

use crate::core::auth::jwt::{BEARER_PREFIX, TokenPair};
use crate::core::auth::service::{
    AuthError, LoginRequest, MemberService, ReissueRequest, SignupRequest,
};
use crate::core::db::models::AccountResponse;

/// Response header carrying the refresh token after login
pub const REFRESH_TOKEN_HEADER: HeaderName = HeaderName::from_static("refresh-token");

/// Member API state containing the member service
#[derive(Clone)]
pub struct AuthApiState {
    pub member_service: MemberService,
}

/// Error part of the response envelope
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Response envelope shared by every endpoint
#[derive(Debug, Serialize, serde::Deserialize)]
pub struct ResponseDto<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorBody>,
}

impl<T> ResponseDto<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// Convert AuthError to API response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::DuplicateAccount => (StatusCode::CONFLICT, "DUPLICATE_ACCOUNT"),
            AuthError::PasswordMismatch => (StatusCode::BAD_REQUEST, "PASSWORD_MISMATCH"),
            AuthError::AccountNotFound => (StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AuthError::InvalidRefreshToken => {
                (StatusCode::UNAUTHORIZED, "INVALID_REFRESH_TOKEN")
            }
            AuthError::SessionEnded => (StatusCode::UNAUTHORIZED, "SESSION_ENDED"),
            AuthError::TokenMismatch => (StatusCode::UNAUTHORIZED, "TOKEN_MISMATCH"),
            AuthError::MalformedToken => (StatusCode::BAD_REQUEST, "MALFORMED_TOKEN"),
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AuthError::StoreUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            AuthError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        // Backend details stay in the logs
        let message = match &self {
            AuthError::StoreUnavailable(_) | AuthError::Internal(_) => {
                tracing::error!("Request failed: {}", self);
                "Service temporarily unavailable".to_string()
            }
            _ => self.to_string(),
        };

        let body = ResponseDto::<()>::fail(code, message);

        (status, Json(body)).into_response()
    }
}

/// Create the member API router
pub fn auth_api_router(state: AuthApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/members/signup", post(signup_handler))
        .route("/api/members/login", post(login_handler))
        .route("/api/members/reissue", post(reissue_handler))
        .route("/api/members/check/{username}", get(check_username_handler))
        .route("/api/members/logout", post(logout_handler))
        .route("/api/members/me", get(me_handler))
        .with_state(state)
}

/// POST /api/members/signup
async fn signup_handler(
    State(state): State<Arc<AuthApiState>>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<ResponseDto<AccountResponse>>, AuthError> {
    tracing::info!("Signup attempt for username: {}", request.username);

    let account = state.member_service.create_account(request).await?;

    Ok(Json(ResponseDto::success(account)))
}

/// POST /api/members/login
///
/// The body carries only account data. The access token goes out as
/// `Authorization: Bearer <token>`, the refresh token as `Refresh-Token`.
async fn login_handler(
    State(state): State<Arc<AuthApiState>>,
    Json(request): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<ResponseDto<AccountResponse>>), AuthError> {
    tracing::info!("Login attempt for username: {}", request.username);

    let outcome = state.member_service.login(request).await?;
    let headers = token_headers(&outcome.tokens)?;

    Ok((headers, Json(ResponseDto::success(outcome.account))))
}

/// POST /api/members/reissue
async fn reissue_handler(
    State(state): State<Arc<AuthApiState>>,
    Json(request): Json<ReissueRequest>,
) -> Result<Json<ResponseDto<TokenPair>>, AuthError> {
    tracing::debug!("Token reissue request");

    let tokens = state.member_service.reissue(request).await?;

    Ok(Json(ResponseDto::success(tokens)))
}

/// GET /api/members/check/{username}
async fn check_username_handler(
    State(state): State<Arc<AuthApiState>>,
    Path(username): Path<String>,
) -> Result<Json<ResponseDto<String>>, AuthError> {
    let available = state
        .member_service
        .check_username_available(&username)
        .await?;

    let body = if available {
        ResponseDto::success("Username is available".to_string())
    } else {
        ResponseDto::fail("400", "Username is already taken")
    };

    Ok(Json(body))
}

/// POST /api/members/logout
async fn logout_handler(
    State(state): State<Arc<AuthApiState>>,
    headers: HeaderMap,
) -> Result<Json<ResponseDto<String>>, AuthError> {
    let token = extract_bearer_token(&headers)?;
    let identity = state.member_service.authenticate_access_token(&token)?;

    state.member_service.logout(&identity).await?;

    Ok(Json(ResponseDto::success("Logged out successfully".to_string())))
}

/// GET /api/members/me
async fn me_handler(
    State(state): State<Arc<AuthApiState>>,
    headers: HeaderMap,
) -> Result<Json<ResponseDto<AccountResponse>>, AuthError> {
    let token = extract_bearer_token(&headers)?;
    let identity = state.member_service.authenticate_access_token(&token)?;

    let account = state.member_service.current_account(&identity).await?;

    Ok(Json(ResponseDto::success(account)))
}

/// Headers delivering a freshly issued token pair
fn token_headers(tokens: &TokenPair) -> Result<HeaderMap, AuthError> {
    let authorization = HeaderValue::from_str(&format!("{}{}", BEARER_PREFIX, tokens.access_token))
        .map_err(|e| AuthError::Internal(e.to_string()))?;
    let refresh = HeaderValue::from_str(&tokens.refresh_token)
        .map_err(|e| AuthError::Internal(e.to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, authorization);
    headers.insert(REFRESH_TOKEN_HEADER, refresh);
    Ok(headers)
}

/// Extract Bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::Unauthorized)?;

    let token = auth_header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::Unauthorized)?;

    if token.is_empty() {
        return Err(AuthError::Unauthorized);
    }

    Ok(token.to_string())
}
