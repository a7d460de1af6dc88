//! Application assembly: store backend, routes and the CORS layer.

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tower_http::cors::CorsLayer;

use crate::core::auth::api::REFRESH_TOKEN_HEADER;
use crate::core::auth::jwt::{JwtConfig, JwtError, JwtService};
use crate::core::auth::password::{BCRYPT_COST_RANGE, PasswordHasher};
use crate::core::auth::{AuthApiState, MemberService, auth_api_router};
use crate::core::config::Config;
use crate::core::db::{DbConfig, DbError, PgAccountStore, PgRefreshTokenStore};
use crate::core::db::create_pool_with_migrations;
use crate::core::store::{MemoryAccountStore, MemoryRefreshTokenStore};

/// Signing secret used only by debug builds without `JWT_SECRET`
const DEV_JWT_SECRET: &str = "memberauth_dev_secret_key_not_for_production_32chars";

/// Startup errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid CORS origin: {0}")]
    InvalidOrigin(String),

    #[error("BCRYPT_COST must be between 4 and 31, got {0}")]
    InvalidBcryptCost(u32),

    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Token codec from the environment. Debug builds fall back to a fixed
/// development secret when `JWT_SECRET` is missing.
pub fn jwt_service_from_env() -> Result<JwtService, ServerError> {
    match JwtConfig::from_env() {
        Ok(config) => Ok(JwtService::new(config)),
        Err(JwtError::MissingSecret) if cfg!(debug_assertions) => {
            tracing::warn!("JWT_SECRET not set, using development secret");
            Ok(JwtService::new(JwtConfig::new(DEV_JWT_SECRET)))
        }
        Err(err) => Err(err.into()),
    }
}

/// Wire the member service to PostgreSQL when configured, otherwise to
/// in-memory stores. Refuses a bcrypt cost the hasher would reject.
pub async fn build_member_service(
    config: &Config,
    jwt_service: JwtService,
) -> Result<MemberService, ServerError> {
    if !BCRYPT_COST_RANGE.contains(&config.bcrypt_cost) {
        return Err(ServerError::InvalidBcryptCost(config.bcrypt_cost));
    }

    let hasher = PasswordHasher::new(config.bcrypt_cost);

    let service = match &config.database_url {
        Some(url) => {
            let pool = create_pool_with_migrations(&DbConfig::from_url(url)).await?;
            tracing::info!("Using PostgreSQL stores");
            MemberService::new(
                Arc::new(PgAccountStore::new(pool.clone())),
                Arc::new(PgRefreshTokenStore::new(pool)),
                jwt_service,
                hasher,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            MemberService::new(
                Arc::new(MemoryAccountStore::new()),
                Arc::new(MemoryRefreshTokenStore::new()),
                jwt_service,
                hasher,
            )
        }
    };

    Ok(service)
}

/// Credentialed CORS for the configured browser origins. Both token headers
/// are exposed to client script.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, ServerError> {
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).map_err(|_| ServerError::InvalidOrigin(o.clone())))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, REFRESH_TOKEN_HEADER])
        .expose_headers([header::AUTHORIZATION, REFRESH_TOKEN_HEADER])
        .allow_credentials(true))
}

/// Build the full application router
pub fn build_app(member_service: MemberService, config: &Config) -> Result<Router, ServerError> {
    let app = Router::new()
        .route("/health", get(health_handler))
        .merge(auth_api_router(AuthApiState { member_service }))
        .layer(cors_layer(&config.cors_allowed_origins)?);

    Ok(app)
}

/// Liveness check
async fn health_handler() -> &'static str {
    "ok"
}
