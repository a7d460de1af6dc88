use memberauth::core::config::Config;
use memberauth::core::server::{ServerError, build_app, build_member_service, jwt_service_from_env};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    // Log config status (without revealing secrets)
    tracing::info!(
        "Config loaded: database={}, cors_origins={}, bcrypt_cost={}",
        config.has_database(),
        config.cors_allowed_origins.len(),
        config.bcrypt_cost
    );

    let jwt_service = jwt_service_from_env()?;
    let member_service = build_member_service(&config, jwt_service).await?;
    let app = build_app(member_service, &config)?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
