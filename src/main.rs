//! authkit server binary

use authkit::{
    handlers, AppState, AuthConfig, AuthService, PasswordHasher, PgCredentialStore, TokenIssuer,
};

use axum::http::{header, HeaderValue, Method};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AuthConfig::from_env().expect("failed to load configuration");
    config.validate().expect("invalid configuration");

    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("failed to connect to credential store");
    PgCredentialStore::migrate(&pool)
        .await
        .expect("failed to run migrations");

    let hasher = PasswordHasher::new(
        config.argon2_memory_cost,
        config.argon2_time_cost,
        config.argon2_parallelism,
    )
    .expect("invalid argon2 parameters");

    let auth = Arc::new(AuthService::new(
        Arc::new(PgCredentialStore::new(pool)),
        hasher,
        TokenIssuer::new(&config),
        Duration::from_secs(config.store_timeout_secs),
    ));

    let bind_addr = config.bind_addr.clone();
    let cors = cors_layer(&config);
    let state = AppState::new(auth, Arc::new(config));

    let app = handlers::create_routes(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind");
    tracing::info!(addr = %bind_addr, "authkit listening");
    axum::serve(listener, app).await.expect("server error");
}

/// Credentialed CORS for the browser client; the refresh cookie needs
/// explicit origins, not a wildcard.
fn cors_layer(config: &AuthConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
