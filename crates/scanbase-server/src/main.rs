//! Scanbase Server - Main entry point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::{HeaderValue, Method};
use axum::Router;
use scanbase_common::logging::{init_logging, LogConfig};
use scanbase_ingest::store::PgStore;
use scanbase_server::config::Config;
use scanbase_server::features::{
    auth::{ConfigDirectory, SessionStore},
    router, FeatureState,
};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::from_env().with_file_prefix("scanbase-server");
    init_logging(&log_config)?;

    info!("Starting Scanbase Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .connect(&config.database.url)
        .await?;
    info!("Database connection pool established");

    let store = PgStore::new(pool);
    store.ensure_schema().await?;
    info!("Database schema ensured");

    let state = FeatureState {
        store: Arc::new(store),
        sessions: Arc::new(SessionStore::new(Duration::from_secs(
            config.auth.session_ttl_secs,
        ))),
        directory: Arc::new(ConfigDirectory::new(config.auth.users.clone())),
    };

    let app = create_app(state, &config)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Build the application router with CORS and request tracing.
fn create_app(state: FeatureState, config: &Config) -> Result<Router> {
    let mut origins = Vec::with_capacity(config.cors.allowed_origins.len());
    for origin in &config.cors.allowed_origins {
        origins.push(origin.parse::<HeaderValue>()?);
    }

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    Ok(router(state).layer(cors).layer(TraceLayer::new_for_http()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
