pub mod aggregation;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod http;
mod middleware;
pub mod models;
pub mod moderation;
pub mod state;

use axum::{Router, middleware as axum_middleware};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use errors::AppError;
use middleware::{cors_layer, create_global_rate_limiter, rate_limit_middleware};
use state::AppState;

pub async fn start_server() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    let postgres = PgPoolOptions::new()
        .max_connections(config.max_db_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to connect to Postgres: {}", e)))?;

    if config.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&postgres)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to run migrations: {}", e)))?;
        tracing::info!("Database migrations applied");
    }

    let port = config.port;
    let cors = cors_layer(&config.allowed_origins);
    let state = AppState {
        postgres,
        config: Arc::new(config),
    };

    let global_rate_limiter = create_global_rate_limiter(1000);

    let app = Router::new()
        .merge(http::create_http_routes(state))
        .layer(axum_middleware::from_fn(move |req, next| {
            rate_limit_middleware(global_rate_limiter.clone(), req, next)
        }))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .fallback(|| async { "404 Not Found" });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!("Exchange reviews server listening on port {}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
