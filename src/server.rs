//! HTTP server bootstrap for the registry revealer.
//!
//! This module wires together:
//! - configuration
//! - database connection pool
//! - core services (dispute index, vote mirror, ledger gateway, run lease)
//! - the reveal worker
//! - the Axum router

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::mpsc;
use tower_http::cors::AllowOrigin;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{auth_middleware, AuthMiddlewareState, TokenValidator};
use crate::infra::{DisputeIndex, PgDisputeIndex, PgRunLease, PgVoteMirror};
use crate::ledger::{EvmArbitratorGateway, GatewayConfig};
use crate::metrics::MetricsRegistry;
use crate::telemetry::{init_telemetry, TelemetryConfig};
use crate::worker::{spawn_reveal_worker, RevealWorker, RevealWorkerConfig, RevealWorkerMessage};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Maximum database connections.
    pub max_connections: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/registry_revealer".to_string());

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {host}:{port}: {e}"))?;

        let max_connections: u32 = std::env::var("MAX_DB_CONNECTIONS")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            database_url,
            listen_addr,
            max_connections,
        })
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<dyn DisputeIndex>,
    pub metrics: Arc<MetricsRegistry>,
    pub reveal_worker: mpsc::Sender<RevealWorkerMessage>,
    pub chain_id: u64,
}

/// Start the HTTP server and the reveal worker.
pub async fn run() -> anyhow::Result<()> {
    init_telemetry(&TelemetryConfig::from_env());

    info!("Starting registry revealer v{}", env!("CARGO_PKG_VERSION"));

    // Auth configuration
    let auth_mode = std::env::var("AUTH_MODE").unwrap_or_else(|_| "required".to_string());
    let require_auth = auth_mode != "disabled";

    let validator = std::env::var("API_AUTH_TOKEN")
        .ok()
        .filter(|t| !t.is_empty())
        .map(|t| Arc::new(TokenValidator::new(&t)));

    if require_auth && validator.is_none() {
        anyhow::bail!(
            "AUTH_MODE=required but no auth is configured; set API_AUTH_TOKEN (or set AUTH_MODE=disabled for local dev)"
        );
    }

    let auth_state = AuthMiddlewareState {
        validator,
        require_auth,
    };

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  Listen address: {}", config.listen_addr);
    info!("  Max connections: {}", config.max_connections);

    // Connect to PostgreSQL
    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    info!("Connected to PostgreSQL");

    let migrate_on_startup = std::env::var("DB_MIGRATE_ON_STARTUP")
        .ok()
        .map(|v| {
            !matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off"
            )
        })
        .unwrap_or(true);
    if migrate_on_startup {
        info!("Running database migrations...");
        crate::migrations::run_postgres(&pool).await?;
        info!("Database migrations applied");
    } else {
        info!("DB migrations skipped (DB_MIGRATE_ON_STARTUP=0)");
    }

    // Ledger gateway. The worker cannot run without one, so missing RPC
    // configuration is a startup error rather than a degraded mode.
    let gateway_config = GatewayConfig::from_env().ok_or_else(|| {
        anyhow::anyhow!(
            "Ledger gateway not configured; set REVEALER_RPC_URL and REVEALER_PRIVATE_KEY"
        )
    })?;
    info!("Ledger gateway configured:");
    info!("  RPC URL: {}", gateway_config.rpc_url);
    info!("  Chain ID: {}", gateway_config.chain_id);
    let gateway = Arc::new(EvmArbitratorGateway::new(gateway_config)?);
    info!("  Signing account: {:#x}", gateway.account());

    // Initialize services
    let index = Arc::new(PgDisputeIndex::new(pool.clone()));
    let mirror = Arc::new(PgVoteMirror::from_env(pool.clone())?);
    let lease = Arc::new(PgRunLease::new(pool.clone()));
    let metrics = Arc::new(MetricsRegistry::new());

    // Spawn the reveal worker
    let worker_config = RevealWorkerConfig::from_env().with_chain_id(gateway.chain_id());
    let chain_id = worker_config.chain_id;
    let worker = RevealWorker::new(
        worker_config,
        index.clone(),
        mirror,
        gateway,
        lease,
        metrics.clone(),
    );
    let (worker_handle, reveal_worker) = spawn_reveal_worker(worker);

    // Create application state
    let state = AppState {
        index,
        metrics,
        reveal_worker: reveal_worker.clone(),
        chain_id,
    };

    // Build router
    let app = build_router(auth_state)?.with_state(state);

    // Start server
    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    info!("Registry revealer is ready to accept connections");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let an in-flight pass finish so the run lease is released cleanly.
    let _ = reveal_worker.send(RevealWorkerMessage::Shutdown).await;
    let _ = worker_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}

fn build_router(auth_state: AuthMiddlewareState) -> anyhow::Result<Router<AppState>> {
    let api = crate::api::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        auth_middleware,
    ));

    let mut router = Router::new()
        .nest("/api", api)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_endpoint))
        .layer(TraceLayer::new_for_http());

    if let Some(cors_layer) = cors_layer_from_env()? {
        router = router.layer(cors_layer);
    }

    Ok(router)
}

fn cors_layer_from_env() -> anyhow::Result<Option<CorsLayer>> {
    let origins = match std::env::var("CORS_ALLOW_ORIGINS") {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };

    let origins = origins.trim();
    if origins.is_empty() {
        return Ok(None);
    }

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    ))
}

/// Health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "healthy",
        "service": "registry-revealer",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check endpoint.
async fn readiness_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<axum::Json<serde_json::Value>, (axum::http::StatusCode, String)> {
    match state.index.ping().await {
        Ok(()) => Ok(axum::Json(serde_json::json!({
            "status": "ready",
            "database": "connected",
        }))),
        Err(e) => Err((
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            format!("Database unavailable: {}", e),
        )),
    }
}

/// Prometheus metrics endpoint.
async fn metrics_endpoint(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus(),
    )
}
