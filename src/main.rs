//! Screenshot semantic search service.
//!
//! Stores screenshots with the OCR text and visual description extracted
//! from them, and answers natural-language queries by embedding similarity.
//! Runs on MongoDB when reachable and on an in-memory store otherwise.
//!
//! # Environment Variables
//! - `MONGODB_URI` - MongoDB connection string (unset: in-memory fallback)
//! - `EMBEDDING_BACKEND` - `hash` or `fastembed`
//! - `HTTP_PORT` - HTTP listen port (default: 8080)
//! - `METRICS_PORT` - Prometheus metrics port (default: 9090)
//! - `BIND_ADDRESS` - Bind address (default: auto)
//! - `RUST_LOG` - Log level (default: info)
//!
//! See `Config::from_env` for the full list.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use screenshot_search::config::Config;
use screenshot_search::http::{self, AppState};
use screenshot_search::metrics;
use screenshot_search::search::SearchService;
use screenshot_search::store::StoreMode;
use screenshot_search::Vectorizer;

/// Bind the API listener. `auto` tries dual-stack first, then IPv4-only.
async fn bind_listener(config: &Config) -> anyhow::Result<TcpListener> {
    if config.bind_address == "auto" {
        if let Ok(listener) = TcpListener::bind(("::", config.http_port)).await {
            info!("Auto-detected dual-stack support, using [::]");
            return Ok(listener);
        }
        info!("IPv6 not available, falling back to IPv4 (0.0.0.0)");
        return TcpListener::bind(("0.0.0.0", config.http_port))
            .await
            .context("failed to bind 0.0.0.0");
    }

    // Add brackets if it's an IPv6 address without them
    let bind_str = if config.bind_address.contains(':') && !config.bind_address.starts_with('[') {
        format!("[{}]:{}", config.bind_address, config.http_port)
    } else {
        format!("{}:{}", config.bind_address, config.http_port)
    };
    let addr: std::net::SocketAddr = bind_str
        .parse()
        .with_context(|| format!("invalid BIND_ADDRESS: {}", bind_str))?;

    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // Initialize tracing (use RUST_LOG env var to control log level)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting screenshot search service");

    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        http_port = config.http_port,
        metrics_port = config.metrics_port,
        embedding_backend = config.embedding_backend.as_str(),
        embedding_model = %config.embedding_model,
        mongodb_configured = config.mongodb_uri.is_some(),
        log_level = %config.log_level,
        "Configuration loaded"
    );

    let metrics_handle = metrics::init_metrics().context("failed to install metrics recorder")?;

    let vectorizer = Arc::new(Vectorizer::from_config(&config));
    // A model that fails here is retried on the first request
    match vectorizer.warm_up().await {
        Ok(()) => info!(model = vectorizer.model_name(), "Embedding model ready"),
        Err(e) => warn!(error = %e, "Embedding model unavailable at startup"),
    }

    let service = Arc::new(SearchService::new(vectorizer, config.store_config()));
    match service.connect().await {
        StoreMode::Durable => info!("Using MongoDB document store"),
        StoreMode::Fallback => warn!("Running in degraded mode with the in-memory store"),
    }

    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics_port, metrics_handle).await {
            error!(error = %e, "Metrics server stopped");
        }
    });

    let state = AppState::new(Arc::clone(&service), config.default_top_k, config.max_top_k);
    let app = http::router(state);

    let listener = bind_listener(&config).await?;
    info!(addr = %listener.local_addr()?, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    Ok(())
}
