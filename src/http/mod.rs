//! HTTP API over the search service.
//!
//! A thin JSON adapter: request decoding, defaults, and status codes live
//! here, everything else is delegated to `SearchService`.

mod handlers;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::search::SearchService;

pub use handlers::{BatchBody, IngestBody, SearchParams, SearchResponseBody, StatsBody};

/// Screenshots arrive base64-encoded inside JSON.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
    pub default_top_k: usize,
    pub max_top_k: usize,
}

impl AppState {
    pub fn new(service: Arc<SearchService>, default_top_k: usize, max_top_k: usize) -> Self {
        Self {
            service,
            default_top_k,
            max_top_k: max_top_k.max(1),
        }
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/screenshots", post(handlers::ingest))
        .route("/screenshots/batch", post(handlers::ingest_batch))
        .route("/search", get(handlers::search))
        .route("/stats", get(handlers::stats))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
