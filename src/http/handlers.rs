//! Request handlers for the HTTP API.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::AppState;
use crate::error::ServiceError;
use crate::search::{BatchReport, IngestFailure, IngestRequest, SearchHit};

/// One screenshot in an ingest request.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestBody {
    pub filename: String,
    #[serde(default)]
    pub image_base64: String,
    #[serde(default)]
    pub ocr_text: String,
    #[serde(default)]
    pub visual_description: String,
}

impl IngestBody {
    fn into_request(self) -> Result<IngestRequest, ServiceError> {
        let image_data = STANDARD.decode(self.image_base64.trim()).map_err(|e| {
            ServiceError::InvalidRequest(format!("{}: invalid image_base64: {}", self.filename, e))
        })?;
        Ok(IngestRequest::new(
            self.filename,
            image_data,
            self.ocr_text,
            self.visual_description,
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchBody {
    pub items: Vec<IngestBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponseBody {
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub total_hits: usize,
    pub took_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsBody {
    pub total: u64,
    pub degraded_mode: bool,
    pub state: &'static str,
    pub model: String,
    pub model_loaded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResponseBody {
    pub id: Uuid,
}

#[instrument(skip_all, fields(filename))]
pub(super) async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<IngestBody>,
) -> Result<(StatusCode, Json<IngestResponseBody>), ServiceError> {
    tracing::Span::current().record("filename", body.filename.as_str());

    let request = body.into_request()?;
    let id = state.service.ingest(request).await?;

    Ok((StatusCode::CREATED, Json(IngestResponseBody { id })))
}

#[instrument(skip_all, fields(items))]
pub(super) async fn ingest_batch(
    State(state): State<AppState>,
    Json(body): Json<BatchBody>,
) -> Json<BatchReport> {
    tracing::Span::current().record("items", body.items.len());

    // Items that fail to decode are reported alongside storage failures,
    // under their original position in the request.
    let mut positions = Vec::with_capacity(body.items.len());
    let mut requests = Vec::with_capacity(body.items.len());
    let mut decode_failures = Vec::new();

    for (index, item) in body.items.into_iter().enumerate() {
        let filename = item.filename.clone();
        match item.into_request() {
            Ok(request) => {
                positions.push(index);
                requests.push(request);
            }
            Err(e) => decode_failures.push(IngestFailure {
                index,
                filename,
                error: e.to_string(),
            }),
        }
    }

    let mut report = state.service.ingest_batch(requests).await;
    for item in &mut report.stored {
        item.index = positions[item.index];
    }
    for failure in &mut report.failures {
        failure.index = positions[failure.index];
    }
    report.failures.extend(decode_failures);
    report.failures.sort_by_key(|f| f.index);

    Json(report)
}

#[instrument(skip_all, fields(query))]
pub(super) async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponseBody>, ServiceError> {
    tracing::Span::current().record("query", params.q.as_str());

    if params.q.trim().is_empty() {
        return Err(ServiceError::InvalidRequest("Query cannot be empty".into()));
    }

    let top_k = params
        .top_k
        .unwrap_or(state.default_top_k)
        .clamp(1, state.max_top_k);

    info!(query = %params.q, top_k, "Processing search request");

    let outcome = state.service.search(&params.q, top_k).await?;

    Ok(Json(SearchResponseBody {
        query: params.q,
        total_hits: outcome.hits.len(),
        hits: outcome.hits,
        took_ms: outcome.took_ms,
    }))
}

pub(super) async fn stats(State(state): State<AppState>) -> Json<StatsBody> {
    let total = state.service.total_count().await;
    let vectorizer = state.service.vectorizer();

    Json(StatsBody {
        total,
        degraded_mode: state.service.is_degraded_mode(),
        state: state.service.state().as_str(),
        model: vectorizer.model_name().to_string(),
        model_loaded: vectorizer.is_loaded(),
    })
}

pub(super) async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let loaded = state.service.vectorizer().is_loaded();
    let (status, label) = if loaded {
        (StatusCode::OK, "serving")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_serving")
    };

    (
        status,
        Json(serde_json::json!({
            "status": label,
            "model_loaded": loaded,
            "state": state.service.state().as_str(),
        })),
    )
}
