//! Search orchestration: ingest and ranked retrieval over the selected store.

mod types;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::OnceCell;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::embedding::Vectorizer;
use crate::error::ServiceError;
use crate::metrics;
use crate::store::{self, ScreenshotRecord, StoreConfig, StoreHandle, StoreMode};
use crate::text::combine_text;

pub use types::{
    BatchReport, IngestFailure, IngestRequest, SearchHit, SearchOutcome, ServiceState, StoredItem,
};

/// Ingest and query workflows over a vectorizer and a document store.
///
/// The store is connected on first use. Connecting always ends in a ready
/// state: either durable or, when MongoDB is absent or unreachable, the
/// in-memory fallback. `is_degraded_mode` reports which.
pub struct SearchService {
    vectorizer: Arc<Vectorizer>,
    store_config: StoreConfig,
    store: OnceCell<StoreHandle>,
    connecting: AtomicBool,
}

impl std::fmt::Debug for SearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchService")
            .field("vectorizer", &self.vectorizer)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl SearchService {
    /// Create a service that connects to the configured store on first use.
    pub fn new(vectorizer: Arc<Vectorizer>, store_config: StoreConfig) -> Self {
        Self {
            vectorizer,
            store_config,
            store: OnceCell::new(),
            connecting: AtomicBool::new(false),
        }
    }

    /// Create a service over an already selected store.
    pub fn with_store(vectorizer: Arc<Vectorizer>, handle: StoreHandle) -> Self {
        metrics::set_store_degraded(handle.is_degraded());
        Self {
            vectorizer,
            store_config: StoreConfig::default(),
            store: OnceCell::new_with(Some(handle)),
            connecting: AtomicBool::new(false),
        }
    }

    pub fn vectorizer(&self) -> &Arc<Vectorizer> {
        &self.vectorizer
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServiceState {
        match self.store.get() {
            Some(handle) => ServiceState::Ready(handle.mode()),
            None if self.connecting.load(Ordering::SeqCst) => ServiceState::Connecting,
            None => ServiceState::Uninitialized,
        }
    }

    /// Connect now instead of on the first operation.
    pub async fn connect(&self) -> StoreMode {
        self.store().await.mode()
    }

    async fn store(&self) -> &StoreHandle {
        self.store
            .get_or_init(|| async {
                self.connecting.store(true, Ordering::SeqCst);
                let handle = store::connect(&self.store_config).await;
                metrics::set_store_degraded(handle.is_degraded());
                self.connecting.store(false, Ordering::SeqCst);
                handle
            })
            .await
    }

    /// Embed and store one screenshot.
    pub async fn ingest(&self, request: IngestRequest) -> Result<Uuid, ServiceError> {
        let filename = request.filename.clone();

        match self.ingest_one(request).await {
            Ok(id) => {
                metrics::increment_ingest_count();
                info!(id = %id, filename = %filename, "Stored screenshot");
                Ok(id)
            }
            Err(e) => {
                metrics::increment_ingest_errors();
                warn!(filename = %filename, error = %e, "Failed to store screenshot");
                Err(e)
            }
        }
    }

    async fn ingest_one(&self, request: IngestRequest) -> Result<Uuid, ServiceError> {
        let combined_text = combine_text(&request.ocr_text, &request.visual_description);
        let vector = self.vectorizer.embed(&combined_text).await?;

        let record = ScreenshotRecord::new(
            request.filename,
            request.image_data,
            request.ocr_text,
            request.visual_description,
            combined_text,
            vector,
        );

        self.store().await.store().insert(record).await
    }

    /// Ingest items in order. A failing item is reported and skipped; it
    /// never stops the rest of the batch.
    pub async fn ingest_batch(&self, requests: Vec<IngestRequest>) -> BatchReport {
        let total = requests.len();
        let mut report = BatchReport::default();

        for (index, request) in requests.into_iter().enumerate() {
            let filename = request.filename.clone();
            match self.ingest(request).await {
                Ok(id) => report.stored.push(StoredItem {
                    index,
                    filename,
                    id,
                }),
                Err(e) => report.failures.push(IngestFailure {
                    index,
                    filename,
                    error: e.to_string(),
                }),
            }
        }

        info!(
            total,
            stored = report.stored.len(),
            failed = report.failures.len(),
            "Batch ingest completed"
        );
        report
    }

    /// Rank stored screenshots against `query`, best first.
    ///
    /// Returns at most `top_k` hits; fewer when the store holds fewer. A
    /// failed store read or degenerate vectors give an empty result, while
    /// an unavailable model is returned as an error.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<SearchOutcome, ServiceError> {
        if top_k == 0 {
            return Err(ServiceError::InvalidRequest(
                "top_k must be at least 1".into(),
            ));
        }

        let start = Instant::now();

        let query_vector = self.vectorizer.embed(query).await.map_err(|e| {
            metrics::increment_search_errors();
            error!(query = %query, error = %e, "Failed to embed search query");
            e
        })?;

        let pool = match self.store().await.store().fetch_all_with_vectors().await {
            Ok(pool) => pool,
            Err(e) => {
                metrics::increment_search_errors();
                error!(query = %query, error = %e, "Store scan failed, returning no results");
                Vec::new()
            }
        };

        let hits = self.rank(&query_vector, pool, top_k);
        let took_ms = start.elapsed().as_millis() as u64;

        metrics::record_search_latency(took_ms as f64);
        metrics::increment_search_count();

        info!(
            query = %query,
            top_k,
            hits = hits.len(),
            took_ms,
            "Search completed"
        );

        Ok(SearchOutcome { hits, took_ms })
    }

    fn rank(&self, query: &[f32], pool: Vec<ScreenshotRecord>, top_k: usize) -> Vec<SearchHit> {
        if pool.is_empty() {
            return Vec::new();
        }

        let (records, vectors): (Vec<ScreenshotRecord>, Vec<Vec<f32>>) = pool
            .into_iter()
            .map(|mut record| {
                let vector = std::mem::take(&mut record.vector);
                (record, vector)
            })
            .unzip();

        let scores = self.vectorizer.similarity(query, &vectors);
        if scores.len() != records.len() {
            warn!(
                pool = records.len(),
                "Degenerate vectors in similarity input, no rankable results"
            );
            return Vec::new();
        }

        let mut ranked: Vec<(ScreenshotRecord, f32)> = records.into_iter().zip(scores).collect();
        // sort_by is stable: equal scores keep fetch order.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(top_k);

        ranked
            .into_iter()
            .map(|(record, score)| SearchHit::from_record(record, score))
            .collect()
    }

    /// Number of stored screenshots; 0 when the backend is unreachable.
    pub async fn total_count(&self) -> u64 {
        self.store().await.store().count().await
    }

    /// True once the session has settled on the in-memory fallback store.
    pub fn is_degraded_mode(&self) -> bool {
        self.store
            .get()
            .map(StoreHandle::is_degraded)
            .unwrap_or(false)
    }
}
