//! End-to-end behaviour of the search service over the in-memory store.
//!
//! These tests use the hashing embedder, so rankings are deterministic and
//! no model download is needed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use screenshot_search::search::{IngestRequest, SearchService, ServiceState};
use screenshot_search::store::{
    DocumentStore, InMemoryStore, ScreenshotRecord, StoreConfig, StoreHandle, StoreMode,
};
use screenshot_search::{ServiceError, Vectorizer};

fn hashing_vectorizer() -> Arc<Vectorizer> {
    Arc::new(Vectorizer::hashing(384))
}

fn memory_service() -> SearchService {
    SearchService::with_store(hashing_vectorizer(), StoreHandle::in_memory())
}

async fn ingest_text(service: &SearchService, filename: &str, text: &str) -> Uuid {
    service
        .ingest(IngestRequest::new(filename, vec![], text, ""))
        .await
        .expect("ingest should succeed")
}

/// Delegates to memory but rejects the n-th insert (1-based).
struct RejectNthStore {
    inner: InMemoryStore,
    reject: usize,
    seen: AtomicUsize,
}

impl RejectNthStore {
    fn new(reject: usize) -> Self {
        Self {
            inner: InMemoryStore::new(),
            reject,
            seen: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DocumentStore for RejectNthStore {
    async fn insert(&self, record: ScreenshotRecord) -> Result<Uuid, ServiceError> {
        let n = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.reject {
            return Err(ServiceError::StorageWrite("disk full".into()));
        }
        self.inner.insert(record).await
    }

    async fn fetch_all_with_vectors(&self) -> Result<Vec<ScreenshotRecord>, ServiceError> {
        self.inner.fetch_all_with_vectors().await
    }

    async fn count(&self) -> u64 {
        self.inner.count().await
    }

    fn describe(&self) -> String {
        "memory://reject-nth".into()
    }
}

/// A store whose reads always fail.
struct UnreadableStore;

#[async_trait]
impl DocumentStore for UnreadableStore {
    async fn insert(&self, _record: ScreenshotRecord) -> Result<Uuid, ServiceError> {
        Ok(Uuid::new_v4())
    }

    async fn fetch_all_with_vectors(&self) -> Result<Vec<ScreenshotRecord>, ServiceError> {
        Err(ServiceError::StorageRead("cursor killed".into()))
    }

    async fn count(&self) -> u64 {
        0
    }

    fn describe(&self) -> String {
        "unreadable".into()
    }
}

#[tokio::test]
async fn test_most_relevant_screenshot_ranks_first() {
    let service = memory_service();
    ingest_text(&service, "a.png", "login error").await;
    ingest_text(&service, "b.png", "blue button").await;
    ingest_text(&service, "c.png", "checkout success").await;

    let outcome = service.search("login failure", 1).await.unwrap();

    assert_eq!(outcome.hits.len(), 1);
    assert_eq!(outcome.hits[0].filename, "a.png");
}

#[tokio::test]
async fn test_stored_screenshot_is_found_among_distractors() {
    let service = memory_service();
    ingest_text(&service, "sheet.png", "quarterly spreadsheet totals").await;
    let id = service
        .ingest(IngestRequest::new(
            "error.png",
            b"\x89PNG".to_vec(),
            "Password incorrect",
            "red alert banner",
        ))
        .await
        .unwrap();
    ingest_text(&service, "button.png", "blue button").await;
    ingest_text(&service, "build.png", "terminal build output").await;

    let outcome = service.search("incorrect password", 5).await.unwrap();

    assert_eq!(outcome.hits.len(), 4);
    let hit = &outcome.hits[0];
    assert_eq!(hit.id, Some(id));
    assert_eq!(hit.filename, "error.png");
    assert_eq!(hit.image_data, b"\x89PNG".to_vec());
    assert!(hit.score <= 1.0 + 1e-5);
    assert!(hit.score > outcome.hits[1].score + 0.3);

    // The same record scored against an unrelated query
    let unrelated = service.search("weather forecast", 5).await.unwrap();
    let unrelated_score = unrelated
        .hits
        .iter()
        .find(|h| h.id == Some(id))
        .map(|h| h.score)
        .unwrap();
    assert!(hit.score > unrelated_score + 0.3);
}

#[tokio::test]
async fn test_top_k_larger_than_pool_returns_whole_pool_sorted() {
    let service = memory_service();
    for (name, text) in [
        ("1.png", "terminal build output"),
        ("2.png", "login error dialog"),
        ("3.png", "spreadsheet totals"),
        ("4.png", "login page"),
    ] {
        ingest_text(&service, name, text).await;
    }

    let outcome = service.search("login error", 50).await.unwrap();

    assert_eq!(outcome.hits.len(), 4);
    for pair in outcome.hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_results_are_truncated_to_top_k() {
    let service = memory_service();
    for i in 0..6 {
        ingest_text(&service, &format!("{i}.png"), &format!("window number {i}")).await;
    }

    let outcome = service.search("window", 2).await.unwrap();
    assert_eq!(outcome.hits.len(), 2);
}

#[tokio::test]
async fn test_count_tracks_ingests() {
    let service = memory_service();
    assert_eq!(service.total_count().await, 0);

    for i in 0..3 {
        ingest_text(&service, &format!("{i}.png"), "some text").await;
    }

    assert_eq!(service.total_count().await, 3);
}

#[tokio::test]
async fn test_unconfigured_store_runs_degraded_after_first_operation() {
    let service = SearchService::new(hashing_vectorizer(), StoreConfig::default());
    assert!(!service.is_degraded_mode());

    ingest_text(&service, "a.png", "hello").await;

    assert!(service.is_degraded_mode());
    assert_eq!(service.state(), ServiceState::Ready(StoreMode::Fallback));
    assert_eq!(service.total_count().await, 1);
}

#[tokio::test]
async fn test_unreachable_store_runs_degraded() {
    let config = StoreConfig {
        uri: Some("mongodb://127.0.0.1:1/?directConnection=true".into()),
        connect_timeout: std::time::Duration::from_millis(200),
        ..StoreConfig::default()
    };
    let service = SearchService::new(hashing_vectorizer(), config);

    assert_eq!(service.connect().await, StoreMode::Fallback);
    assert!(service.is_degraded_mode());

    ingest_text(&service, "a.png", "still works").await;
    let outcome = service.search("still works", 5).await.unwrap();
    assert_eq!(outcome.hits.len(), 1);
}

#[tokio::test]
async fn test_batch_failure_does_not_stop_other_items() {
    let handle = StoreHandle::new(Arc::new(RejectNthStore::new(2)), StoreMode::Durable);
    let service = SearchService::with_store(hashing_vectorizer(), handle);

    let report = service
        .ingest_batch(vec![
            IngestRequest::new("one.png", vec![], "first", ""),
            IngestRequest::new("two.png", vec![], "second", ""),
            IngestRequest::new("three.png", vec![], "third", ""),
        ])
        .await;

    let stored: Vec<&str> = report.stored.iter().map(|s| s.filename.as_str()).collect();
    assert_eq!(stored, vec!["one.png", "three.png"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(report.failures[0].filename, "two.png");
    assert!(report.failures[0].error.contains("disk full"));

    assert_eq!(service.total_count().await, 2);
    assert!(!service.is_degraded_mode());
}

#[tokio::test]
async fn test_store_read_failure_yields_empty_results() {
    let handle = StoreHandle::new(Arc::new(UnreadableStore), StoreMode::Durable);
    let service = SearchService::with_store(hashing_vectorizer(), handle);

    let outcome = service.search("anything", 5).await.unwrap();
    assert!(outcome.hits.is_empty());
}

#[tokio::test]
async fn test_empty_text_embeds_to_model_dimension() {
    let vectorizer = hashing_vectorizer();

    let vector = vectorizer.embed("").await.unwrap();

    assert_eq!(vector.len(), 384);
    assert_eq!(vectorizer.dimension().await.unwrap(), 384);
}

#[tokio::test]
async fn test_screenshot_without_any_text_is_still_searchable() {
    let service = memory_service();
    ingest_text(&service, "blank.png", "").await;
    ingest_text(&service, "login.png", "login form").await;

    let outcome = service.search("login", 5).await.unwrap();

    assert_eq!(outcome.hits.len(), 2);
    assert_eq!(outcome.hits[0].filename, "login.png");
}
