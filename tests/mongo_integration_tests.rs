//! Tests against a live MongoDB.
//!
//! Ignored by default. Run with a reachable server:
//! `MONGODB_URI=mongodb://localhost:27017 cargo test -- --ignored`

use std::sync::Arc;
use std::time::Duration;

use screenshot_search::search::{IngestRequest, SearchService};
use screenshot_search::store::{self, StoreConfig, StoreMode};
use screenshot_search::Vectorizer;

fn live_config() -> Option<StoreConfig> {
    let uri = std::env::var("MONGODB_URI").ok()?;
    Some(StoreConfig {
        uri: Some(uri),
        database: "visual_memory_search_test".to_string(),
        collection: format!("screenshots_{}", uuid::Uuid::new_v4().simple()),
        connect_timeout: Duration::from_secs(5),
    })
}

#[tokio::test]
#[ignore = "requires MONGODB_URI"]
async fn test_durable_round_trip() {
    let Some(config) = live_config() else {
        return;
    };

    let handle = store::connect(&config).await;
    assert_eq!(handle.mode(), StoreMode::Durable);

    let service = SearchService::with_store(Arc::new(Vectorizer::hashing(384)), handle);
    assert_eq!(service.total_count().await, 0);

    let first = service
        .ingest(IngestRequest::new("a.png", vec![1, 2, 3], "login error", ""))
        .await
        .unwrap();
    service
        .ingest(IngestRequest::new("b.png", vec![], "blue button", ""))
        .await
        .unwrap();

    assert_eq!(service.total_count().await, 2);
    assert!(!service.is_degraded_mode());

    let outcome = service.search("login failure", 5).await.unwrap();
    assert_eq!(outcome.hits.len(), 2);
    assert_eq!(outcome.hits[0].id, Some(first));
    assert_eq!(outcome.hits[0].image_data, vec![1, 2, 3]);
}
