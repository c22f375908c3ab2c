//! Screenshot record storage with a documented failover policy.
//!
//! This module provides a `DocumentStore` trait and implementations:
//! - `MongoStore` - Durable MongoDB collection
//! - `InMemoryStore` - Process-local fallback
//!
//! `connect` picks one once per session. If no MongoDB URI is configured or
//! the connection attempt fails, it returns the in-memory store flagged as
//! degraded; it never fails itself and never switches later.

mod memory;
mod mongo;
mod record;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ServiceError;

pub use memory::InMemoryStore;
pub use mongo::MongoStore;
pub use record::ScreenshotRecord;

/// Keyed, append-only storage of screenshot records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append a record, assigning an id when it has none. Never overwrites.
    async fn insert(&self, record: ScreenshotRecord) -> Result<Uuid, ServiceError>;

    /// Every stored record with its vector, in insertion order.
    ///
    /// This is a full scan, not an indexed search.
    async fn fetch_all_with_vectors(&self) -> Result<Vec<ScreenshotRecord>, ServiceError>;

    /// Number of stored records; 0 when the backend cannot be reached.
    async fn count(&self) -> u64;

    /// Where the records live, for logs and status output.
    fn describe(&self) -> String;
}

/// Connection settings for the durable backend.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// MongoDB connection string; `None` selects the in-memory store
    pub uri: Option<String>,
    pub database: String,
    pub collection: String,
    pub connect_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: None,
            database: "visual_memory_search".to_string(),
            collection: "screenshots".to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Which kind of store a session ended up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreMode {
    Durable,
    Fallback,
}

/// The store selected for a session, plus how it was selected.
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<dyn DocumentStore>,
    mode: StoreMode,
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("mode", &self.mode)
            .field("location", &self.store.describe())
            .finish()
    }
}

impl StoreHandle {
    /// Wrap any store with an explicit mode.
    pub fn new(store: Arc<dyn DocumentStore>, mode: StoreMode) -> Self {
        Self { store, mode }
    }

    /// A fresh in-memory store in fallback mode.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()), StoreMode::Fallback)
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    pub fn is_degraded(&self) -> bool {
        self.mode == StoreMode::Fallback
    }
}

/// Connect to the configured durable store, falling back to memory.
pub async fn connect(config: &StoreConfig) -> StoreHandle {
    let Some(uri) = config.uri.as_deref() else {
        warn!("MONGODB_URI not set, using in-memory fallback storage");
        return StoreHandle::in_memory();
    };

    match MongoStore::connect(uri, config).await {
        Ok(store) => {
            info!(location = %store.describe(), "Using durable storage");
            StoreHandle::new(Arc::new(store), StoreMode::Durable)
        }
        Err(e) => {
            warn!(error = %e, "MongoDB connection failed, using in-memory fallback storage");
            StoreHandle::in_memory()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_without_uri_falls_back() {
        let handle = connect(&StoreConfig::default()).await;

        assert_eq!(handle.mode(), StoreMode::Fallback);
        assert!(handle.is_degraded());
        assert_eq!(handle.store().count().await, 0);
        assert_eq!(handle.store().describe(), "memory://local");
    }

    #[tokio::test]
    async fn test_connect_with_unparseable_uri_falls_back() {
        let config = StoreConfig {
            uri: Some("not-a-mongodb-uri".to_string()),
            ..StoreConfig::default()
        };

        let handle = connect(&config).await;
        assert!(handle.is_degraded());
    }

    #[tokio::test]
    async fn test_connect_with_unreachable_server_falls_back() {
        let config = StoreConfig {
            uri: Some("mongodb://127.0.0.1:1/?directConnection=true".to_string()),
            connect_timeout: Duration::from_millis(200),
            ..StoreConfig::default()
        };

        let handle = connect(&config).await;
        assert!(handle.is_degraded());
    }

    #[test]
    fn test_store_mode_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&StoreMode::Fallback).unwrap(),
            "\"fallback\""
        );
    }
}
