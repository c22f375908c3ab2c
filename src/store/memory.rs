//! In-process store used when no durable backend is reachable.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::record::ScreenshotRecord;
use super::DocumentStore;
use crate::error::ServiceError;

/// Append-only list of records, in insertion order.
///
/// Appends take the write lock; scans clone a snapshot under the read lock,
/// so a search never sees a half-inserted record.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<ScreenshotRecord>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert(&self, mut record: ScreenshotRecord) -> Result<Uuid, ServiceError> {
        let mut records = self.records.write().await;

        let id = match record.id {
            Some(id) if records.iter().any(|r| r.id == Some(id)) => {
                return Err(ServiceError::StorageWrite(format!(
                    "record {} already exists",
                    id
                )));
            }
            Some(id) => id,
            None => Uuid::new_v4(),
        };
        record.id = Some(id);

        debug!(id = %id, filename = %record.filename, "Stored screenshot in memory");
        records.push(record);
        Ok(id)
    }

    async fn fetch_all_with_vectors(&self) -> Result<Vec<ScreenshotRecord>, ServiceError> {
        Ok(self.records.read().await.clone())
    }

    async fn count(&self) -> u64 {
        self.records.read().await.len() as u64
    }

    fn describe(&self) -> String {
        "memory://local".to_string()
    }
}
