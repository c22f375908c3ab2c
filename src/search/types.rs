//! Request and result types of the search service.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::store::{ScreenshotRecord, StoreMode};

/// A screenshot to ingest, with the text its producers extracted.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub filename: String,
    pub image_data: Vec<u8>,
    /// OCR output; may be empty
    pub ocr_text: String,
    /// Vision model description; may be empty or an error message
    pub visual_description: String,
}

impl IngestRequest {
    pub fn new(
        filename: impl Into<String>,
        image_data: Vec<u8>,
        ocr_text: impl Into<String>,
        visual_description: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            image_data,
            ocr_text: ocr_text.into(),
            visual_description: visual_description.into(),
        }
    }
}

/// A ranked search result: the record without its vector, plus its score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: Option<Uuid>,
    pub filename: String,
    #[serde(rename = "image_base64", serialize_with = "serialize_base64")]
    pub image_data: Vec<u8>,
    pub ocr_text: String,
    pub visual_description: String,
    pub combined_text: String,
    pub created_at: DateTime<Utc>,
    /// Cosine similarity to the query, in [-1, 1]
    pub score: f32,
}

impl SearchHit {
    pub(crate) fn from_record(record: ScreenshotRecord, score: f32) -> Self {
        Self {
            id: record.id,
            filename: record.filename,
            image_data: record.image_data,
            ocr_text: record.ocr_text,
            visual_description: record.visual_description,
            combined_text: record.combined_text,
            created_at: record.created_at,
            score,
        }
    }
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

/// Hits ordered by descending score, with timing.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,
    pub took_ms: u64,
}

/// One successfully stored batch item.
#[derive(Debug, Clone, Serialize)]
pub struct StoredItem {
    pub index: usize,
    pub filename: String,
    pub id: Uuid,
}

/// One batch item that could not be stored.
#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    pub index: usize,
    pub filename: String,
    pub error: String,
}

/// Outcome of a batch ingest; failures never stop the batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub stored: Vec<StoredItem>,
    pub failures: Vec<IngestFailure>,
}

/// Lifecycle of the search service's store connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Connecting,
    Ready(StoreMode),
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Uninitialized => "uninitialized",
            ServiceState::Connecting => "connecting",
            ServiceState::Ready(StoreMode::Durable) => "ready_durable",
            ServiceState::Ready(StoreMode::Fallback) => "ready_fallback",
        }
    }
}
