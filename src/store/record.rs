//! The stored screenshot record.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One stored screenshot with its precomputed embedding.
///
/// Records are immutable once stored. `id` is `None` until a store assigns
/// one on insert (a caller may also pre-assign it).
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotRecord {
    pub id: Option<Uuid>,
    /// Display label; not unique
    pub filename: String,
    /// Opaque image payload, stored as-is
    pub image_data: Vec<u8>,
    pub ocr_text: String,
    pub visual_description: String,
    /// The text that was embedded
    pub combined_text: String,
    pub vector: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl ScreenshotRecord {
    /// Build an unsaved record.
    pub fn new(
        filename: impl Into<String>,
        image_data: Vec<u8>,
        ocr_text: impl Into<String>,
        visual_description: impl Into<String>,
        combined_text: impl Into<String>,
        vector: Vec<f32>,
    ) -> Self {
        Self {
            id: None,
            filename: filename.into(),
            image_data,
            ocr_text: ocr_text.into(),
            visual_description: visual_description.into(),
            combined_text: combined_text.into(),
            vector,
            created_at: Utc::now(),
        }
    }

    /// Pre-assign an identifier.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }
}
