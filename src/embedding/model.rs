//! Embedding model trait shared by all backends.

use crate::error::ServiceError;

/// A loaded text embedding model.
///
/// Implementations are immutable once constructed and must be safe for
/// concurrent read-only use; the vectorizer calls them from blocking tasks.
pub trait EmbeddingModel: Send + Sync {
    /// Human-readable model identifier.
    fn name(&self) -> &str;

    /// Length of every vector this model produces.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ServiceError>;
}
