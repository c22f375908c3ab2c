//! The vectorizer service object: lazy model loading, embedding, scoring.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{error, info};

use super::hashing::HashingModel;
use super::model::EmbeddingModel;
use super::similarity::cosine_similarity;
use crate::config::{Config, EmbeddingBackend};
use crate::error::ServiceError;

type ModelLoader = dyn Fn() -> Result<Arc<dyn EmbeddingModel>, ServiceError> + Send + Sync;

const DIMENSION_PROBE: &str = "test";

/// Turns text into vectors and scores vectors against each other.
///
/// Construct one per process and share it behind an `Arc`. The model is
/// loaded on first use (or by [`Vectorizer::warm_up`]); loading is the one
/// expensive step, so concurrent first callers wait on a single load instead
/// of each starting their own. A failed load leaves the vectorizer unloaded
/// and the next call tries again. The load runs in its own task, so a caller
/// that gives up mid-load does not throw the loaded model away.
pub struct Vectorizer {
    label: String,
    loader: Arc<ModelLoader>,
    model: Arc<OnceCell<Arc<dyn EmbeddingModel>>>,
}

impl std::fmt::Debug for Vectorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vectorizer")
            .field("label", &self.label)
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

impl Vectorizer {
    /// Create a vectorizer that loads its model with `loader` on first use.
    pub fn new<F>(label: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn EmbeddingModel>, ServiceError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            loader: Arc::new(loader),
            model: Arc::new(OnceCell::new()),
        }
    }

    /// Wrap an already loaded model.
    pub fn with_model(model: Arc<dyn EmbeddingModel>) -> Self {
        let label = model.name().to_string();
        let reload = Arc::clone(&model);
        Self {
            label,
            loader: Arc::new(move || Ok::<_, ServiceError>(Arc::clone(&reload))),
            model: Arc::new(OnceCell::new_with(Some(model))),
        }
    }

    /// Vectorizer backed by the feature-hashing model.
    pub fn hashing(dimension: usize) -> Self {
        Self::new(format!("fnv1a-hash-{}", dimension), move || {
            Ok(Arc::new(HashingModel::new(dimension)?) as Arc<dyn EmbeddingModel>)
        })
    }

    /// Vectorizer for the backend selected in configuration.
    pub fn from_config(config: &Config) -> Self {
        match config.embedding_backend {
            EmbeddingBackend::Hash => Self::hashing(config.embedding_dimension),
            EmbeddingBackend::FastEmbed => Self::fastembed(config.embedding_model.clone()),
        }
    }

    #[cfg(feature = "fastembed")]
    fn fastembed(model_name: String) -> Self {
        Self::new(model_name.clone(), move || {
            let model = super::fastembed_model::FastEmbedModel::load(&model_name)?;
            Ok(Arc::new(model) as Arc<dyn EmbeddingModel>)
        })
    }

    #[cfg(not(feature = "fastembed"))]
    fn fastembed(model_name: String) -> Self {
        Self::new(model_name, || {
            Err(ServiceError::ModelUnavailable(
                "built without the `fastembed` feature".into(),
            ))
        })
    }

    /// Name of the configured model.
    pub fn model_name(&self) -> &str {
        &self.label
    }

    /// Whether the model has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// Load the model now instead of on the first request.
    pub async fn warm_up(&self) -> Result<(), ServiceError> {
        self.model().await.map(|_| ())
    }

    async fn model(&self) -> Result<Arc<dyn EmbeddingModel>, ServiceError> {
        if let Some(model) = self.model.get() {
            return Ok(Arc::clone(model));
        }

        let cell = Arc::clone(&self.model);
        let loader = Arc::clone(&self.loader);
        let label = self.label.clone();
        let load = tokio::spawn(async move {
            cell.get_or_try_init(|| load_model(label, loader))
                .await
                .map(Arc::clone)
        });

        load.await
            .map_err(|e| ServiceError::ModelUnavailable(format!("model load task failed: {}", e)))?
    }

    /// Embed a single text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::Internal("model returned no embedding".into()))
    }

    /// Embed many texts, one vector per input. Empty input returns empty
    /// output without touching the model.
    pub async fn embed_batch<S: AsRef<str>>(
        &self,
        texts: &[S],
    ) -> Result<Vec<Vec<f32>>, ServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model().await?;
        let expected = model.dimension();
        let owned: Vec<String> = texts.iter().map(|t| t.as_ref().to_string()).collect();

        let vectors = tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = owned.iter().map(String::as_str).collect();
            model.embed(&refs)
        })
        .await
        .map_err(|e| ServiceError::Internal(format!("Embedding task error: {}", e)))??;

        if vectors.len() != texts.len() {
            return Err(ServiceError::Internal(format!(
                "model returned {} embeddings for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(ServiceError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }

        Ok(vectors)
    }

    /// Cosine similarity of `query` against each document; empty when any
    /// input is degenerate.
    pub fn similarity(&self, query: &[f32], documents: &[Vec<f32>]) -> Vec<f32> {
        cosine_similarity(query, documents)
    }

    /// Output dimension of the model. Free once the model is loaded;
    /// otherwise loads it and embeds a probe string.
    pub async fn dimension(&self) -> Result<usize, ServiceError> {
        if let Some(model) = self.model.get() {
            return Ok(model.dimension());
        }
        Ok(self.embed(DIMENSION_PROBE).await?.len())
    }
}

async fn load_model(
    label: String,
    loader: Arc<ModelLoader>,
) -> Result<Arc<dyn EmbeddingModel>, ServiceError> {
    info!(model = %label, "Loading embedding model");

    let loaded = tokio::task::spawn_blocking(move || loader())
        .await
        .map_err(|e| ServiceError::ModelUnavailable(format!("model load task failed: {}", e)))?;

    match &loaded {
        Ok(model) => info!(
            model = %label,
            dimension = model.dimension(),
            "Embedding model loaded"
        ),
        Err(e) => error!(model = %label, error = %e, "Failed to load embedding model"),
    }
    loaded
}
