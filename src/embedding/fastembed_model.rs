//! Sentence-transformer embeddings through fastembed (ONNX runtime).

use fastembed::{EmbeddingModel as FastEmbedModelKind, InitOptions, TextEmbedding};
use tracing::info;

use super::model::EmbeddingModel;
use crate::error::ServiceError;

/// Local ONNX embedding model, downloaded and cached by fastembed on first load.
pub struct FastEmbedModel {
    name: String,
    dimension: usize,
    inner: TextEmbedding,
}

impl std::fmt::Debug for FastEmbedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedModel")
            .field("name", &self.name)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl FastEmbedModel {
    /// Load the named model. Blocking: may download weights.
    pub fn load(model_name: &str) -> Result<Self, ServiceError> {
        let kind = resolve_model(model_name)?;

        info!(model = model_name, "Loading fastembed model");

        let inner = TextEmbedding::try_new(
            InitOptions::new(kind).with_show_download_progress(false),
        )
        .map_err(|e| ServiceError::ModelUnavailable(format!("{}: {}", model_name, e)))?;

        // Probe once so the dimension never has to be hardcoded per model.
        let probe = inner
            .embed(vec!["test"], None)
            .map_err(|e| ServiceError::ModelUnavailable(format!("{}: {}", model_name, e)))?;
        let dimension = probe.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            return Err(ServiceError::ModelUnavailable(format!(
                "{}: probe embedding was empty",
                model_name
            )));
        }

        info!(model = model_name, dimension, "Fastembed model loaded");

        Ok(Self {
            name: model_name.to_string(),
            dimension,
            inner,
        })
    }
}

impl EmbeddingModel for FastEmbedModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ServiceError> {
        self.inner
            .embed(texts.to_vec(), None)
            .map_err(|e| ServiceError::Internal(format!("Embedding generation failed: {}", e)))
    }
}

fn resolve_model(model_name: &str) -> Result<FastEmbedModelKind, ServiceError> {
    let short = model_name
        .trim()
        .trim_start_matches("sentence-transformers/")
        .trim_start_matches("BAAI/")
        .to_lowercase();

    match short.as_str() {
        "all-minilm-l6-v2" => Ok(FastEmbedModelKind::AllMiniLML6V2),
        "all-minilm-l12-v2" => Ok(FastEmbedModelKind::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(FastEmbedModelKind::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(FastEmbedModelKind::BGEBaseENV15),
        _ => Err(ServiceError::ModelUnavailable(format!(
            "unsupported embedding model '{}'",
            model_name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_models() {
        assert!(matches!(
            resolve_model("all-MiniLM-L6-v2"),
            Ok(FastEmbedModelKind::AllMiniLML6V2)
        ));
        assert!(matches!(
            resolve_model("sentence-transformers/all-MiniLM-L6-v2"),
            Ok(FastEmbedModelKind::AllMiniLML6V2)
        ));
        assert!(matches!(
            resolve_model("BAAI/bge-small-en-v1.5"),
            Ok(FastEmbedModelKind::BGESmallENV15)
        ));
    }

    #[test]
    fn test_resolve_unknown_model() {
        assert!(matches!(
            resolve_model("gpt-embedder-9000"),
            Err(ServiceError::ModelUnavailable(_))
        ));
    }
}
