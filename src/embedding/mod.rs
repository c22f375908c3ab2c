//! Text embedding and similarity scoring.
//!
//! This module provides an `EmbeddingModel` trait and implementations:
//! - `HashingModel` - Deterministic feature hashing, always available
//! - `FastEmbedModel` - Sentence-transformer models (feature `fastembed`)
//!
//! `Vectorizer` wraps whichever model is configured and is the only type the
//! rest of the crate talks to.

#[cfg(feature = "fastembed")]
mod fastembed_model;
mod hashing;
mod model;
mod similarity;
mod vectorizer;

#[cfg(feature = "fastembed")]
pub use fastembed_model::FastEmbedModel;
pub use hashing::HashingModel;
pub use model::EmbeddingModel;
pub use similarity::cosine_similarity;
pub use vectorizer::Vectorizer;
