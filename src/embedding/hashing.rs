//! Deterministic feature-hashing embedder.
//!
//! Tokens are lowercased alphanumeric runs; each one is hashed with FNV-1a
//! into a signed bucket. Every text also carries a sequence-start anchor
//! feature, so the empty string embeds to a fixed non-zero vector the same
//! way a transformer's `[CLS]` state does. Output is L2-normalised.
//!
//! Lexical overlap is the only notion of similarity here. It needs no model
//! download and is what tests and offline runs use.

use super::model::EmbeddingModel;
use crate::error::ServiceError;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

const ANCHOR_TOKEN: &str = "\u{0}[start]";
const ANCHOR_WEIGHT: f32 = 0.5;
const TOKEN_WEIGHT: f32 = 1.0;

/// Feature-hashing embedding model with a configurable dimension.
#[derive(Debug, Clone)]
pub struct HashingModel {
    dimension: usize,
    name: String,
}

impl HashingModel {
    /// Create a hashing model producing `dimension`-length vectors.
    pub fn new(dimension: usize) -> Result<Self, ServiceError> {
        if dimension == 0 {
            return Err(ServiceError::ModelUnavailable(
                "hashing dimension must be greater than zero".into(),
            ));
        }
        Ok(Self {
            dimension,
            name: format!("fnv1a-hash-{}", dimension),
        })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        self.accumulate(&mut vector, ANCHOR_TOKEN, ANCHOR_WEIGHT);
        for token in tokenize(text) {
            self.accumulate(&mut vector, &token, TOKEN_WEIGHT);
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        // The anchor can only cancel against a colliding token of opposite
        // sign; fall back to the raw vector rather than dividing by zero.
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], token: &str, weight: f32) {
        let hash = fnv1a(token.as_bytes());
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl EmbeddingModel for HashingModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ServiceError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a(b""), FNV_OFFSET_BASIS);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_zero_dimension_is_rejected() {
        assert!(matches!(
            HashingModel::new(0),
            Err(ServiceError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_vectors_have_fixed_dimension_and_unit_norm() {
        let model = HashingModel::new(384).unwrap();
        let vectors = model
            .embed(&["login error", "", "a much longer piece of OCR text"])
            .unwrap();

        assert_eq!(vectors.len(), 3);
        for v in &vectors {
            assert_eq!(v.len(), 384);
            let norm = dot(v, v).sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_embedding_is_deterministic_and_case_insensitive() {
        let model = HashingModel::new(384).unwrap();
        let a = model.embed(&["Checkout SUCCESS!"]).unwrap();
        let b = model.embed(&["checkout success"]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shared_tokens_score_higher() {
        let model = HashingModel::new(384).unwrap();
        let v = model
            .embed(&["login failure", "login error", "blue button"])
            .unwrap();

        assert!(dot(&v[0], &v[1]) > dot(&v[0], &v[2]));
    }

    #[test]
    fn test_name_includes_dimension() {
        let model = HashingModel::new(64).unwrap();
        assert_eq!(model.name(), "fnv1a-hash-64");
        assert_eq!(model.dimension(), 64);
    }
}
