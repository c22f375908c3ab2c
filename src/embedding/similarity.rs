//! Cosine similarity between one query vector and a batch of documents.

/// Score every document against `query` by cosine similarity.
///
/// Returns one score per document, in document order. Degenerate input
/// (a zero-norm or non-finite vector anywhere, or any dimension mismatch)
/// yields an empty result instead of partial scores; callers treat that as
/// "nothing rankable". Accumulation is done in `f64`.
pub fn cosine_similarity(query: &[f32], documents: &[Vec<f32>]) -> Vec<f32> {
    if documents.is_empty() {
        return Vec::new();
    }
    let Some(query_norm) = l2_norm(query) else {
        return Vec::new();
    };

    let mut scores = Vec::with_capacity(documents.len());
    for document in documents {
        if document.len() != query.len() {
            return Vec::new();
        }
        let Some(document_norm) = l2_norm(document) else {
            return Vec::new();
        };
        let dot: f64 = query
            .iter()
            .zip(document)
            .map(|(a, b)| f64::from(*a) * f64::from(*b))
            .sum();
        scores.push((dot / (query_norm * document_norm)) as f32);
    }
    scores
}

fn l2_norm(vector: &[f32]) -> Option<f64> {
    let norm = vector
        .iter()
        .map(|x| f64::from(*x) * f64::from(*x))
        .sum::<f64>()
        .sqrt();
    (norm > 0.0 && norm.is_finite()).then_some(norm)
}
