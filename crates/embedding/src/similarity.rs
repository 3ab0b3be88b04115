//! Cosine similarity and threshold ranking.
//!
//! Sums are accumulated in `f64` and the final score is clamped to [-1, 1],
//! so rounding on long vectors cannot produce out-of-range scores.

use crate::{EmbeddingError, EmbeddingVector, SimilarityResult};

/// Cosine similarity `dot(a, b) / (|a| * |b|)`.
///
/// Fails with [`EmbeddingError::DimensionMismatch`] for unequal lengths and
/// [`EmbeddingError::DegenerateVector`] when either input has zero magnitude
/// (including the empty vector).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, EmbeddingError> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(EmbeddingError::DegenerateVector);
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    Ok(score.clamp(-1.0, 1.0) as f32)
}

/// Checks that a ranking threshold is a finite value in [-1, 1].
pub fn validate_threshold(threshold: f32) -> Result<(), EmbeddingError> {
    if threshold.is_finite() && (-1.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(EmbeddingError::InvalidInput(format!(
            "threshold must be within [-1, 1], got {threshold}"
        )))
    }
}

/// Scores every candidate against `query`, keeps those with `score >= threshold`
/// and sorts them by descending score. The sort is stable: equal scores keep
/// their candidate order.
pub fn rank_candidates(
    query: &EmbeddingVector,
    candidates: &[String],
    vectors: &[EmbeddingVector],
    threshold: f32,
) -> Result<Vec<SimilarityResult>, EmbeddingError> {
    validate_threshold(threshold)?;
    if candidates.len() != vectors.len() {
        return Err(EmbeddingError::InvalidInput(format!(
            "{} candidates but {} embeddings",
            candidates.len(),
            vectors.len()
        )));
    }

    let mut results = Vec::with_capacity(candidates.len());
    for (index, (text, vector)) in candidates.iter().zip(vectors).enumerate() {
        let score = cosine_similarity(query.as_slice(), vector.as_slice())?;
        if score >= threshold {
            results.push(SimilarityResult {
                text: text.clone(),
                index,
                score,
            });
        }
    }

    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(results)
}
