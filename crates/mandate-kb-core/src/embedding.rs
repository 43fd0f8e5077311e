//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that every embedding backend
//! implements, plus [`cosine_similarity`], the only metric the similarity
//! index uses.
//!
//! Concrete providers (disabled, local hashing, OpenAI-compatible HTTP)
//! live in the `mandate-kb` app crate.

use async_trait::async_trait;

use crate::error::EmbeddingError;

/// Turns text into a fixed-length vector.
///
/// Implementations must always return vectors of length [`dims`](Self::dims).
/// Callers treat any other length as a failure and store the chunk without
/// an embedding.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality.
    fn dims(&self) -> usize;

    /// Prepare the backend (load a model, check an endpoint).
    ///
    /// Called before the first [`embed`](Self::embed) and retried by the
    /// caller on failure. The default is a no-op for providers that need
    /// no warm-up.
    async fn initialize(&self) -> Result<(), EmbeddingError> {
        Ok(())
    }

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, and
/// zero-norm vectors. Float error is clamped so the result never leaves
/// the interval.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0)
}

/// Scale a vector to unit length in place. Zero vectors are left alone.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
        assert!(sim <= 1.0);
    }

    #[test]
    fn test_cosine_symmetric_and_bounded() {
        let pairs: [(Vec<f32>, Vec<f32>); 3] = [
            (vec![1.0, 2.0, 3.0], vec![-0.5, 4.0, 0.25]),
            (vec![0.3, -0.7], vec![-0.3, 0.7]),
            (vec![5.0, 0.0, 1.0, 2.0], vec![0.1, 0.2, 0.3, 0.4]),
        ];
        for (a, b) in &pairs {
            let ab = cosine_similarity(a, b);
            let ba = cosine_similarity(b, a);
            assert!((ab - ba).abs() < 1e-6);
            assert!((-1.0..=1.0).contains(&ab));
        }
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim + 1.0).abs() < 1e-6);
        assert!(sim >= -1.0);
    }

    #[test]
    fn test_cosine_zero_norm() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_different_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }
}
