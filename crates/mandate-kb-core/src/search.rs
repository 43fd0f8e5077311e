//! Brute-force cosine similarity ranking.
//!
//! The knowledge base is small (tens to low thousands of chunks), so a
//! linear scan over every stored vector is all the index there is.
//!
//! # Ordering
//!
//! 1. Chunks with a usable embedding (present and the same length as the
//!    query vector) ranked by cosine similarity, descending.
//! 2. Every other chunk, score 0, after all ranked chunks.
//!
//! Ties keep insertion order (the sort is stable), so when nothing is
//! embedded the result is simply the first `k` chunks.

use std::cmp::Ordering;

use serde::Serialize;

use crate::embedding::cosine_similarity;
use crate::models::DocumentChunk;

/// A chunk paired with its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    /// Cosine similarity in `[-1, 1]`; `0.0` for unranked chunks.
    pub score: f32,
    /// Whether the chunk took part in cosine ranking.
    pub ranked: bool,
}

/// Rank `chunks` against `query` and return the top `k`.
pub fn search(chunks: &[DocumentChunk], query: &[f32], k: usize) -> Vec<ScoredChunk> {
    if k == 0 || chunks.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<ScoredChunk> = chunks
        .iter()
        .map(|chunk| match chunk.embedding.as_deref() {
            Some(e) if !e.is_empty() && e.len() == query.len() => ScoredChunk {
                score: cosine_similarity(query, e),
                chunk: chunk.clone(),
                ranked: true,
            },
            _ => ScoredChunk {
                chunk: chunk.clone(),
                score: 0.0,
                ranked: false,
            },
        })
        .collect();

    scored.sort_by(compare);
    scored.truncate(k);
    scored
}

/// Ranked before unranked, then score descending.
fn compare(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
    b.ranked.cmp(&a.ranked).then_with(|| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
    })
}
