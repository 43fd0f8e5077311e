//! In-memory document store.
//!
//! Holds every [`DocumentChunk`] in insertion order behind a
//! `parking_lot::RwLock`. Nothing is persisted: the store is rebuilt from
//! connectors at startup and on every refresh.
//!
//! The store itself never calls an embedding backend. The app crate's
//! ingestion pipeline embeds chunks and hands finished [`DocumentChunk`]s
//! to [`DocumentStore::insert`], which enforces the single-dimensionality
//! invariant.

use parking_lot::RwLock;

use crate::models::DocumentChunk;

/// Outcome of inserting one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    /// Stored with its embedding.
    Embedded,
    /// Stored without an embedding (none supplied, or dropped for a
    /// dimension mismatch).
    Degraded,
}

#[derive(Default)]
struct Inner {
    chunks: Vec<DocumentChunk>,
    /// Length shared by every stored embedding, fixed by the first one.
    dims: Option<usize>,
}

/// Thread-safe, insertion-ordered collection of chunks.
#[derive(Default)]
pub struct DocumentStore {
    inner: RwLock<Inner>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk.
    ///
    /// An embedding whose length differs from the dimensionality already
    /// present in the store is discarded; the chunk is kept without it.
    pub fn insert(&self, mut chunk: DocumentChunk) -> Inserted {
        let mut inner = self.inner.write();
        let outcome = match chunk.embedding.as_ref().map(Vec::len) {
            Some(0) | None => {
                chunk.embedding = None;
                Inserted::Degraded
            }
            Some(len) => match inner.dims {
                Some(dims) if dims != len => {
                    chunk.embedding = None;
                    Inserted::Degraded
                }
                _ => {
                    inner.dims = Some(len);
                    Inserted::Embedded
                }
            },
        };
        inner.chunks.push(chunk);
        outcome
    }

    /// Remove every chunk.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.chunks.clear();
        inner.dims = None;
    }

    pub fn count(&self) -> usize {
        self.inner.read().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Snapshot of every chunk in insertion order.
    pub fn all(&self) -> Vec<DocumentChunk> {
        self.inner.read().chunks.clone()
    }

    /// The first `k` chunks in insertion order.
    pub fn first(&self, k: usize) -> Vec<DocumentChunk> {
        self.inner.read().chunks.iter().take(k).cloned().collect()
    }

    /// Up to `k` chunks matching `pred`, in insertion order.
    pub fn filter<F>(&self, k: usize, pred: F) -> Vec<DocumentChunk>
    where
        F: Fn(&DocumentChunk) -> bool,
    {
        self.inner
            .read()
            .chunks
            .iter()
            .filter(|c| pred(c))
            .take(k)
            .cloned()
            .collect()
    }

    /// Dimensionality of the stored embeddings, if any chunk has one.
    pub fn dims(&self) -> Option<usize> {
        self.inner.read().dims
    }

    pub fn embedded_count(&self) -> usize {
        self.inner
            .read()
            .chunks
            .iter()
            .filter(|c| c.is_embedded())
            .count()
    }
}
