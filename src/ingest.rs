//! Ingestion pipeline: chunk inputs → embedding → store.
//!
//! Embedding is inline and non-fatal. A chunk whose embedding fails, or
//! comes back with the wrong dimensionality, is stored without one and
//! stays reachable through the retrieval fallbacks.
//!
//! Inputs are processed in batches of `batch_size`. Within a batch every
//! embedding call runs concurrently; the next batch starts only when the
//! whole batch has settled, so no more than `batch_size` requests are ever
//! in flight. Chunks are inserted in input order regardless of which
//! embedding finished first.

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mandate_kb_core::models::{ChunkInput, DocumentChunk};
use mandate_kb_core::store::{DocumentStore, Inserted};

use crate::embedding::Embedder;

/// Counters from one [`add_chunks`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Chunks written to the store.
    pub added: usize,
    /// Of those, chunks stored with an embedding.
    pub embedded: usize,
    /// Of those, chunks stored without an embedding.
    pub degraded: usize,
    /// Inputs dropped for having blank text.
    pub skipped: usize,
}

/// Embed and store `inputs`.
///
/// Missing ids get a random UUID and missing dates the current UTC time.
/// Never fails: every non-blank input ends up in the store.
pub async fn add_chunks(
    store: &DocumentStore,
    embedder: &Embedder,
    inputs: Vec<ChunkInput>,
    batch_size: usize,
) -> IngestStats {
    let mut stats = IngestStats::default();
    let batch_size = batch_size.max(1);

    let (inputs, blank): (Vec<_>, Vec<_>) =
        inputs.into_iter().partition(|i| !i.text.trim().is_empty());
    for input in &blank {
        warn!(source = %input.source, id = ?input.id, "skipping chunk with empty text");
    }
    stats.skipped = blank.len();

    // Resolve initialization once up front so a degraded provider does not
    // cost one failed call per chunk.
    let ready = embedder.ensure_ready().await;

    for (batch_no, batch) in inputs.chunks(batch_size).enumerate() {
        let vectors = if ready {
            join_all(batch.iter().map(|input| embedder.embed(&input.text))).await
        } else {
            Vec::new()
        };

        for (i, input) in batch.iter().enumerate() {
            let embedding = match vectors.get(i) {
                Some(Ok(v)) => Some(v.clone()),
                Some(Err(e)) => {
                    warn!(source = %input.source, error = %e, "embedding failed; storing without vector");
                    None
                }
                None => None,
            };
            let chunk = DocumentChunk {
                id: input
                    .id
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
                text: input.text.clone(),
                source: input.source.clone(),
                date: input.date.clone().unwrap_or_else(|| Utc::now().to_rfc3339()),
                embedding,
            };
            match store.insert(chunk) {
                Inserted::Embedded => stats.embedded += 1,
                Inserted::Degraded => stats.degraded += 1,
            }
            stats.added += 1;
        }
        debug!(batch = batch_no, size = batch.len(), "batch stored");
    }

    info!(
        added = stats.added,
        embedded = stats.embedded,
        degraded = stats.degraded,
        skipped = stats.skipped,
        "ingest complete"
    );
    stats
}
