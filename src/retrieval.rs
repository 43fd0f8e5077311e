//! Retrieval: pick the chunks a reply should be grounded in.
//!
//! Three strategies, tried in order:
//!
//! | Strategy | When | Result |
//! |----------|------|--------|
//! | Keyword override | query contains the trigger word (`mandate`) | canonical chunks in store order |
//! | Similarity | embedder ready, query embedded | cosine top-K |
//! | First-K | embedding unavailable or failed | first K chunks in store order |
//!
//! [`RetrievalService::retrieve`] never fails. An empty result means the
//! store is empty. A trigger word with no canonical chunks stored falls
//! through to similarity.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use mandate_kb_core::models::DocumentChunk;
use mandate_kb_core::search::search;
use mandate_kb_core::store::DocumentStore;

use crate::config::RetrievalConfig;
use crate::embedding::Embedder;

/// Which path produced a retrieval result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    KeywordOverride,
    Similarity,
    FirstK,
}

#[derive(Debug, Clone)]
pub struct Retrieved {
    pub chunks: Vec<DocumentChunk>,
    pub strategy: Strategy,
}

pub struct RetrievalService {
    store: Arc<DocumentStore>,
    embedder: Arc<Embedder>,
    trigger: String,
    canonical_source: String,
}

impl RetrievalService {
    pub fn new(store: Arc<DocumentStore>, embedder: Arc<Embedder>, config: &RetrievalConfig) -> Self {
        Self {
            store,
            embedder,
            trigger: config.canonical_trigger.to_lowercase(),
            canonical_source: config.canonical_source.to_lowercase(),
        }
    }

    /// Up to `k` chunks relevant to `query`.
    pub async fn retrieve(&self, query: &str, k: usize) -> Retrieved {
        if self.mentions_trigger(query) {
            let canonical = self.store.filter(k, |c| {
                c.source.to_lowercase().contains(&self.canonical_source)
            });
            if !canonical.is_empty() {
                debug!(count = canonical.len(), "retrieval: keyword override");
                return Retrieved {
                    chunks: canonical,
                    strategy: Strategy::KeywordOverride,
                };
            }
            debug!("retrieval: trigger word present but no canonical chunks stored");
        }

        match self.embedder.embed(query).await {
            Ok(query_vec) => {
                let chunks = self.store.all();
                let results: Vec<_> = search(&chunks, &query_vec, k)
                    .into_iter()
                    .map(|r| r.chunk)
                    .collect();
                debug!(count = results.len(), "retrieval: similarity");
                Retrieved {
                    chunks: results,
                    strategy: Strategy::Similarity,
                }
            }
            Err(e) => {
                warn!(error = %e, "query embedding failed; returning first chunks");
                Retrieved {
                    chunks: self.store.first(k),
                    strategy: Strategy::FirstK,
                }
            }
        }
    }

    /// Whole-word, case-insensitive match of the trigger word.
    fn mentions_trigger(&self, query: &str) -> bool {
        query
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word == self.trigger)
    }
}
