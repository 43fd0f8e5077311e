//! Bundled corpus connector.
//!
//! Ships the canonical mandate sections, summary paragraphs from the
//! initiative's website and a sample of its public social posts, compiled
//! into the binary from `data/builtin_corpus.json`. This is the content the
//! assistant answers from when no other connector is configured.
//!
//! Mandate sections carry the source label `Khoisan Mandate`, which the
//! retrieval keyword override matches on.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use mandate_kb_core::models::ChunkInput;

use crate::traits::Connector;

const CORPUS: &str = include_str!("../data/builtin_corpus.json");

#[derive(Debug, Deserialize)]
struct Corpus {
    posts: Vec<ChunkInput>,
    website: Vec<ChunkInput>,
    mandate: Vec<ChunkInput>,
}

pub struct BuiltinConnector;

impl BuiltinConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BuiltinConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for BuiltinConnector {
    fn name(&self) -> &str {
        "builtin"
    }

    fn description(&self) -> &str {
        "Mandate text, website summaries and social posts bundled with the binary"
    }

    fn connector_type(&self) -> &str {
        "builtin"
    }

    /// Posts first, then website paragraphs, then mandate sections.
    async fn fetch_all(&self) -> Result<Vec<ChunkInput>> {
        let corpus: Corpus =
            serde_json::from_str(CORPUS).context("bundled corpus is not valid JSON")?;
        let mut items = corpus.posts;
        items.extend(corpus.website);
        items.extend(corpus.mandate);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_corpus_loads() {
        let items = BuiltinConnector::new().fetch_all().await.unwrap();
        assert_eq!(items.len(), 20);
        assert!(items.iter().all(|i| !i.text.trim().is_empty()));
        assert!(items.iter().all(|i| i.id.is_some() && i.date.is_some()));
    }

    #[tokio::test]
    async fn test_mandate_sections_last_and_tagged() {
        let items = BuiltinConnector::new().fetch_all().await.unwrap();
        let mandate: Vec<_> = items
            .iter()
            .filter(|i| i.source.contains("Mandate"))
            .collect();
        assert_eq!(mandate.len(), 5);
        assert_eq!(items[15].source, "Khoisan Mandate");
        assert!(mandate[0].text.contains("LAND AND SOVEREIGNTY"));
    }
}
