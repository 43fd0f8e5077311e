//! Core data models.
//!
//! Content enters the system as [`ChunkInput`] (what a connector yields)
//! and is stored as [`DocumentChunk`] once it has an id, a date and,
//! when the embedding backend cooperated, a vector.
//!
//! ```text
//! Connector ──▶ ChunkInput ──▶ ingest (id, date, embed) ──▶ DocumentChunk
//! ```

use serde::{Deserialize, Serialize};

/// A unit of raw content produced by a connector, prior to embedding.
///
/// `id` and `date` are optional: ingestion assigns a random UUID and the
/// current UTC time when they are missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl ChunkInput {
    /// Build an input with only text and source; id and date are filled
    /// in at ingestion time.
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            source: source.into(),
            date: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

/// A stored unit of retrievable content.
///
/// `embedding` is `None` when the embedding backend failed or produced a
/// vector of the wrong dimensionality. Such chunks never take part in
/// cosine ranking but remain reachable through the keyword override and
/// first-K fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    /// Provenance label, rendered in citations as `(Source: ...)`.
    pub source: String,
    /// ISO-8601 timestamp.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl DocumentChunk {
    pub fn is_embedded(&self) -> bool {
        self.embedding.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// Inline citation marker for this chunk.
    pub fn citation(&self) -> String {
        format!("(Source: {})", self.source)
    }
}

/// Speaker of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One message in a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}
