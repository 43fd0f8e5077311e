//! Content connector trait and registry.
//!
//! A [`Connector`] is anything that can produce the full current set of
//! [`ChunkInput`]s for the knowledge base: the bundled corpus, a directory
//! of notes, or a custom source implemented by the host application.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │          ConnectorRegistry           │
//! │  ┌──────────┐ ┌────────┐ ┌────────┐  │
//! │  │ Built-in │ │   FS   │ │ Custom │  │
//! │  │  corpus  │ │ (glob) │ │ (Rust) │  │
//! │  └──────────┘ └────────┘ └────────┘  │
//! └──────────────────┬───────────────────┘
//!                    ▼
//!        fetch_all() → ingest → DocumentStore
//! ```
//!
//! # Usage
//!
//! ```rust
//! use mandate_kb::traits::ConnectorRegistry;
//!
//! let mut connectors = ConnectorRegistry::new();
//! // connectors.register(Box::new(MyConnector::new()));
//! assert!(connectors.is_empty());
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;

use mandate_kb_core::models::ChunkInput;

use crate::config::Config;

// ═══════════════════════════════════════════════════════════════════════
// Connector Trait
// ═══════════════════════════════════════════════════════════════════════

/// A content source that yields chunks for ingestion.
///
/// Connectors are stateless from the store's point of view: every call to
/// [`fetch_all`](Connector::fetch_all) returns the complete current content,
/// and a refresh replaces the store with the union of all connectors'
/// output.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use mandate_kb::traits::Connector;
/// use mandate_kb_core::models::ChunkInput;
///
/// pub struct PressReleases;
///
/// #[async_trait]
/// impl Connector for PressReleases {
///     fn name(&self) -> &str { "press" }
///     fn description(&self) -> &str { "Published press releases" }
///
///     async fn fetch_all(&self) -> Result<Vec<ChunkInput>> {
///         Ok(vec![ChunkInput::new("Statement on land claims.", "Press release")])
///     }
/// }
/// ```
#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns the connector instance name (e.g. `"builtin"`, `"notes"`).
    fn name(&self) -> &str;

    /// Returns a one-line description of what this connector provides.
    fn description(&self) -> &str;

    /// Returns the connector type identifier (e.g. `"builtin"`, `"filesystem"`).
    fn connector_type(&self) -> &str {
        "custom"
    }

    /// Returns `"{type}:{name}"`, used in logs.
    fn label(&self) -> String {
        format!("{}:{}", self.connector_type(), self.name())
    }

    /// Produce every chunk this source currently holds.
    async fn fetch_all(&self) -> Result<Vec<ChunkInput>>;
}

// ═══════════════════════════════════════════════════════════════════════
// ConnectorRegistry
// ═══════════════════════════════════════════════════════════════════════

/// Ordered set of connectors. Fetch order determines store order.
pub struct ConnectorRegistry {
    connectors: Vec<Box<dyn Connector>>,
}

impl ConnectorRegistry {
    /// Create an empty connector registry.
    pub fn new() -> Self {
        Self {
            connectors: Vec::new(),
        }
    }

    /// Create a registry with the connectors configured in `[connectors]`.
    ///
    /// The built-in corpus (when enabled) comes first, followed by the
    /// filesystem connectors in name order.
    pub fn from_config(config: &Config) -> Self {
        use crate::connector_builtin::BuiltinConnector;
        use crate::connector_fs::FilesystemConnector;

        let mut registry = Self::new();

        if config.connectors.builtin.enabled {
            registry.register(Box::new(BuiltinConnector::new()));
        }
        for (name, cfg) in &config.connectors.filesystem {
            registry.register(Box::new(FilesystemConnector::new(
                name.clone(),
                cfg.clone(),
            )));
        }

        registry
    }

    /// Register a connector.
    pub fn register(&mut self, connector: Box<dyn Connector>) {
        self.connectors.push(connector);
    }

    /// Get all registered connectors.
    pub fn connectors(&self) -> &[Box<dyn Connector>] {
        &self.connectors
    }

    /// Find a connector by name.
    pub fn find(&self, name: &str) -> Option<&dyn Connector> {
        self.connectors
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    /// Fetch from every connector in order and concatenate the results.
    ///
    /// Any connector failure fails the whole fetch, so a refresh never
    /// replaces the store with a partial corpus.
    pub async fn fetch_all(&self) -> Result<Vec<ChunkInput>> {
        let mut all = Vec::new();
        for connector in &self.connectors {
            let items = connector
                .fetch_all()
                .await
                .with_context(|| format!("connector {} failed", connector.label()))?;
            tracing::debug!(connector = %connector.label(), items = items.len(), "fetched");
            all.extend(items);
        }
        Ok(all)
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
