//! The assistant: the one object a host talks to.
//!
//! Owns the document store, the embedder, the connectors, the response
//! composer and one [`ConversationState`] per chat session.
//!
//! ```text
//! respond(session, query)
//!   ├─ session state.update(query)
//!   ├─ RetrievalService::retrieve(query, top_k)
//!   ├─ ResponseComposer::compose(turn)
//!   └─ session state.record_exchange(query, reply)
//!
//! refresh()
//!   ├─ ConnectorRegistry::fetch_all()     (failure → false, store untouched)
//!   ├─ DocumentStore::clear()
//!   └─ ingest::add_chunks(...)            (→ true)
//! ```
//!
//! Messages within one session are processed one at a time; different
//! sessions run concurrently.
//!
//! The session map is bounded. Creating a session past
//! `conversation.max_sessions` evicts the least recently used one, and
//! [`Assistant::sweep_idle_sessions`] (run on every scheduler tick) drops
//! sessions unused for `conversation.session_idle_secs`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use mandate_kb_core::conversation::ConversationState;
use mandate_kb_core::embedding::EmbeddingProvider;
use mandate_kb_core::generation::GenerationProvider;
use mandate_kb_core::models::DocumentChunk;
use mandate_kb_core::store::DocumentStore;

use crate::compose::phrases::EMPTY_QUERY;
use crate::compose::{GenerationStage, PhraseSelector, RandomSelector, ResponseComposer, Turn};
use crate::config::Config;
use crate::embedding::{create_provider, Embedder};
use crate::generation::{create_generator, options_from_config};
use crate::ingest::{add_chunks, IngestStats};
use crate::retrieval::RetrievalService;
use crate::traits::ConnectorRegistry;

type Session = Arc<tokio::sync::Mutex<ConversationState>>;

struct SessionSlot {
    state: Session,
    last_used: Instant,
}

pub struct Assistant {
    store: Arc<DocumentStore>,
    embedder: Arc<Embedder>,
    retrieval: RetrievalService,
    composer: ResponseComposer,
    connectors: ConnectorRegistry,
    sessions: Mutex<HashMap<String, SessionSlot>>,
    refresh_lock: tokio::sync::Mutex<()>,
    top_k: usize,
    batch_size: usize,
    history_limit: usize,
    max_sessions: usize,
    session_idle: Duration,
}

/// Assembles an [`Assistant`], defaulting every unset part from config.
pub struct AssistantBuilder {
    config: Config,
    embedding: Option<Arc<dyn EmbeddingProvider>>,
    generator: Option<Arc<dyn GenerationProvider>>,
    selector: Option<Arc<dyn PhraseSelector>>,
    connectors: Option<ConnectorRegistry>,
}

impl AssistantBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            embedding: None,
            generator: None,
            selector: None,
            connectors: None,
        }
    }

    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding = Some(provider);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn GenerationProvider>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn selector(mut self, selector: Arc<dyn PhraseSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn connectors(mut self, connectors: ConnectorRegistry) -> Self {
        self.connectors = Some(connectors);
        self
    }

    pub fn build(self) -> Result<Assistant> {
        let config = self.config;

        let provider = match self.embedding {
            Some(p) => p,
            None => create_provider(&config.embedding)?,
        };
        let embedder = Arc::new(Embedder::from_config(provider, &config.embedding));

        let generator = match self.generator {
            Some(g) => Some(g),
            None => create_generator(&config.generation)?,
        };
        let generation = generator
            .map(|g| GenerationStage::new(g, options_from_config(&config.generation)));

        let selector = self
            .selector
            .unwrap_or_else(|| Arc::new(RandomSelector::new(config.composer.seed)));

        let store = Arc::new(DocumentStore::new());
        let retrieval = RetrievalService::new(store.clone(), embedder.clone(), &config.retrieval);

        Ok(Assistant {
            store,
            embedder,
            retrieval,
            composer: ResponseComposer::standard(selector, generation),
            connectors: self
                .connectors
                .unwrap_or_else(|| ConnectorRegistry::from_config(&config)),
            sessions: Mutex::new(HashMap::new()),
            refresh_lock: tokio::sync::Mutex::new(()),
            top_k: config.retrieval.top_k,
            batch_size: config.embedding.batch_size,
            history_limit: config.conversation.history_limit,
            max_sessions: config.conversation.max_sessions.max(1),
            session_idle: Duration::from_secs(config.conversation.session_idle_secs),
        })
    }
}

impl Assistant {
    pub fn builder(config: Config) -> AssistantBuilder {
        AssistantBuilder::new(config)
    }

    /// Build from config and load every connector's content.
    pub async fn start(config: Config) -> Result<Self> {
        let assistant = Self::builder(config).build()?;
        if !assistant.refresh().await {
            warn!("initial content load failed; starting with an empty store");
        }
        Ok(assistant)
    }

    /// Answer one user message in `session_id`. Never fails.
    pub async fn respond(&self, session_id: &str, query: &str) -> String {
        let query = query.trim();
        if query.is_empty() {
            return EMPTY_QUERY.to_string();
        }

        let session = self.session(session_id);
        let mut state = session.lock().await;
        debug!(session = session_id, previous = ?state.last_query(), "new turn");
        state.update(query);

        let retrieved = self.retrieval.retrieve(query, self.top_k).await;
        let reply = {
            let turn = Turn {
                query,
                docs: &retrieved.chunks,
                conversation: &state,
            };
            self.composer.compose(&turn).await
        };

        state.record_exchange(query, &reply);
        reply
    }

    /// Replace the store's content with a fresh fetch from every connector.
    ///
    /// Returns `false` when fetching fails, in which case the store is left
    /// as it was. Concurrent refreshes are serialized.
    pub async fn refresh(&self) -> bool {
        self.refresh_with_stats().await.is_some()
    }

    /// [`refresh`](Self::refresh), reporting ingestion counters on success.
    pub async fn refresh_with_stats(&self) -> Option<IngestStats> {
        let _guard = self.refresh_lock.lock().await;

        let items = match self.connectors.fetch_all().await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "refresh failed; keeping current content");
                return None;
            }
        };

        self.store.clear();
        let stats = add_chunks(&self.store, &self.embedder, items, self.batch_size).await;
        info!(
            documents = self.store.count(),
            embedded = self.store.embedded_count(),
            model = self.embedder.model_name(),
            dims = self.embedder.dims(),
            "refresh complete"
        );
        Some(stats)
    }

    /// Look up or create a session, marking it used.
    fn session(&self, session_id: &str) -> Session {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();

        if let Some(slot) = sessions.get_mut(session_id) {
            slot.last_used = now;
            return slot.state.clone();
        }

        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(id, _)| id.clone());
            if let Some(id) = oldest {
                sessions.remove(&id);
                debug!(session = %id, "evicted least recently used session");
            }
        }

        let state = Arc::new(tokio::sync::Mutex::new(ConversationState::new(
            self.history_limit,
        )));
        sessions.insert(
            session_id.to_string(),
            SessionSlot {
                state: state.clone(),
                last_used: now,
            },
        );
        state
    }

    /// Drop a session's conversation state. Returns whether it existed.
    pub fn end_session(&self, session_id: &str) -> bool {
        self.sessions.lock().remove(session_id).is_some()
    }

    /// Drop every session unused for longer than the idle limit. Returns
    /// how many were dropped.
    pub fn sweep_idle_sessions(&self) -> usize {
        self.sweep_sessions_idle_for(self.session_idle)
    }

    fn sweep_sessions_idle_for(&self, idle: Duration) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, slot| slot.last_used.elapsed() <= idle);
        let dropped = before - sessions.len();
        if dropped > 0 {
            info!(dropped, remaining = sessions.len(), "idle sessions dropped");
        }
        dropped
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Copy of a session's state, if the session exists.
    pub async fn conversation(&self, session_id: &str) -> Option<ConversationState> {
        let session = self
            .sessions
            .lock()
            .get(session_id)
            .map(|slot| slot.state.clone())?;
        let state = session.lock().await;
        Some(state.clone())
    }

    pub fn documents(&self) -> Vec<DocumentChunk> {
        self.store.all()
    }

    pub fn document_count(&self) -> usize {
        self.store.count()
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    pub fn connectors(&self) -> &ConnectorRegistry {
        &self.connectors
    }
}
