//! End-to-end tests for the assistant: content loading, retrieval paths,
//! the response stage chain and per-session conversation state.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

use mandate_kb::assistant::Assistant;
use mandate_kb::compose::phrases::{
    GENERIC_FALLBACK, GREETING_REPLIES, LAND_ANSWER, REPARATION_ANSWER,
};
use mandate_kb::compose::FixedSelector;
use mandate_kb::config::Config;
use mandate_kb::connector_builtin::BuiltinConnector;
use mandate_kb::scheduler::{channel, run_refresh_loop};
use mandate_kb::traits::{Connector, ConnectorRegistry};
use mandate_kb_core::embedding::EmbeddingProvider;
use mandate_kb_core::error::{EmbeddingError, GenerationError};
use mandate_kb_core::generation::{GenerationOptions, GenerationProvider};
use mandate_kb_core::models::ChunkInput;
use mandate_kb_core::topic::Topic;

// ─── Helpers ────────────────────────────────────────────────────────

fn quiet_config() -> Config {
    let mut cfg = Config::default();
    cfg.embedding.init_retry_delay_ms = 0;
    cfg
}

fn assistant_with(connectors: ConnectorRegistry) -> Assistant {
    Assistant::builder(quiet_config())
        .selector(Arc::new(FixedSelector(0)))
        .connectors(connectors)
        .build()
        .unwrap()
}

fn builtin_only() -> ConnectorRegistry {
    let mut registry = ConnectorRegistry::new();
    registry.register(Box::new(BuiltinConnector::new()));
    registry
}

/// Returns `items` until switched off, then fails.
struct Switchable {
    items: Vec<ChunkInput>,
    healthy: Arc<AtomicBool>,
}

#[async_trait]
impl Connector for Switchable {
    fn name(&self) -> &str {
        "switchable"
    }

    fn description(&self) -> &str {
        "Test connector that can be made to fail"
    }

    async fn fetch_all(&self) -> Result<Vec<ChunkInput>> {
        if !self.healthy.load(Ordering::SeqCst) {
            bail!("upstream unavailable");
        }
        Ok(self.items.clone())
    }
}

/// Random unit vectors: similarity ranking is pure noise.
struct Noise {
    state: AtomicU32,
}

#[async_trait]
impl EmbeddingProvider for Noise {
    fn model_name(&self) -> &str {
        "noise"
    }

    fn dims(&self) -> usize {
        8
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut v = Vec::with_capacity(8);
        for _ in 0..8 {
            let x = self
                .state
                .fetch_add(2_654_435_761, Ordering::SeqCst)
                .wrapping_mul(2_246_822_519);
            v.push((x % 1000) as f32 / 500.0 - 1.0);
        }
        Ok(v)
    }
}

struct StubGenerator {
    result: Result<String, GenerationError>,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    fn new(result: Result<String, GenerationError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl GenerationProvider for StubGenerator {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        self.prompts.lock().push(prompt.to_string());
        self.result.clone()
    }
}

// ─── Stage chain on an empty store ──────────────────────────────────

#[tokio::test]
async fn test_greeting() {
    let a = assistant_with(ConnectorRegistry::new());
    assert_eq!(a.respond("s", "Hello there!").await, GREETING_REPLIES[0]);
}

#[tokio::test]
async fn test_greeting_trigger_inside_a_word() {
    let a = assistant_with(ConnectorRegistry::new());
    assert_eq!(
        a.respond("s", "Which history matters here?").await,
        GREETING_REPLIES[0]
    );
    assert_eq!(a.respond("t", "Is this helpful?").await, GREETING_REPLIES[0]);
}

#[tokio::test]
async fn test_land_question_on_empty_store() {
    let a = assistant_with(ConnectorRegistry::new());
    assert_eq!(a.document_count(), 0);
    assert_eq!(
        a.respond("s", "What about land sovereignty?").await,
        LAND_ANSWER
    );
}

#[tokio::test]
async fn test_unmatched_query_on_empty_store() {
    let a = assistant_with(ConnectorRegistry::new());
    let reply = a.respond("s", "asdljk random text").await;
    assert_eq!(reply, GENERIC_FALLBACK);
    for pillar in [
        "land sovereignty",
        "cultural recognition",
        "political representation",
        "financial reparation",
    ] {
        assert!(reply.contains(pillar));
    }
}

#[tokio::test]
async fn test_canned_answers_are_deterministic() {
    // Default random selector: canned paths must not use it.
    let a = Assistant::builder(quiet_config())
        .connectors(builtin_only())
        .build()
        .unwrap();
    assert!(a.refresh().await);

    let first = a.respond("s", "Tell me about financial reparation").await;
    let second = a.respond("s", "And financial reparation again?").await;
    assert_eq!(first, REPARATION_ANSWER);
    assert_eq!(first, second);
}

// ─── Retrieval paths ────────────────────────────────────────────────

#[tokio::test]
async fn test_mandate_keyword_uses_canonical_chunks() {
    let a = Assistant::builder(quiet_config())
        .selector(Arc::new(FixedSelector(0)))
        .embedding_provider(Arc::new(Noise {
            state: AtomicU32::new(7),
        }))
        .connectors(builtin_only())
        .build()
        .unwrap();
    assert!(a.refresh().await);

    let reply = a.respond("s", "What is in the mandate?").await;
    assert!(reply.contains("LAND AND SOVEREIGNTY"), "{}", reply);
    assert!(reply.ends_with("(Source: Khoisan Mandate)"), "{}", reply);
}

#[tokio::test]
async fn test_degraded_embedder_still_answers_from_store() {
    let mut cfg = quiet_config();
    cfg.embedding.provider = "disabled".to_string();
    let a = Assistant::builder(cfg)
        .selector(Arc::new(FixedSelector(0)))
        .connectors(builtin_only())
        .build()
        .unwrap();

    let stats = a.refresh_with_stats().await.unwrap();
    assert_eq!(stats.added, 20);
    assert_eq!(stats.degraded, 20);
    assert!(a.embedder().is_degraded().await);

    let reply = a.respond("s", "Tell me about the past").await;
    assert!(
        reply.ends_with("(Source: https://x.com/KhoisanVoice)"),
        "{}",
        reply
    );
}

// ─── Refresh ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_replaces_content_and_keeps_it_on_failure() {
    let healthy = Arc::new(AtomicBool::new(true));
    let mut registry = ConnectorRegistry::new();
    registry.register(Box::new(Switchable {
        items: vec![
            ChunkInput::new("First chunk about land.", "feed"),
            ChunkInput::new("Second chunk about language.", "feed"),
            ChunkInput::new("Third chunk about parliament.", "feed"),
        ],
        healthy: healthy.clone(),
    }));
    let a = assistant_with(registry);

    assert!(a.refresh().await);
    assert_eq!(a.document_count(), 3);
    assert!(a.refresh().await);
    assert_eq!(a.document_count(), 3);

    healthy.store(false, Ordering::SeqCst);
    assert!(!a.refresh().await);
    assert_eq!(a.document_count(), 3);
}

#[tokio::test]
async fn test_manual_ticker_drives_refreshes() {
    let a = Arc::new(assistant_with(builtin_only()));
    let (tx, ticker) = channel();
    let handle = tokio::spawn(run_refresh_loop(a.clone(), ticker));

    for _ in 0..3 {
        tx.send(()).await.unwrap();
    }
    drop(tx);

    assert_eq!(handle.await.unwrap(), 3);
    assert_eq!(a.document_count(), 20);
}

// ─── Sessions ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_sessions_are_isolated() {
    let a = assistant_with(ConnectorRegistry::new());

    a.respond("alice", "What about land sovereignty?").await;
    a.respond("alice", "And cultural identity?").await;
    a.respond("bob", "How does parliament representation work?").await;

    let alice = a.conversation("alice").await.unwrap();
    let bob = a.conversation("bob").await.unwrap();

    assert_eq!(alice.turn_count(), 2);
    assert_eq!(
        alice.recent_topics().collect::<Vec<_>>(),
        vec![Topic::Culture, Topic::Land]
    );
    assert_eq!(bob.turn_count(), 1);
    assert_eq!(
        bob.recent_topics().collect::<Vec<_>>(),
        vec![Topic::Representation]
    );
}

// ─── Generation ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_generation_failure_falls_through_to_templates() {
    let generator = StubGenerator::new(Err(GenerationError::RateLimited("slow down".into())));
    let a = Assistant::builder(quiet_config())
        .selector(Arc::new(FixedSelector(0)))
        .generator(generator.clone())
        .connectors(builtin_only())
        .build()
        .unwrap();
    assert!(a.refresh().await);

    let reply = a.respond("s", "What is in the mandate?").await;
    assert_eq!(generator.prompts.lock().len(), 1);
    assert!(reply.starts_with("Hey there! I'd love to chat about"), "{}", reply);
    assert!(reply.ends_with("(Source: Khoisan Mandate)"));
}

#[tokio::test]
async fn test_generated_reply_gets_citation() {
    let generator = StubGenerator::new(Ok("The mandate seeks land restitution.".into()));
    let a = Assistant::builder(quiet_config())
        .selector(Arc::new(FixedSelector(0)))
        .generator(generator.clone())
        .connectors(builtin_only())
        .build()
        .unwrap();
    assert!(a.refresh().await);

    let reply = a.respond("s", "What is in the mandate?").await;
    assert_eq!(
        reply,
        "The mandate seeks land restitution.\n\n(Source: Khoisan Mandate)"
    );

    let prompt = generator.prompts.lock()[0].clone();
    assert!(prompt.contains("LAND AND SOVEREIGNTY"));
    assert!(prompt.contains("Question: What is in the mandate?"));
}

#[tokio::test]
async fn test_greeting_outranks_generation() {
    let generator = StubGenerator::new(Ok("generated".into()));
    let a = Assistant::builder(quiet_config())
        .selector(Arc::new(FixedSelector(1)))
        .generator(generator.clone())
        .connectors(builtin_only())
        .build()
        .unwrap();
    assert!(a.refresh().await);

    assert_eq!(a.respond("s", "hi").await, GREETING_REPLIES[1]);
    assert!(generator.prompts.lock().is_empty());
}
