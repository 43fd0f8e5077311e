//! Embedding provider implementations and the initialization guard.
//!
//! Concrete [`EmbeddingProvider`]s:
//! - **[`DisabledProvider`]**: always fails; every chunk is stored without a vector.
//! - **[`HashingProvider`]**: deterministic hashed bag-of-words, no network.
//! - **[`OpenAIProvider`]**: OpenAI-compatible `/v1/embeddings` with retry and backoff.
//!
//! [`Embedder`] wraps whichever provider is configured and owns its
//! lifecycle: initialization is attempted before the first embedding,
//! retried a fixed number of times, and on exhaustion the embedder stays
//! degraded until [`Embedder::reinitialize`] succeeds.
//!
//! # Provider Selection
//!
//! ```rust
//! # use mandate_kb::config::EmbeddingConfig;
//! # use mandate_kb::embedding::create_provider;
//! # use mandate_kb_core::embedding::EmbeddingProvider;
//! let config = EmbeddingConfig::default(); // provider = "local"
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.model_name(), "local-hash");
//! ```
//!
//! # Retry Strategy
//!
//! The OpenAI provider uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use mandate_kb_core::embedding::{normalize, EmbeddingProvider};
use mandate_kb_core::error::EmbeddingError;

use crate::config::EmbeddingConfig;

// ============ Disabled Provider ============

/// A provider that refuses every request.
///
/// Used when `embedding.provider = "disabled"`. Retrieval then always
/// takes the keyword-override or first-K path.
pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn initialize(&self) -> Result<(), EmbeddingError> {
        Err(EmbeddingError::Unavailable(
            "embedding provider is disabled".to_string(),
        ))
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Unavailable(
            "embedding provider is disabled".to_string(),
        ))
    }
}

// ============ Hashing Provider ============

/// Default dimensionality of the hashing provider.
pub const DEFAULT_HASH_DIMS: usize = 256;

/// Local embedder that hashes lowercase word tokens into a fixed number of
/// buckets and L2-normalizes the counts.
///
/// Texts that share vocabulary land close together, which is enough for a
/// small topical corpus and needs no model download or network.
pub struct HashingProvider {
    dims: usize,
}

impl HashingProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 2)
        {
            let idx = (fnv1a(token.as_bytes()) % self.dims as u64) as usize;
            v[idx] += 1.0;
        }
        normalize(&mut v);
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn model_name(&self) -> &str {
        "local-hash"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.vectorize(text))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

// ============ OpenAI Provider ============

/// Embedding provider for any OpenAI-compatible embeddings endpoint.
///
/// The API key is read from the environment variable named by
/// `embedding.api_key_env` at initialization time, so a missing key
/// degrades the embedder instead of aborting startup.
pub struct OpenAIProvider {
    model: String,
    dims: usize,
    url: String,
    api_key_env: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// # Errors
    ///
    /// Returns an error if `model` or `dims` is not set in config, or the
    /// HTTP client cannot be built.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model,
            dims,
            url: config.base_url.clone(),
            api_key_env: config.api_key_env.clone(),
            max_retries: config.max_retries,
            client,
        })
    }

    fn api_key(&self) -> Result<String, EmbeddingError> {
        std::env::var(&self.api_key_env).map_err(|_| {
            EmbeddingError::Unavailable(format!("{} environment variable not set", self.api_key_env))
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    /// Checks the key and sends one test request once.
    async fn initialize(&self) -> Result<(), EmbeddingError> {
        self.api_key()?;
        let sample = self.embed("ping").await?;
        if sample.len() != self.dims {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dims,
                actual: sample.len(),
            });
        }
        Ok(())
    }

    /// Call the embeddings endpoint with retry/backoff.
    ///
    /// - HTTP 429 or 5xx → retry with exponential backoff
    /// - HTTP 4xx (not 429) → fail immediately
    /// - Network error → retry
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self.api_key()?;
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.url)
                .bearer_auth(&api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
                        return parse_openai_response(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err =
                        EmbeddingError::Request(format!("API error {}: {}", status, body_text));
                    if status.as_u16() == 429 || status.is_server_error() {
                        debug!(attempt, %status, "embedding request will be retried");
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    last_err = Some(EmbeddingError::Request(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| EmbeddingError::Request("embedding failed after retries".into())))
    }
}

/// Extract `data[0].embedding` from an embeddings response.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<f32>, EmbeddingError> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| EmbeddingError::InvalidResponse("missing data[0].embedding".into()))?;

    embedding
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| EmbeddingError::InvalidResponse("non-numeric component".into()))
        })
        .collect()
}

/// Create the configured [`EmbeddingProvider`].
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"local"` | [`HashingProvider`] |
/// | `"openai"` | [`OpenAIProvider`] |
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledProvider)),
        "local" => Ok(Arc::new(HashingProvider::new(
            config.dims.unwrap_or(DEFAULT_HASH_DIMS),
        ))),
        "openai" => Ok(Arc::new(OpenAIProvider::new(config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

// ============ Embedder ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitState {
    Uninitialized,
    Ready,
    Degraded,
}

/// Initialization guard around an [`EmbeddingProvider`].
///
/// The first call to [`embed`](Self::embed) (or [`ensure_ready`](Self::ensure_ready))
/// runs `initialize()` up to `attempts` times with a fixed `retry_delay`
/// in between. Concurrent callers wait on the same attempt. Once
/// degraded, every `embed` fails fast with [`EmbeddingError::Unavailable`]
/// until [`reinitialize`](Self::reinitialize) succeeds.
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    state: Mutex<InitState>,
    attempts: u32,
    retry_delay: Duration,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, attempts: u32, retry_delay: Duration) -> Self {
        Self {
            provider,
            state: Mutex::new(InitState::Uninitialized),
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    pub fn from_config(provider: Arc<dyn EmbeddingProvider>, config: &EmbeddingConfig) -> Self {
        Self::new(
            provider,
            config.init_attempts,
            Duration::from_millis(config.init_retry_delay_ms),
        )
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub fn dims(&self) -> usize {
        self.provider.dims()
    }

    /// Initialize if that has not been tried yet. Returns whether the
    /// provider is usable.
    pub async fn ensure_ready(&self) -> bool {
        let mut state = self.state.lock().await;
        if *state == InitState::Uninitialized {
            *state = self.try_initialize().await;
        }
        *state == InitState::Ready
    }

    /// Retry initialization after a degraded start.
    pub async fn reinitialize(&self) -> bool {
        let mut state = self.state.lock().await;
        *state = self.try_initialize().await;
        *state == InitState::Ready
    }

    pub async fn is_degraded(&self) -> bool {
        *self.state.lock().await == InitState::Degraded
    }

    async fn try_initialize(&self) -> InitState {
        for attempt in 1..=self.attempts {
            match self.provider.initialize().await {
                Ok(()) => {
                    info!(
                        model = self.provider.model_name(),
                        dims = self.provider.dims(),
                        "embedding provider ready"
                    );
                    return InitState::Ready;
                }
                Err(e) => {
                    warn!(attempt, attempts = self.attempts, error = %e, "embedding provider initialization failed");
                    if attempt < self.attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
        warn!("embedding provider degraded; chunks will be stored without embeddings");
        InitState::Degraded
    }

    /// Embed `text`, checking the result against the declared dimensionality.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if !self.ensure_ready().await {
            return Err(EmbeddingError::Unavailable(
                "embedding provider failed to initialize".to_string(),
            ));
        }
        let v = self.provider.embed(text).await?;
        let expected = self.provider.dims();
        if v.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: v.len(),
            });
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mandate_kb_core::embedding::cosine_similarity;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `initialize` a fixed number of times, then succeeds.
    struct FlakyProvider {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyProvider {
        fn model_name(&self) -> &str {
            "flaky"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn initialize(&self) -> Result<(), EmbeddingError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(EmbeddingError::Unavailable("not yet".into()))
            } else {
                Ok(())
            }
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0])
        }
    }

    struct WrongDims;

    #[async_trait]
    impl EmbeddingProvider for WrongDims {
        fn model_name(&self) -> &str {
            "wrong"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0])
        }
    }

    fn flaky(failures: u32) -> Arc<FlakyProvider> {
        Arc::new(FlakyProvider {
            failures,
            calls: AtomicU32::new(0),
        })
    }

    #[tokio::test]
    async fn test_init_succeeds_within_attempts() {
        let provider = flaky(2);
        let embedder = Embedder::new(provider.clone(), 3, Duration::ZERO);
        assert!(embedder.ensure_ready().await);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(embedder.embed("x").await.unwrap(), vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_init_exhausted_degrades() {
        let provider = flaky(5);
        let embedder = Embedder::new(provider.clone(), 3, Duration::ZERO);
        assert!(!embedder.ensure_ready().await);
        assert!(embedder.is_degraded().await);
        assert!(matches!(
            embedder.embed("x").await,
            Err(EmbeddingError::Unavailable(_))
        ));
        // Degraded state is sticky: no further attempts.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);

        // Two more failures remain, then the third reinit attempt succeeds.
        assert!(embedder.reinitialize().await);
        assert!(!embedder.is_degraded().await);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let embedder = Embedder::new(Arc::new(WrongDims), 1, Duration::ZERO);
        assert_eq!(
            embedder.embed("x").await,
            Err(EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        );
    }

    #[tokio::test]
    async fn test_disabled_degrades() {
        let embedder = Embedder::new(Arc::new(DisabledProvider), 2, Duration::ZERO);
        assert!(embedder.embed("hello").await.is_err());
        assert!(embedder.is_degraded().await);
    }

    #[tokio::test]
    async fn test_hashing_provider_shape_and_similarity() {
        let p = HashingProvider::new(64);
        let land = p.embed("ancestral land restitution").await.unwrap();
        let land2 = p.embed("restitution of ancestral land").await.unwrap();
        let other = p.embed("parliament seats veto").await.unwrap();

        assert_eq!(land.len(), 64);
        let norm: f32 = land.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!((cosine_similarity(&land, &land2) - 1.0).abs() < 1e-5);
        assert!(cosine_similarity(&land, &other) < 0.99);
    }

    #[test]
    fn test_create_provider() {
        let mut config = EmbeddingConfig::default();
        assert_eq!(create_provider(&config).unwrap().dims(), DEFAULT_HASH_DIMS);

        config.provider = "disabled".to_string();
        assert_eq!(create_provider(&config).unwrap().model_name(), "disabled");

        config.provider = "openai".to_string();
        assert!(create_provider(&config).is_err());
        config.model = Some("text-embedding-3-small".to_string());
        config.dims = Some(1536);
        assert_eq!(create_provider(&config).unwrap().dims(), 1536);

        config.provider = "nope".to_string();
        assert!(create_provider(&config).is_err());
    }

    #[test]
    fn test_parse_openai_response() {
        let json = serde_json::json!({"data": [{"embedding": [0.5, -0.25]}]});
        assert_eq!(parse_openai_response(&json).unwrap(), vec![0.5, -0.25]);
        assert!(parse_openai_response(&serde_json::json!({"data": []})).is_err());
    }
}
