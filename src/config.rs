//! Configuration parsing and validation.
//!
//! Configuration lives in a single TOML file passed via `--config`. Every
//! section is optional; a missing file argument means built-in defaults,
//! which run the assistant on the bundled corpus with the local hashing
//! embedder and no generation backend.
//!
//! # Example
//!
//! ```toml
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [generation]
//! provider = "openrouter"
//! model = "meta-llama/llama-3.1-8b-instruct"
//!
//! [retrieval]
//! top_k = 5
//!
//! [refresh]
//! interval_secs = 86400
//!
//! [connectors.filesystem.notes]
//! root = "./content"
//! include_globs = ["**/*.md"]
//! source = "Community notes"
//! ```
//!
//! API keys are never read from this file. Each HTTP provider names the
//! environment variable that holds its key (`api_key_env`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub composer: ComposerConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub connectors: ConnectorsConfig,
}

// ============ Embedding ============

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"disabled"`, `"local"` or `"openai"`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_openai_url")]
    pub base_url: String,
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
    /// Maximum embedding calls in flight during ingestion.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Retries per embedding request on 429/5xx.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts to initialize the provider before degrading.
    #[serde(default = "default_init_attempts")]
    pub init_attempts: u32,
    #[serde(default = "default_init_retry_delay_ms")]
    pub init_retry_delay_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            base_url: default_openai_url(),
            api_key_env: default_openai_key_env(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            init_attempts: default_init_attempts(),
            init_retry_delay_ms: default_init_retry_delay_ms(),
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_openai_url() -> String {
    "https://api.openai.com/v1/embeddings".to_string()
}
fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_batch_size() -> usize {
    5
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_init_attempts() -> u32 {
    3
}
fn default_init_retry_delay_ms() -> u64 {
    2000
}

// ============ Generation ============

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// `"disabled"` or `"openrouter"`.
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_openrouter_url")]
    pub base_url: String,
    #[serde(default = "default_openrouter_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            base_url: default_openrouter_url(),
            api_key_env: default_openrouter_key_env(),
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
            top_p: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_generation_provider() -> String {
    "disabled".to_string()
}
fn default_generation_model() -> String {
    "meta-llama/llama-3.1-8b-instruct".to_string()
}
fn default_openrouter_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}
fn default_openrouter_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}
fn default_max_new_tokens() -> u32 {
    300
}
fn default_temperature() -> f32 {
    0.7
}

// ============ Retrieval ============

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Whole word that routes a query straight to the canonical chunks.
    #[serde(default = "default_canonical_trigger")]
    pub canonical_trigger: String,
    /// Substring of `source` that marks a chunk as canonical.
    #[serde(default = "default_canonical_source")]
    pub canonical_source: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            canonical_trigger: default_canonical_trigger(),
            canonical_source: default_canonical_source(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_canonical_trigger() -> String {
    "mandate".to_string()
}
fn default_canonical_source() -> String {
    "Mandate".to_string()
}

// ============ Conversation / composer ============

#[derive(Debug, Deserialize, Clone)]
pub struct ConversationConfig {
    /// Messages kept per session for generation prompts.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Sessions kept at once; the least recently used is evicted past this.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Sessions unused for this long are dropped by the periodic sweep.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            max_sessions: default_max_sessions(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

fn default_history_limit() -> usize {
    mandate_kb_core::conversation::DEFAULT_HISTORY_LIMIT
}

fn default_max_sessions() -> usize {
    1000
}

fn default_session_idle_secs() -> u64 {
    60 * 60
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ComposerConfig {
    /// Fixed seed for phrase selection. Unset means seeded from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
}

// ============ Refresh / server / logging ============

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    /// Seconds between scheduled refreshes while serving; `0` disables.
    #[serde(default = "default_refresh_interval")]
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_refresh_interval(),
        }
    }
}

fn default_refresh_interval() -> u64 {
    24 * 60 * 60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

// ============ Connectors ============

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConnectorsConfig {
    #[serde(default)]
    pub builtin: BuiltinConnectorConfig,
    /// Named filesystem connectors: `[connectors.filesystem.<name>]`.
    #[serde(default)]
    pub filesystem: BTreeMap<String, FilesystemConnectorConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BuiltinConnectorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for BuiltinConnectorConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesystemConnectorConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Citation label for every chunk; defaults to the file's relative path.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.txt".to_string()]
}
fn default_max_tokens() -> usize {
    512
}

// ============ Loading ============

/// Read, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate config from a TOML string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    match config.embedding.provider.as_str() {
        "disabled" | "local" => {}
        "openai" => {
            if config.embedding.model.is_none() {
                bail!("embedding.model must be specified when provider is 'openai'");
            }
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                bail!("embedding.dims must be > 0 when provider is 'openai'");
            }
        }
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, local, or openai.",
            other
        ),
    }
    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0");
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be >= 1");
    }
    if config.conversation.max_sessions == 0 {
        bail!("conversation.max_sessions must be >= 1");
    }
    if config.embedding.init_attempts == 0 {
        bail!("embedding.init_attempts must be >= 1");
    }

    match config.generation.provider.as_str() {
        "disabled" | "openrouter" => {}
        other => bail!(
            "Unknown generation provider: '{}'. Must be disabled or openrouter.",
            other
        ),
    }
    if !(0.0..=2.0).contains(&config.generation.temperature) {
        bail!("generation.temperature must be in [0.0, 2.0]");
    }
    if let Some(top_p) = config.generation.top_p {
        if !(0.0..=1.0).contains(&top_p) {
            bail!("generation.top_p must be in [0.0, 1.0]");
        }
    }
    if config.generation.max_new_tokens == 0 {
        bail!("generation.max_new_tokens must be >= 1");
    }

    if config.retrieval.top_k == 0 {
        bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.canonical_trigger.trim().is_empty() {
        bail!("retrieval.canonical_trigger must not be empty");
    }
    if config.retrieval.canonical_source.trim().is_empty() {
        bail!("retrieval.canonical_source must not be empty");
    }

    for (name, fs) in &config.connectors.filesystem {
        if fs.max_tokens == 0 {
            bail!("connectors.filesystem.{}.max_tokens must be > 0", name);
        }
    }

    Ok(())
}
