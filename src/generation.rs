//! Generation backend over an OpenAI-compatible chat completions API.
//!
//! The default target is OpenRouter. A single request carries a short
//! system message and the fully assembled prompt as the user message;
//! the first choice's content is the reply.
//!
//! Status codes map onto [`GenerationError`]:
//!
//! | Status | Error |
//! |--------|-------|
//! | 401, 403 | `Unauthorized` |
//! | 429 | `RateLimited` |
//! | other non-2xx | `Request` |
//! | 2xx without `choices[0].message.content` | `InvalidResponse` |
//! | 2xx with blank content | `EmptyResponse` |

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::debug;

use mandate_kb_core::error::GenerationError;
use mandate_kb_core::generation::{GenerationOptions, GenerationProvider};

use crate::config::GenerationConfig;

const SYSTEM_MESSAGE: &str = "You are a helpful assistant for the Khoisan Voice initiative.";

pub struct OpenRouterProvider {
    model: String,
    url: String,
    api_key_env: String,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            model: config.model.clone(),
            url: config.base_url.clone(),
            api_key_env: config.api_key_env.clone(),
            client,
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenRouterProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let api_key = std::env::var(&self.api_key_env).map_err(|_| {
            GenerationError::Unauthorized(format!("{} environment variable not set", self.api_key_env))
        })?;

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_MESSAGE },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": options.max_new_tokens,
            "temperature": options.temperature,
        });
        if let Some(top_p) = options.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }

        debug!(model = %self.model, prompt_chars = prompt.len(), "sending generation request");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .header("X-Title", "Khoisan Voice Assistant")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = error_message(&text).unwrap_or(text);
            return Err(match status.as_u16() {
                401 | 403 => GenerationError::Unauthorized(message),
                429 => GenerationError::RateLimited(message),
                _ => GenerationError::Request(format!("{}: {}", status, message)),
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        parse_completion(&json)
    }
}

/// `error.message` from an OpenAI-style error body.
fn error_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    json.get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

fn parse_completion(json: &serde_json::Value) -> Result<String, GenerationError> {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| GenerationError::InvalidResponse("missing choices[0].message.content".into()))?;

    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(trimmed.to_string())
}

/// Create the configured generation backend, or `None` when disabled.
pub fn create_generator(config: &GenerationConfig) -> Result<Option<Arc<dyn GenerationProvider>>> {
    match config.provider.as_str() {
        "disabled" => Ok(None),
        "openrouter" => Ok(Some(Arc::new(OpenRouterProvider::new(config)?))),
        other => bail!("Unknown generation provider: {}", other),
    }
}

/// Sampling options from config.
pub fn options_from_config(config: &GenerationConfig) -> GenerationOptions {
    GenerationOptions {
        max_new_tokens: config.max_new_tokens,
        temperature: config.temperature,
        top_p: config.top_p,
    }
}
