use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use mandate_kb_core::generation::{GenerationOptions, GenerationProvider};

use super::prompt::build_prompt;
use super::{Reply, Stage, Turn};

/// Hands the retrieved chunks, recent history and question to the
/// generation backend. Defers on any failure and when nothing was
/// retrieved.
pub struct GenerationStage {
    provider: Arc<dyn GenerationProvider>,
    options: GenerationOptions,
}

impl GenerationStage {
    pub fn new(provider: Arc<dyn GenerationProvider>, options: GenerationOptions) -> Self {
        Self { provider, options }
    }
}

#[async_trait]
impl Stage for GenerationStage {
    fn name(&self) -> &'static str {
        "generation"
    }

    async fn try_handle(&self, turn: &Turn<'_>) -> Option<Reply> {
        if turn.docs.is_empty() {
            return None;
        }
        let prompt = build_prompt(turn.query, turn.docs, turn.conversation.history());
        match self.provider.generate(&prompt, &self.options).await {
            Ok(text) if !text.trim().is_empty() => Some(Reply::grounded(text.trim())),
            Ok(_) => {
                warn!(model = self.provider.model_name(), "generation returned empty text");
                None
            }
            Err(e) => {
                warn!(model = self.provider.model_name(), error = %e, "generation failed; using templates");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mandate_kb_core::conversation::ConversationState;
    use mandate_kb_core::error::GenerationError;
    use mandate_kb_core::models::DocumentChunk;
    use parking_lot::Mutex;

    struct Scripted {
        result: Result<String, GenerationError>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GenerationProvider for Scripted {
        fn model_name(&self) -> &str {
            "scripted"
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

    fn stage(result: Result<String, GenerationError>) -> (GenerationStage, Arc<Scripted>) {
        let provider = Arc::new(Scripted {
            result,
            prompts: Mutex::new(Vec::new()),
        });
        (
            GenerationStage::new(provider.clone(), GenerationOptions::default()),
            provider,
        )
    }

    fn docs() -> Vec<DocumentChunk> {
        vec![DocumentChunk {
            id: "m1".to_string(),
            text: "Return of ancestral territories.".to_string(),
            source: "Khoisan Mandate".to_string(),
            date: "2024-04-01".to_string(),
            embedding: None,
        }]
    }

    #[tokio::test]
    async fn test_success_is_grounded() {
        let (stage, provider) = stage(Ok("  The land must be returned.  ".to_string()));
        let state = ConversationState::default();
        let docs = docs();
        let turn = Turn {
            query: "land?",
            docs: &docs,
            conversation: &state,
        };

        let reply = stage.try_handle(&turn).await.unwrap();
        assert_eq!(reply, Reply::grounded("The land must be returned."));
        let prompts = provider.prompts.lock();
        assert!(prompts[0].contains("Return of ancestral territories. (Source: Khoisan Mandate)"));
    }

    #[tokio::test]
    async fn test_failure_defers() {
        let (stage, _) = stage(Err(GenerationError::RateLimited("slow down".into())));
        let state = ConversationState::default();
        let docs = docs();
        let turn = Turn {
            query: "land?",
            docs: &docs,
            conversation: &state,
        };
        assert!(stage.try_handle(&turn).await.is_none());
    }

    #[tokio::test]
    async fn test_no_docs_defers_without_calling() {
        let (stage, provider) = stage(Ok("text".to_string()));
        let state = ConversationState::default();
        let turn = Turn {
            query: "land?",
            docs: &[],
            conversation: &state,
        };
        assert!(stage.try_handle(&turn).await.is_none());
        assert!(provider.prompts.lock().is_empty());
    }
}
