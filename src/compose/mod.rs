//! Response composition: an ordered chain of stages.
//!
//! Each [`Stage`] inspects the [`Turn`] and either answers or defers. The
//! composer returns the first answer, after citation post-processing.
//!
//! # Default chain
//!
//! | # | Stage | Answers when |
//! |---|-------|--------------|
//! | 1 | [`GreetingStage`] | the query contains a greeting word |
//! | 2 | [`GenerationStage`] | a backend is configured, chunks were retrieved and generation succeeds |
//! | 3 | [`TopicStage`] | the query matches a curated topic rule |
//! | 4 | [`GroundedStage`] | chunks were retrieved |
//! | 5 | [`FallbackStage`] | always |
//!
//! A reply marked grounded that lacks a `Source:` marker gets the top
//! chunk's citation appended.

mod fallback;
mod generate;
mod greeting;
mod grounded;
pub mod phrases;
pub mod prompt;
mod topic;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use mandate_kb_core::conversation::ConversationState;
use mandate_kb_core::models::DocumentChunk;

pub use fallback::FallbackStage;
pub use generate::GenerationStage;
pub use greeting::GreetingStage;
pub use grounded::GroundedStage;
pub use phrases::{FixedSelector, PhraseSelector, RandomSelector};
pub use topic::TopicStage;

/// Everything a stage may look at for one user message.
pub struct Turn<'a> {
    pub query: &'a str,
    /// Retrieved chunks, best first.
    pub docs: &'a [DocumentChunk],
    /// Conversation state, already updated with this query.
    pub conversation: &'a ConversationState,
}

impl Turn<'_> {
    /// Lowercased query, for keyword tests.
    pub fn lowered(&self) -> String {
        self.query.to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Whether the text was built from retrieved chunks and so needs a
    /// citation.
    pub grounded: bool,
}

impl Reply {
    pub fn canned(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            grounded: false,
        }
    }

    pub fn grounded(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            grounded: true,
        }
    }
}

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Answer the turn, or `None` to defer to the next stage.
    async fn try_handle(&self, turn: &Turn<'_>) -> Option<Reply>;
}

pub struct ResponseComposer {
    stages: Vec<Box<dyn Stage>>,
}

impl ResponseComposer {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// The default five-stage chain. `generation` is `None` when no backend
    /// is configured, in which case stage 2 is left out.
    pub fn standard(selector: Arc<dyn PhraseSelector>, generation: Option<GenerationStage>) -> Self {
        let mut stages: Vec<Box<dyn Stage>> = vec![Box::new(GreetingStage::new(selector.clone()))];
        if let Some(stage) = generation {
            stages.push(Box::new(stage));
        }
        stages.push(Box::new(TopicStage));
        stages.push(Box::new(GroundedStage::new(selector.clone())));
        stages.push(Box::new(FallbackStage::new(selector)));
        Self::new(stages)
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run the chain. Always produces text.
    pub async fn compose(&self, turn: &Turn<'_>) -> String {
        for stage in &self.stages {
            if let Some(reply) = stage.try_handle(turn).await {
                debug!(stage = stage.name(), grounded = reply.grounded, "stage answered");
                return if reply.grounded {
                    ensure_citation(&reply.text, turn.docs)
                } else {
                    reply.text
                };
            }
        }
        phrases::APOLOGY.to_string()
    }
}

/// Append `\n\n(Source: <top chunk>)` unless `text` already cites something
/// or there is nothing to cite.
pub fn ensure_citation(text: &str, docs: &[DocumentChunk]) -> String {
    if text.contains("Source:") {
        return text.to_string();
    }
    match docs.first() {
        Some(top) => format!("{}\n\n{}", text, top.citation()),
        None => text.to_string(),
    }
}
