use std::sync::Arc;

use async_trait::async_trait;

use super::phrases::{choose, PhraseSelector, GREETING_REPLIES, GREETING_TRIGGERS};
use super::{Reply, Stage, Turn};

/// Answers greetings with one of a fixed set of welcomes.
///
/// Triggers are case-insensitive substrings of the query.
pub struct GreetingStage {
    selector: Arc<dyn PhraseSelector>,
}

impl GreetingStage {
    pub fn new(selector: Arc<dyn PhraseSelector>) -> Self {
        Self { selector }
    }
}

// Substring matching overlaps ("hi" hits "this", "which" and "history").
// The greeting stage runs first, so such queries are greeted.
pub(crate) fn is_greeting(query: &str) -> bool {
    let lowered = query.to_lowercase();
    GREETING_TRIGGERS.iter().any(|g| lowered.contains(g))
}

#[async_trait]
impl Stage for GreetingStage {
    fn name(&self) -> &'static str {
        "greeting"
    }

    async fn try_handle(&self, turn: &Turn<'_>) -> Option<Reply> {
        if is_greeting(turn.query) {
            Some(Reply::canned(choose(self.selector.as_ref(), GREETING_REPLIES)))
        } else {
            None
        }
    }
}
