use std::sync::Arc;

use async_trait::async_trait;

use super::phrases::{
    choose, PhraseSelector, CLARIFICATIONS, GENERIC_FALLBACK, HELP_REPLY, MANDATE_OVERVIEW,
    PILLARS_SUFFIX, THANKS_REPLY,
};
use super::{Reply, Stage, Turn};

/// Last stage in the chain; always answers.
///
/// With a topic in play it asks the user to narrow the question down.
/// Otherwise it picks a contextual reply:
///
/// | Query mentions | Reply |
/// |----------------|-------|
/// | mandate, vote | overview of the four pillars |
/// | help, support | how to engage with the pillars |
/// | thank | acknowledgement |
/// | anything else | generic pillars list with the website link |
pub struct FallbackStage {
    selector: Arc<dyn PhraseSelector>,
}

impl FallbackStage {
    pub fn new(selector: Arc<dyn PhraseSelector>) -> Self {
        Self { selector }
    }
}

// Case-insensitive substring tests, checked in table order.
fn contextual(query: &str) -> &'static str {
    let lowered = query.to_lowercase();
    let mentions = |keys: &[&str]| keys.iter().any(|k| lowered.contains(k));

    if mentions(&["mandate", "vote"]) {
        MANDATE_OVERVIEW
    } else if mentions(&["help", "support"]) {
        HELP_REPLY
    } else if mentions(&["thank"]) {
        THANKS_REPLY
    } else {
        GENERIC_FALLBACK
    }
}

#[async_trait]
impl Stage for FallbackStage {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn try_handle(&self, turn: &Turn<'_>) -> Option<Reply> {
        let text = match turn.conversation.topic() {
            Some(topic) => format!(
                "{} {}? {}",
                choose(self.selector.as_ref(), CLARIFICATIONS),
                topic.label(),
                PILLARS_SUFFIX
            ),
            None => contextual(turn.query).to_string(),
        };
        Some(Reply::canned(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::FixedSelector;
    use mandate_kb_core::conversation::ConversationState;

    async fn reply(state: &ConversationState, query: &str) -> String {
        let stage = FallbackStage::new(Arc::new(FixedSelector(0)));
        let turn = Turn {
            query,
            docs: &[],
            conversation: state,
        };
        stage.try_handle(&turn).await.unwrap().text
    }

    #[tokio::test]
    async fn test_generic_fallback_lists_pillars() {
        let state = ConversationState::default();
        let text = reply(&state, "asdljk random text").await;
        assert_eq!(text, GENERIC_FALLBACK);
        for pillar in [
            "land sovereignty",
            "cultural recognition",
            "political representation",
            "financial reparation",
        ] {
            assert!(text.contains(pillar));
        }
        assert!(text.contains("https://khoisanvoice.carrd.co/"));
    }

    #[tokio::test]
    async fn test_contextual_replies() {
        let state = ConversationState::default();
        assert_eq!(reply(&state, "How do I vote?").await, MANDATE_OVERVIEW);
        assert_eq!(reply(&state, "can you help me").await, HELP_REPLY);
        assert_eq!(reply(&state, "Thanks!").await, THANKS_REPLY);
    }

    #[tokio::test]
    async fn test_contextual_keywords_match_inside_words() {
        let state = ConversationState::default();
        assert_eq!(reply(&state, "Is it helpful?").await, HELP_REPLY);
        assert_eq!(reply(&state, "who are the supporters").await, HELP_REPLY);
        assert_eq!(reply(&state, "the voters roll").await, MANDATE_OVERVIEW);
        assert_eq!(reply(&state, "THANKYOU").await, THANKS_REPLY);
    }

    #[tokio::test]
    async fn test_clarification_names_current_topic() {
        let mut state = ConversationState::default();
        state.update("something about parliament");
        let text = reply(&state, "hmm").await;
        assert_eq!(
            text,
            format!("{} representation? {}", CLARIFICATIONS[0], PILLARS_SUFFIX)
        );
    }
}
