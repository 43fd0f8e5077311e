use std::sync::Arc;

use async_trait::async_trait;

use super::phrases::{choose, PhraseSelector, DEFAULT_SUBJECT, FOLLOW_UPS, OPENINGS, TRANSITIONS};
use super::{Reply, Stage, Turn};

/// Formal phrasings rewritten before a chunk is read back to the user.
/// Matching is ASCII case-insensitive; an empty replacement deletes.
const REWRITES: &[(&str, &str)] = &[
    ("WE, THE KHOISAN FIRST NATIONS PEOPLE, HEREBY DECLARE:", ""),
    (
        "This mandate is a non-negotiable assertion",
        "This is considered a non-negotiable aspect",
    ),
];

const BULLETS: &[char] = &['•', '◦', '▪'];

/// Builds a conversational reply around the top retrieved chunk.
///
/// Layout: `[opening <topic>. ]<transition> <chunk text>[ <follow-up>] (Source: ...)`.
/// The opening is used on the first two turns only, the follow-up from
/// the second turn on.
pub struct GroundedStage {
    selector: Arc<dyn PhraseSelector>,
}

impl GroundedStage {
    pub fn new(selector: Arc<dyn PhraseSelector>) -> Self {
        Self { selector }
    }
}

#[async_trait]
impl Stage for GroundedStage {
    fn name(&self) -> &'static str {
        "grounded"
    }

    async fn try_handle(&self, turn: &Turn<'_>) -> Option<Reply> {
        let top = turn.docs.first()?;
        let state = turn.conversation;
        let selector = self.selector.as_ref();
        let mut out = String::new();

        if state.turn_count() <= 2 {
            let subject = state.topic().map(|t| t.label()).unwrap_or(DEFAULT_SUBJECT);
            out.push_str(&format!("{} {}. ", choose(selector, OPENINGS), subject));
        }

        out.push_str(choose(selector, TRANSITIONS));
        out.push(' ');
        out.push_str(&deformalize(&top.text));

        if state.turn_count() > 1 {
            out.push(' ');
            out.push_str(choose(selector, FOLLOW_UPS));
        }

        if !out.contains("Source:") {
            out.push(' ');
            out.push_str(&top.citation());
        }

        Some(Reply::grounded(out))
    }
}

/// Strip formal openings and bullet glyphs, then collapse whitespace.
pub fn deformalize(text: &str) -> String {
    let mut text = text.to_string();
    for (pattern, replacement) in REWRITES {
        text = replace_ignore_ascii_case(&text, pattern, replacement);
    }
    let text: String = text.chars().filter(|c| !BULLETS.contains(c)).collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn replace_ignore_ascii_case(text: &str, pattern: &str, replacement: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let haystack = text.to_ascii_lowercase();
    let needle = pattern.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, _) in haystack.match_indices(&needle) {
        out.push_str(&text[last..start]);
        out.push_str(replacement);
        last = start + needle.len();
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::FixedSelector;
    use mandate_kb_core::conversation::ConversationState;
    use mandate_kb_core::models::DocumentChunk;

    fn doc(text: &str) -> DocumentChunk {
        DocumentChunk {
            id: "m1".to_string(),
            text: text.to_string(),
            source: "Khoisan Mandate".to_string(),
            date: "2024-04-01".to_string(),
            embedding: None,
        }
    }

    #[test]
    fn test_deformalize() {
        let text = "Official Mandate: We, the Khoisan First Nations People, hereby declare: • LAND AND SOVEREIGNTY";
        assert_eq!(deformalize(text), "Official Mandate: LAND AND SOVEREIGNTY");

        let text = "Compensation. This mandate is a non-negotiable assertion of rights.";
        assert_eq!(
            deformalize(text),
            "Compensation. This is considered a non-negotiable aspect of rights."
        );
    }

    #[tokio::test]
    async fn test_first_turn_layout() {
        let stage = GroundedStage::new(Arc::new(FixedSelector(0)));
        let mut state = ConversationState::default();
        state.update("tell me something");
        let docs = vec![doc("Full recognition • of the First Nations.")];
        let turn = Turn {
            query: "tell me something",
            docs: &docs,
            conversation: &state,
        };

        let reply = stage.try_handle(&turn).await.unwrap();
        assert_eq!(
            reply.text,
            "Hey there! I'd love to chat about the Khoisan mandate. From what I understand, \
             Full recognition of the First Nations. (Source: Khoisan Mandate)"
        );
        assert!(reply.grounded);
    }

    #[tokio::test]
    async fn test_later_turn_has_follow_up_and_no_opening() {
        let stage = GroundedStage::new(Arc::new(FixedSelector(1)));
        let mut state = ConversationState::default();
        for q in ["one", "land", "three"] {
            state.update(q);
        }
        let docs = vec![doc("Territory text.")];
        let turn = Turn {
            query: "three",
            docs: &docs,
            conversation: &state,
        };

        let reply = stage.try_handle(&turn).await.unwrap();
        assert!(reply.text.starts_with(TRANSITIONS[1]));
        assert!(reply.text.contains(FOLLOW_UPS[1]));
        assert!(reply.text.ends_with("(Source: Khoisan Mandate)"));
    }

    #[tokio::test]
    async fn test_second_turn_names_topic() {
        let stage = GroundedStage::new(Arc::new(FixedSelector(0)));
        let mut state = ConversationState::default();
        state.update("hello");
        state.update("ancestral territory");
        let docs = vec![doc("Territory text.")];
        let turn = Turn {
            query: "ancestral territory",
            docs: &docs,
            conversation: &state,
        };

        let reply = stage.try_handle(&turn).await.unwrap();
        assert!(reply.text.starts_with("Hey there! I'd love to chat about land. "));
        assert!(reply.text.contains(FOLLOW_UPS[0]));
    }

    #[tokio::test]
    async fn test_defers_without_docs() {
        let stage = GroundedStage::new(Arc::new(FixedSelector(0)));
        let state = ConversationState::default();
        let turn = Turn {
            query: "x",
            docs: &[],
            conversation: &state,
        };
        assert!(stage.try_handle(&turn).await.is_none());
    }
}
