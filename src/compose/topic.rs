use async_trait::async_trait;

use mandate_kb_core::topic::Topic;

use super::phrases::{CULTURE_ANSWER, LAND_ANSWER, REPARATION_ANSWER, REPRESENTATION_ANSWER};
use super::{Reply, Stage, Turn};

/// Trigger rules per topic, as alternatives of keyword conjunctions: the
/// rule fires when every keyword of any one alternative is a substring of
/// the lowercased query.
const RULES: &[(Topic, &[&[&str]])] = &[
    (
        Topic::Land,
        &[
            &["land", "sovereignty"],
            &["land", "territory"],
            &["land", "ancestral"],
        ],
    ),
    (
        Topic::Culture,
        &[&["cultural", "recognition"], &["language"], &["identity"]],
    ),
    (
        Topic::Representation,
        &[
            &["representation"],
            &["political"],
            &["parliament"],
            &["governance"],
        ],
    ),
    (Topic::Reparation, &[&["financial", "reparation"]]),
];

/// Deterministic curated answers for the four pillars.
///
/// Rules are tried in the fixed order land, culture, representation,
/// reparation; the first hit wins. No randomness and no retrieval.
pub struct TopicStage;

impl TopicStage {
    pub fn match_topic(query: &str) -> Option<Topic> {
        let lowered = query.to_lowercase();
        RULES
            .iter()
            .find(|(_, alternatives)| {
                alternatives
                    .iter()
                    .any(|all| all.iter().all(|k| lowered.contains(k)))
            })
            .map(|(topic, _)| *topic)
    }

    pub fn answer(topic: Topic) -> &'static str {
        match topic {
            Topic::Land => LAND_ANSWER,
            Topic::Culture => CULTURE_ANSWER,
            Topic::Representation => REPRESENTATION_ANSWER,
            Topic::Reparation => REPARATION_ANSWER,
        }
    }
}

#[async_trait]
impl Stage for TopicStage {
    fn name(&self) -> &'static str {
        "topic"
    }

    async fn try_handle(&self, turn: &Turn<'_>) -> Option<Reply> {
        Self::match_topic(turn.query).map(|t| Reply::canned(Self::answer(t)))
    }
}
