//! Phrase pools, curated answers and the injectable phrase selector.
//!
//! Every template reply is assembled from the constants in this file.
//! Random choices go through a [`PhraseSelector`] so tests can pin them.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Picks an index into a phrase pool.
pub trait PhraseSelector: Send + Sync {
    /// Return an index in `0..len`. `len` is never zero.
    fn pick(&self, len: usize) -> usize;
}

/// Uniform random selection from a seedable RNG.
pub struct RandomSelector {
    rng: Mutex<StdRng>,
}

impl RandomSelector {
    /// Seeded from the OS when `seed` is `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl PhraseSelector for RandomSelector {
    fn pick(&self, len: usize) -> usize {
        self.rng.lock().random_range(0..len)
    }
}

/// Always picks the same index (modulo the pool size).
pub struct FixedSelector(pub usize);

impl PhraseSelector for FixedSelector {
    fn pick(&self, len: usize) -> usize {
        self.0 % len
    }
}

pub fn choose<'a>(selector: &dyn PhraseSelector, pool: &[&'a str]) -> &'a str {
    pool[selector.pick(pool.len())]
}

// ============ Greeting stage ============

pub const GREETING_TRIGGERS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "greetings",
    "good morning",
    "good afternoon",
    "good evening",
];

pub const GREETING_REPLIES: &[&str] = &[
    "Hello! I'm here to help you understand and support the Khoisan First Nations mandate. Would you like to learn about our land sovereignty, cultural recognition, representation, or financial reparation initiatives?",
    "Hi there! I'm your guide to the Khoisan First Nations mandate. What would you like to know about our mission for indigenous rights and cultural preservation?",
    "Welcome! I'm dedicated to sharing information about the Khoisan First Nations mandate. How can I help you understand our vital cause today?",
];

// ============ Topic stage ============

pub const LAND_ANSWER: &str = "The Khoisan mandate calls for the unconditional return of ancestral territories. This involves complete land ownership, full mineral extraction rights, and comprehensive access to maritime resources that were historically theirs. Archaeological evidence suggests the Khoisan have inhabited Southern Africa for up to 140,000 years, making their land claims historically significant. Is there a specific aspect of land sovereignty you'd like to explore further?";

pub const CULTURE_ANSWER: &str = "Cultural recognition in the Khoisan mandate focuses on preserving identity and heritage. This includes stopping the use of colonial terms like 'coloured,' officially recognizing Khoisan languages as national languages, and implementing state-funded language preservation programs. Some Khoisan languages have fewer than 100 fluent speakers remaining, making preservation efforts urgent. What aspects of cultural preservation interest you most?";

pub const REPRESENTATION_ANSWER: &str = "Political representation for the Khoisan people involves direct, proportional parliamentary representation and absolute veto power on legislation affecting their territories and rights. The mandate emphasizes that no agreements, treaties, or laws should be enacted without explicit, documented Khoisan community consent. This principle of Free, Prior and Informed Consent is considered fundamental to their sovereignty. Are you interested in how this would change current governance structures?";

pub const REPARATION_ANSWER: &str = "Financial reparations in the Khoisan mandate focus on addressing historical economic injustices. This includes establishing a dedicated national fund for Khoisan community development and creating transparent mechanisms to compensate for centuries of economic marginalization and land dispossession. These reparations aim to provide resources for education, healthcare, and cultural preservation. Would you like to know more about how these funds would be allocated?";

// ============ Conversational stage ============

pub const OPENINGS: &[&str] = &[
    "Hey there! I'd love to chat about",
    "Great question about",
    "Thanks for asking about",
    "I'm happy to discuss",
    "That's an interesting question about",
];

pub const TRANSITIONS: &[&str] = &[
    "From what I understand,",
    "Based on the Khoisan mandate,",
    "According to the information I have,",
    "The Khoisan position on this is that",
    "Looking at this issue,",
];

pub const FOLLOW_UPS: &[&str] = &[
    "Would you like to know more about how this affects the community?",
    "Is there a specific aspect of this you're curious about?",
    "Does that answer your question? I'm happy to elaborate.",
    "What other aspects of the Khoisan mandate are you interested in?",
    "How does this information compare to what you've heard before?",
];

pub const DEFAULT_SUBJECT: &str = "the Khoisan mandate";

// ============ Fallback stage ============

pub const CLARIFICATIONS: &[&str] = &[
    "Could you tell me more about what you're looking for regarding",
    "I'm not completely sure I understand. Could you elaborate on what you mean by",
    "That's an interesting question. To give you the best answer, could you clarify what you want to know about",
    "I'd like to help with that. Can you share more specifics about your interest in",
    "To make sure I address your question properly, could you tell me more about your interest in",
];

pub const PILLARS_SUFFIX: &str = "The Khoisan mandate covers land sovereignty, cultural recognition, political representation, and financial reparation. I'd be happy to discuss any of these areas in more detail.";

pub const MANDATE_OVERVIEW: &str = "The Khoisan mandate focuses on four key pillars: land sovereignty, cultural recognition, political representation, and financial reparation. Each addresses historical injustices faced by the indigenous Khoisan people. Which aspect would you like to explore further?";

pub const HELP_REPLY: &str = "I'm here to help you understand how to support the Khoisan mandate. We focus on four key areas: land sovereignty, cultural recognition, political representation, and financial reparation. Which aspect would you like to learn more about?";

pub const THANKS_REPLY: &str = "You're welcome! Your interest in supporting the Khoisan First Nations mandate is appreciated. Is there anything else you'd like to know about our cause?";

pub const GENERIC_FALLBACK: &str = "While I don't have specific information about that particular question, I'd be happy to tell you about the Khoisan mandate's key pillars: land sovereignty, cultural recognition, political representation, and financial reparation. Which interests you most? You can also learn more at https://khoisanvoice.carrd.co/";

/// Reply to a blank message.
pub const EMPTY_QUERY: &str = "Please type a question. I can talk about land sovereignty, cultural recognition, political representation, or financial reparation.";

/// Last resort when no stage produced a reply.
pub const APOLOGY: &str = "I'm sorry, I couldn't put together an answer just now. Please try again, or ask about land sovereignty, cultural recognition, political representation, or financial reparation.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_selector_is_reproducible() {
        let a = RandomSelector::new(Some(42));
        let b = RandomSelector::new(Some(42));
        let picks_a: Vec<_> = (0..20).map(|_| a.pick(5)).collect();
        let picks_b: Vec<_> = (0..20).map(|_| b.pick(5)).collect();
        assert_eq!(picks_a, picks_b);
        assert!(picks_a.iter().all(|&i| i < 5));
    }

    #[test]
    fn test_fixed_selector_wraps() {
        let s = FixedSelector(7);
        assert_eq!(choose(&s, GREETING_REPLIES), GREETING_REPLIES[1]);
    }

    #[test]
    fn test_curated_answers_end_with_question() {
        for answer in [LAND_ANSWER, CULTURE_ANSWER, REPRESENTATION_ANSWER, REPARATION_ANSWER] {
            assert!(answer.ends_with('?'));
        }
    }
}
