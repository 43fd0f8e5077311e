//! Per-session conversation state.
//!
//! Tracks what the user is talking about so template replies can stay on
//! topic, and keeps a short transcript for generation prompts. One
//! [`ConversationState`] exists per chat session; the application owns
//! the session map.

use std::collections::VecDeque;

use serde::Serialize;

use crate::models::{Role, Turn};
use crate::topic::Topic;

/// Number of distinct topics remembered.
pub const RECENT_TOPICS: usize = 3;

/// Default number of messages kept in the transcript.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    topic: Option<Topic>,
    last_query: Option<String>,
    /// Most recent first, no duplicates.
    recent_topics: VecDeque<Topic>,
    turn_count: u32,
    history: VecDeque<Turn>,
    #[serde(skip)]
    history_limit: usize,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl ConversationState {
    pub fn new(history_limit: usize) -> Self {
        Self {
            topic: None,
            last_query: None,
            recent_topics: VecDeque::with_capacity(RECENT_TOPICS),
            turn_count: 0,
            history: VecDeque::new(),
            history_limit,
        }
    }

    /// Register a new user turn.
    ///
    /// Increments the turn counter, remembers the query and, when the query
    /// names a topic, makes it current and pushes it onto the recent list.
    /// A query with no topic leaves the current topic as it was.
    pub fn update(&mut self, query: &str) {
        self.turn_count += 1;
        self.last_query = Some(query.to_string());

        if let Some(topic) = Topic::detect(query) {
            self.topic = Some(topic);
            if !self.recent_topics.contains(&topic) {
                self.recent_topics.push_front(topic);
                self.recent_topics.truncate(RECENT_TOPICS);
            }
        }
    }

    /// Append a completed exchange to the transcript.
    pub fn record_exchange(&mut self, query: &str, reply: &str) {
        self.push_turn(Role::User, query);
        self.push_turn(Role::Assistant, reply);
    }

    fn push_turn(&mut self, role: Role, content: &str) {
        self.history.push_back(Turn {
            role,
            content: content.to_string(),
        });
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    pub fn topic(&self) -> Option<Topic> {
        self.topic
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    pub fn recent_topics(&self) -> impl Iterator<Item = Topic> + '_ {
        self.recent_topics.iter().copied()
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn history(&self) -> impl Iterator<Item = &Turn> + '_ {
        self.history.iter()
    }
}
