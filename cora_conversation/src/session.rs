//! Per-session conversation state.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::history::{ChatHistory, Speaker, clean_conversation_history, redact_bad_prompts};

/// A conversation session with its turn history.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    /// Session identifier
    pub id: String,
    pub history: ChatHistory,
    /// User prompts that were blocked by moderation
    pub bad_prompts: HashSet<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    /// Create an empty session; `capacity` bounds the stored history entries.
    #[must_use]
    pub fn new(id: impl Into<String>, capacity: Option<usize>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            history: capacity.map_or_else(ChatHistory::unbounded, ChatHistory::with_capacity),
            bad_prompts: HashSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append one user/bot exchange.
    pub fn record_turn(&mut self, user_message: &str, bot_reply: &str) {
        self.history.push(Speaker::User, user_message);
        self.history.push(Speaker::Bot, bot_reply);
        self.updated_at = Utc::now();
    }

    pub fn mark_bad_prompt(&mut self, prompt: &str) {
        self.bad_prompts.insert(prompt.to_string());
    }

    /// History as shown to models: blocked prompts redacted, bot replies reduced to answers.
    #[must_use]
    pub fn context_history(&self) -> ChatHistory {
        clean_conversation_history(&redact_bad_prompts(&self.history, &self.bad_prompts))
    }

    #[must_use]
    pub fn user_turns(&self) -> usize {
        self.history
            .iter()
            .filter(|(speaker, _)| *speaker == Speaker::User)
            .count()
    }
}
