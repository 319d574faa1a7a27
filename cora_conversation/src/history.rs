//! Conversation history management.
//!
//! This module provides the bounded turn history kept per session, the
//! transformations applied before history is shown to a model (answer
//! extraction, redaction) and the windowing used to build LLM requests.

use cora_core::response::extract_answer;
use cora_core::{ChatMessage, Role, log_timing};
use std::collections::{HashSet, VecDeque};
use std::time::Instant;

/// Replacement text for prompts that were blocked by moderation.
pub const REDACTED: &str = "<redacted>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Bot,
}

impl Speaker {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

/// Turn history with an optional capacity; the oldest entry is evicted first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatHistory {
    entries: VecDeque<(Speaker, String)>,
    capacity: Option<usize>,
}

impl ChatHistory {
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: None,
        }
    }

    /// Bounded history; `capacity` only limits eviction, nothing is reserved up front.
    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: Some(capacity),
        }
    }

    /// Same capacity as `self`, no entries.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        self.capacity
            .map_or_else(Self::unbounded, Self::with_capacity)
    }

    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn push(&mut self, speaker: Speaker, text: impl Into<String>) {
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            while self.entries.len() >= capacity {
                self.entries.pop_front();
            }
        }
        self.entries.push_back((speaker, text.into()));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Speaker, &str)> {
        self.entries
            .iter()
            .map(|(speaker, text)| (*speaker, text.as_str()))
    }
}

/// Render history as `user: ...` / `bot: ...` lines.
#[must_use]
pub fn format_chat_history(history: &ChatHistory) -> String {
    history
        .iter()
        .map(|(speaker, text)| format!("{}: {text}", speaker.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replace JSON bot replies by their answer text so product payloads stay out of prompts.
#[must_use]
pub fn clean_conversation_history(history: &ChatHistory) -> ChatHistory {
    let mut cleaned = history.empty_like();
    for (speaker, text) in history.iter() {
        let text = match speaker {
            Speaker::Bot => extract_answer(text).unwrap_or_else(|| text.to_string()),
            Speaker::User => text.to_string(),
        };
        cleaned.push(speaker, text);
    }
    cleaned
}

/// Replace user prompts found in `bad_prompts` with [`REDACTED`].
#[must_use]
pub fn redact_bad_prompts(history: &ChatHistory, bad_prompts: &HashSet<String>) -> ChatHistory {
    let mut redacted = history.empty_like();
    for (speaker, text) in history.iter() {
        if speaker == Speaker::User && bad_prompts.contains(text) {
            redacted.push(speaker, REDACTED);
        } else {
            redacted.push(speaker, text);
        }
    }
    redacted
}

/// Rebuild `history` from its serialized form, then append `user_message`.
///
/// Lines not starting with `user: ` or `bot: ` are skipped. An empty
/// `serialized` keeps the existing entries.
pub fn parse_conversation_history(serialized: &str, history: &mut ChatHistory, user_message: &str) {
    let start = Instant::now();

    if !serialized.is_empty() {
        history.clear();
        for line in serialized.trim().lines() {
            if let Some(text) = line.strip_prefix("user: ") {
                history.push(Speaker::User, text);
            } else if let Some(text) = line.strip_prefix("bot: ") {
                history.push(
                    Speaker::Bot,
                    extract_answer(text).unwrap_or_else(|| text.to_string()),
                );
            }
        }
    }
    history.push(Speaker::User, user_message);

    log_timing(
        "History Parsing",
        start,
        &format!("History entries: {}", history.len()),
    );
}

/// Configuration for the window of history sent to the model.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum number of messages to keep in context
    pub max_messages: usize,
    /// Maximum characters in context (approximate token limit)
    pub max_chars: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_messages: 20,
            max_chars: 8000,
        }
    }
}

impl HistoryConfig {
    #[must_use]
    pub const fn with_max_messages(mut self, max: usize) -> Self {
        self.max_messages = max;
        self
    }

    #[must_use]
    pub const fn with_max_chars(mut self, max: usize) -> Self {
        self.max_chars = max;
        self
    }
}

/// Builds LLM requests from session history.
#[derive(Debug, Clone, Default)]
pub struct HistoryManager {
    config: HistoryConfig,
}

impl HistoryManager {
    #[must_use]
    pub const fn new(config: HistoryConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Last `max_messages` entries, minus the oldest ones past `max_chars`.
    #[must_use]
    pub fn select_messages(&self, history: &ChatHistory) -> Vec<ChatMessage> {
        let skip = history.len().saturating_sub(self.config.max_messages);
        let mut selected: VecDeque<ChatMessage> = history
            .iter()
            .skip(skip)
            .map(|(speaker, text)| match speaker {
                Speaker::User => ChatMessage::user(text),
                Speaker::Bot => ChatMessage::assistant(text),
            })
            .collect();

        let mut total_chars: usize = selected.iter().map(|m| m.content.len()).sum();
        while total_chars > self.config.max_chars {
            match selected.pop_front() {
                Some(dropped) => total_chars -= dropped.content.len(),
                None => break,
            }
        }

        selected.into()
    }

    /// System prompt, windowed history, then the new user message.
    #[must_use]
    pub fn build_llm_messages(
        &self,
        system_prompt: &str,
        history: &ChatHistory,
        new_message: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(system_prompt)];
        messages.extend(self.select_messages(history));
        messages.push(ChatMessage {
            role: Role::User,
            content: new_message.to_string(),
        });
        messages
    }
}
