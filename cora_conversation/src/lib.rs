#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Multi-turn shopping conversations.
//!
//! Each turn is routed to a specialist agent, answered by the primary model
//! with the session's history as context and normalized into an
//! `AgentResponse`.
//!
//! # Key Features
//! - Bounded per-session history with moderation redaction
//! - Configurable message window for model requests
//! - Fallback model when the primary call fails

mod history;
mod manager;
mod session;

pub use history::{
    ChatHistory, HistoryConfig, HistoryManager, REDACTED, Speaker, clean_conversation_history,
    format_chat_history, parse_conversation_history, redact_bad_prompts,
};
pub use manager::{
    ConversationConfig, ConversationError, ConversationManager, ReplySource, TurnResult,
};
pub use session::ConversationSession;
