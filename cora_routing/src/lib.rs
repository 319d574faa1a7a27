#![deny(
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

//! Domain routing between specialist agents.
//!
//! The [`HandoffService`] decides which agent handles a message. Per-session
//! routing state lives in a [`SessionDomains`] value owned by the caller, so
//! the service itself holds no mutable state.

mod classifier;
mod handoff;
mod state;

pub use classifier::{
    ClassificationError, IntentClassification, IntentClassifier, LlmIntentClassifier,
    build_classifier_prompt, parse_classification,
};
pub use handoff::{
    ClassificationResult, FALLBACK_CONFIDENCE, FIRST_MESSAGE_CONFIDENCE, HandoffService,
    RouterConfig,
};
pub use state::{SessionDomains, current_domain};
