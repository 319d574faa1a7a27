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

//! Chat-completion providers and the fallback-model service.

pub mod fallback;
mod openai;
pub mod retry;

pub use fallback::{FallbackModels, FallbackProfile, FallbackService};
pub use openai::OpenAiProvider;
pub use retry::retry_with_backoff;
