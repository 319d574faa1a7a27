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

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub mod domain;
pub mod response;
pub mod util;

pub use domain::{Domain, DomainParseError};
pub use response::{AgentResponse, parse_agent_response};
pub use util::log_timing;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters for a chat completion.
///
/// Unset fields are left out of the request so the endpoint default applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Ask the endpoint for a JSON object reply.
    #[serde(default)]
    pub json_mode: bool,
}

impl SamplingParams {
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub const fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    #[must_use]
    pub const fn with_penalties(mut self, frequency: f32, presence: f32) -> Self {
        self.frequency_penalty = Some(frequency);
        self.presence_penalty = Some(presence);
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub const fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
        params: &SamplingParams,
    ) -> anyhow::Result<LLMResponse>;

    fn get_default_model(&self) -> &str;
}

#[async_trait]
impl<T: LLMProvider + ?Sized> LLMProvider for Arc<T> {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
        params: &SamplingParams,
    ) -> anyhow::Result<LLMResponse> {
        (**self).chat(messages, model, params).await
    }

    fn get_default_model(&self) -> &str {
        (**self).get_default_model()
    }
}

/// Failure reported by a chat-completion endpoint.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Content blocked by moderation policy: {0}")]
    ContentFiltered(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether another attempt of the same request could succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => matches!(*status, 408 | 429 | 500..=599),
            Self::ContentFiltered(_) | Self::InvalidResponse(_) => false,
        }
    }
}

/// Outcome of a model call, with moderation refusals split out from other failures.
#[derive(Debug)]
pub enum CompletionOutcome {
    Reply(LLMResponse),
    ModerationBlocked(String),
    Failed(anyhow::Error),
}

impl CompletionOutcome {
    #[must_use]
    pub fn from_result(result: anyhow::Result<LLMResponse>) -> Self {
        match result {
            Ok(response) => Self::Reply(response),
            Err(err) => match err.downcast_ref::<ProviderError>() {
                Some(ProviderError::ContentFiltered(reason)) => {
                    Self::ModerationBlocked(reason.clone())
                }
                _ => Self::Failed(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_params_skip_unset_fields() {
        let params = SamplingParams::default().with_temperature(0.7);
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["temperature"], serde_json::json!(0.7_f32));
        assert!(value.get("top_p").is_none());
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn retryable_statuses() {
        let status = |status| ProviderError::Status {
            status,
            body: String::new(),
        };
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!ProviderError::ContentFiltered("hate".to_string()).is_retryable());
        assert!(ProviderError::Transport("reset".to_string()).is_retryable());
    }

    #[test]
    fn outcome_splits_moderation_from_failures() {
        let blocked = CompletionOutcome::from_result(Err(
            ProviderError::ContentFiltered("violence".to_string()).into()
        ));
        assert!(matches!(blocked, CompletionOutcome::ModerationBlocked(ref r) if r == "violence"));

        let failed = CompletionOutcome::from_result(Err(ProviderError::Status {
            status: 500,
            body: "boom".to_string(),
        }
        .into()));
        assert!(matches!(failed, CompletionOutcome::Failed(_)));

        let other = CompletionOutcome::from_result(Err(anyhow::anyhow!("content_filter")));
        assert!(matches!(other, CompletionOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn arc_provider_delegates() {
        struct Echo;

        #[async_trait]
        impl LLMProvider for Echo {
            async fn chat(
                &self,
                messages: &[ChatMessage],
                _model: &str,
                _params: &SamplingParams,
            ) -> anyhow::Result<LLMResponse> {
                Ok(LLMResponse {
                    content: messages[0].content.clone(),
                    usage: None,
                })
            }

            fn get_default_model(&self) -> &'static str {
                "echo"
            }
        }

        let provider: Arc<dyn LLMProvider> = Arc::new(Echo);
        let reply = provider
            .chat(&[ChatMessage::user("ping")], "echo", &SamplingParams::default())
            .await
            .unwrap();
        assert_eq!(reply.content, "ping");
        assert_eq!(provider.get_default_model(), "echo");
    }
}
