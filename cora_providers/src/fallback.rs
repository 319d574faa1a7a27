//! Fallback model calls used when the primary agent model is unavailable.

use cora_core::{ChatMessage, CompletionOutcome, LLMProvider, SamplingParams, log_timing};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Sampling profile for a fallback call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackProfile {
    /// Any specialist agent.
    General,
    /// The general shopping assistant, with nucleus sampling and explicit penalties.
    Cora,
}

impl FallbackProfile {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::General => "Fallback Call",
            Self::Cora => "Cora Fallback Call",
        }
    }

    #[must_use]
    pub const fn sampling(self) -> SamplingParams {
        let params = SamplingParams {
            temperature: Some(0.7),
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            max_tokens: None,
            json_mode: false,
        };
        match self {
            Self::General => params,
            Self::Cora => params.with_top_p(0.95).with_penalties(0.0, 0.0),
        }
    }
}

/// Model deployments used per fallback profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackModels {
    pub general: String,
    pub cora: String,
}

impl Default for FallbackModels {
    fn default() -> Self {
        Self {
            general: "gpt-5-mini".to_string(),
            cora: "Phi-4".to_string(),
        }
    }
}

pub struct FallbackService<P = Arc<dyn LLMProvider>>
where
    P: Send + Sync,
{
    provider: P,
    models: FallbackModels,
}

impl<P> FallbackService<P>
where
    P: LLMProvider + Send + Sync,
{
    pub const fn new(provider: P, models: FallbackModels) -> Self {
        Self { provider, models }
    }

    #[must_use]
    pub fn model_for(&self, profile: FallbackProfile) -> &str {
        match profile {
            FallbackProfile::General => &self.models.general,
            FallbackProfile::Cora => &self.models.cora,
        }
    }

    /// Send `prompt` as a single system message to the profile's model.
    pub async fn call(&self, prompt: &str, profile: FallbackProfile) -> CompletionOutcome {
        let start = Instant::now();
        let model = self.model_for(profile);
        let messages = [ChatMessage::system(prompt)];

        let result = self
            .provider
            .chat(&messages, model, &profile.sampling())
            .await;
        let outcome = CompletionOutcome::from_result(result);

        match &outcome {
            CompletionOutcome::Reply(_) => {}
            CompletionOutcome::ModerationBlocked(reason) => {
                warn!("{} blocked by moderation: {reason}", profile.label());
            }
            CompletionOutcome::Failed(e) => {
                warn!("{} failed: {e}", profile.label());
            }
        }

        log_timing(profile.label(), start, &format!("Model: {model}"));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cora_core::{LLMResponse, ProviderError, Role};
    use std::sync::Mutex;

    type Call = (String, SamplingParams, Vec<ChatMessage>);

    struct Recording {
        calls: Mutex<Vec<Call>>,
        reply: fn() -> anyhow::Result<LLMResponse>,
    }

    impl Recording {
        fn new(reply: fn() -> anyhow::Result<LLMResponse>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reply,
            }
        }
    }

    #[async_trait]
    impl LLMProvider for Recording {
        async fn chat(
            &self,
            messages: &[ChatMessage],
            model: &str,
            params: &SamplingParams,
        ) -> anyhow::Result<LLMResponse> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), params.clone(), messages.to_vec()));
            (self.reply)()
        }

        fn get_default_model(&self) -> &'static str {
            "recording"
        }
    }

    fn ok_reply() -> anyhow::Result<LLMResponse> {
        Ok(LLMResponse {
            content: "fallback says hi".to_string(),
            usage: None,
        })
    }

    #[tokio::test]
    async fn general_profile_uses_general_model() {
        let provider = Arc::new(Recording::new(ok_reply));
        let service = FallbackService::new(provider.clone(), FallbackModels::default());

        let outcome = service.call("be brief", FallbackProfile::General).await;
        assert!(matches!(outcome, CompletionOutcome::Reply(ref r) if r.content == "fallback says hi"));

        let calls = provider.calls.lock().unwrap();
        let (model, params, messages) = &calls[0];
        assert_eq!(model, "gpt-5-mini");
        assert_eq!(params.temperature, Some(0.7));
        assert_eq!(params.top_p, None);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "be brief");
    }

    #[tokio::test]
    async fn cora_profile_sets_nucleus_sampling() {
        let provider = Arc::new(Recording::new(ok_reply));
        let service = FallbackService::new(provider.clone(), FallbackModels::default());

        service.call("hello", FallbackProfile::Cora).await;

        let calls = provider.calls.lock().unwrap();
        let (model, params, _) = &calls[0];
        assert_eq!(model, "Phi-4");
        assert_eq!(params.top_p, Some(0.95));
        assert_eq!(params.frequency_penalty, Some(0.0));
        assert_eq!(params.presence_penalty, Some(0.0));
    }

    #[tokio::test]
    async fn moderation_is_a_typed_outcome() {
        let provider = Recording::new(|| {
            Err(ProviderError::ContentFiltered("self-harm".to_string()).into())
        });
        let service = FallbackService::new(provider, FallbackModels::default());

        let outcome = service.call("bad", FallbackProfile::General).await;
        assert!(matches!(outcome, CompletionOutcome::ModerationBlocked(ref r) if r == "self-harm"));
    }

    #[tokio::test]
    async fn other_errors_are_failed() {
        let provider = Recording::new(|| Err(anyhow::anyhow!("connection refused")));
        let service = FallbackService::new(provider, FallbackModels::default());

        let outcome = service.call("hi", FallbackProfile::Cora).await;
        assert!(matches!(outcome, CompletionOutcome::Failed(_)));
    }
}
