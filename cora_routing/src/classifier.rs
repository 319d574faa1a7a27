//! Intent classification through a language model.

use async_trait::async_trait;
use cora_core::response::extract_json_candidate;
use cora_core::{ChatMessage, Domain, LLMProvider, SamplingParams};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Structured verdict returned by a classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentClassification {
    pub domain: Domain,
    pub is_domain_change: bool,
    /// Between 0.0 and 1.0.
    pub confidence: f32,
    pub reasoning: String,
}

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("No JSON object in classifier reply: {0}")]
    MissingJson(String),

    #[error("Malformed classifier reply: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Confidence out of range: {0}")]
    ConfidenceOutOfRange(f32),
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classify `user_message` given the session's current domain.
    async fn classify(
        &self,
        current_domain: Domain,
        user_message: &str,
        chat_history: Option<&str>,
    ) -> anyhow::Result<IntentClassification>;
}

#[async_trait]
impl<T: IntentClassifier + ?Sized> IntentClassifier for Arc<T> {
    async fn classify(
        &self,
        current_domain: Domain,
        user_message: &str,
        chat_history: Option<&str>,
    ) -> anyhow::Result<IntentClassification> {
        (**self)
            .classify(current_domain, user_message, chat_history)
            .await
    }
}

/// Render the classification prompt.
#[must_use]
pub fn build_classifier_prompt(
    current_domain: Domain,
    user_message: &str,
    chat_history: Option<&str>,
) -> String {
    let mut prompt =
        String::from("You are an intent classifier for Zava shopping assistant.\n\nAvailable domains:\n");
    for (i, domain) in Domain::ALL.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}: {}", i + 1, domain, domain.description());
    }

    prompt.push_str(
        "\nAnalyze the user's message and determine:\n\
         1. Which domain it belongs to\n\
         2. Whether it's a domain change from the current context\n\n",
    );

    if let Some(history) = chat_history.filter(|h| !h.trim().is_empty()) {
        let _ = write!(prompt, "Recent conversation:\n{history}\n\n");
    }

    let choices = Domain::ALL.map(Domain::as_str).join("|");
    let _ = write!(
        prompt,
        "Current domain: {current_domain}\n\
         User message: {user_message}\n\n\
         Respond with JSON:\n\
         {{\n    \"domain\": \"{choices}\",\n    \"is_domain_change\": true|false,\n    \
         \"confidence\": 0.0-1.0,\n    \"reasoning\": \"brief explanation\"\n}}\n\n\
         Rules:\n\
         - If user mentions \"cart\", \"add to cart\", \"remove from cart\", \"checkout\", \"view cart\" -> cart_manager domain\n\
         - If uncertain, default to current domain with low confidence\n\
         - Detect explicit requests to \"talk to someone else\" or \"get help with X\" as domain changes\n\
         - Consider context: if discussing design, stay in interior_designer unless user explicitly changes topic\n\
         - Default to 'cora' for general/ambiguous queries\n"
    );

    prompt
}

/// Read a classifier reply, tolerating prose or code fences around the JSON.
pub fn parse_classification(reply: &str) -> Result<IntentClassification, ClassificationError> {
    let candidate = extract_json_candidate(reply)
        .ok_or_else(|| ClassificationError::MissingJson(reply.to_string()))?;
    let intent: IntentClassification = serde_json::from_str(candidate)?;

    if !(0.0..=1.0).contains(&intent.confidence) {
        return Err(ClassificationError::ConfidenceOutOfRange(intent.confidence));
    }

    Ok(intent)
}

/// Classifier backed by a single chat-completion call in JSON mode.
pub struct LlmIntentClassifier<P = Arc<dyn LLMProvider>>
where
    P: Send + Sync,
{
    provider: P,
    model: String,
}

impl<P> LlmIntentClassifier<P>
where
    P: LLMProvider + Send + Sync,
{
    pub const fn new(provider: P, model: String) -> Self {
        Self { provider, model }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl<P> IntentClassifier for LlmIntentClassifier<P>
where
    P: LLMProvider + Send + Sync,
{
    async fn classify(
        &self,
        current_domain: Domain,
        user_message: &str,
        chat_history: Option<&str>,
    ) -> anyhow::Result<IntentClassification> {
        let prompt = build_classifier_prompt(current_domain, user_message, chat_history);
        let messages = [ChatMessage::user(prompt)];
        let params = SamplingParams::default().json();

        let response = self.provider.chat(&messages, &self.model, &params).await?;
        debug!("Classifier reply: {}", response.content);

        Ok(parse_classification(&response.content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cora_core::{LLMResponse, Role};
    use std::sync::Mutex;

    #[test]
    fn prompt_lists_domains_and_context() {
        let prompt = build_classifier_prompt(Domain::InteriorDesigner, "add the lamp", None);
        for domain in Domain::ALL {
            assert!(prompt.contains(domain.as_str()));
        }
        assert!(prompt.contains("Current domain: interior_designer"));
        assert!(prompt.contains("User message: add the lamp"));
        assert!(prompt.contains("\"is_domain_change\": true|false"));
        assert!(!prompt.contains("Recent conversation"));
    }

    #[test]
    fn prompt_includes_history_when_present() {
        let prompt = build_classifier_prompt(Domain::Cora, "hi", Some("user: hello\nbot: hey"));
        assert!(prompt.contains("Recent conversation:\nuser: hello\nbot: hey"));

        let blank = build_classifier_prompt(Domain::Cora, "hi", Some("  "));
        assert!(!blank.contains("Recent conversation"));
    }

    #[test]
    fn parses_fenced_reply() {
        let reply = "```json\n{\"domain\":\"cart_manager\",\"is_domain_change\":true,\"confidence\":0.9,\"reasoning\":\"cart\"}\n```";
        let intent = parse_classification(reply).unwrap();
        assert_eq!(intent.domain, Domain::CartManager);
        assert!(intent.is_domain_change);
        assert!((intent.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_unknown_domain() {
        let reply = r#"{"domain":"florist","is_domain_change":true,"confidence":0.9,"reasoning":"x"}"#;
        assert!(matches!(
            parse_classification(reply),
            Err(ClassificationError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_confidence_out_of_range() {
        let reply = r#"{"domain":"cora","is_domain_change":false,"confidence":1.5,"reasoning":"x"}"#;
        assert!(matches!(
            parse_classification(reply),
            Err(ClassificationError::ConfidenceOutOfRange(_))
        ));
    }

    #[test]
    fn rejects_prose() {
        assert!(matches!(
            parse_classification("I think cart_manager"),
            Err(ClassificationError::MissingJson(_))
        ));
    }

    struct Scripted {
        reply: String,
        seen: Mutex<Vec<(String, SamplingParams, Vec<ChatMessage>)>>,
    }

    #[async_trait]
    impl LLMProvider for Scripted {
        async fn chat(
            &self,
            messages: &[ChatMessage],
            model: &str,
            params: &SamplingParams,
        ) -> anyhow::Result<LLMResponse> {
            self.seen
                .lock()
                .unwrap()
                .push((model.to_string(), params.clone(), messages.to_vec()));
            Ok(LLMResponse {
                content: self.reply.clone(),
                usage: None,
            })
        }

        fn get_default_model(&self) -> &'static str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn llm_classifier_sends_json_mode_prompt() {
        let provider = Arc::new(Scripted {
            reply: r#"{"domain":"customer_loyalty","is_domain_change":true,"confidence":0.8,"reasoning":"discount"}"#.to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let classifier = LlmIntentClassifier::new(provider.clone(), "gpt-4o-mini".to_string());

        let intent = classifier
            .classify(Domain::Cora, "any discounts?", None)
            .await
            .unwrap();
        assert_eq!(intent.domain, Domain::CustomerLoyalty);

        let seen = provider.seen.lock().unwrap();
        let (model, params, messages) = &seen[0];
        assert_eq!(model, "gpt-4o-mini");
        assert!(params.json_mode);
        assert_eq!(messages[0].role, Role::User);
        assert!(messages[0].content.contains("User message: any discounts?"));
    }
}
