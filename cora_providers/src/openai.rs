use async_trait::async_trait;
use cora_core::{ChatMessage, LLMProvider, LLMResponse, ProviderError, SamplingParams, Usage};
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::info;

use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Chat-completions client for OpenAI-compatible endpoints.
///
/// With an API version set, requests go to the Azure deployment route
/// (`{base}/openai/deployments/{model}/chat/completions?api-version=...`)
/// and authenticate with an `api-key` header instead of a bearer token.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    api_version: Option<String>,
    default_model: String,
    retry_delays: Vec<Duration>,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        info!("Creating OpenAiProvider");
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: None,
            default_model: DEFAULT_MODEL.to_string(),
            retry_delays: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_api_version(mut self, api_version: Option<String>) -> Self {
        self.api_version = api_version;
        self
    }

    #[must_use]
    pub fn with_default_model(mut self, model: String) -> Self {
        self.default_model = model;
        self
    }

    /// Wait times before each retry of a retryable failure.
    #[must_use]
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    fn endpoint(&self, model: &str) -> String {
        match &self.api_version {
            Some(version) => format!(
                "{}/openai/deployments/{model}/chat/completions?api-version={version}",
                self.base_url
            ),
            None => format!("{}/chat/completions", self.base_url),
        }
    }

    /// Helper method to send a single request
    async fn try_send(&self, url: &str, request: &Value) -> Result<LLMResponse, ProviderError> {
        let builder = self.client.post(url).json(request);
        let builder = if self.api_version.is_some() {
            builder.header("api-key", &self.api_key)
        } else {
            builder.bearer_auth(&self.api_key)
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), body));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        parse_completion(&value)
    }
}

/// Build the request body; only the sampling fields that are set are sent.
fn build_request(messages: &[ChatMessage], model: &str, params: &SamplingParams) -> Value {
    let mut request = json!({
        "model": model,
        "messages": messages,
        "stream": false,
    });

    if let Some(temperature) = params.temperature {
        request["temperature"] = json!(temperature);
    }
    if let Some(top_p) = params.top_p {
        request["top_p"] = json!(top_p);
    }
    if let Some(penalty) = params.frequency_penalty {
        request["frequency_penalty"] = json!(penalty);
    }
    if let Some(penalty) = params.presence_penalty {
        request["presence_penalty"] = json!(penalty);
    }
    if let Some(max_tokens) = params.max_tokens {
        request["max_tokens"] = json!(max_tokens);
    }
    if params.json_mode {
        request["response_format"] = json!({ "type": "json_object" });
    }

    request
}

/// Map an error response to a `ProviderError`.
///
/// Moderation refusals are recognised by their error code, either
/// `content_filter` or an inner `ResponsibleAIPolicyViolation`.
fn classify_error(status: u16, body: String) -> ProviderError {
    let parsed: Option<Value> = serde_json::from_str(&body).ok();
    let error = parsed.as_ref().map(|v| &v["error"]);

    let code = error.and_then(|e| e["code"].as_str());
    let inner_code = error.and_then(|e| e["innererror"]["code"].as_str());

    if code == Some("content_filter") || inner_code == Some("ResponsibleAIPolicyViolation") {
        let reason = error
            .and_then(|e| e["message"].as_str())
            .unwrap_or("content_filter")
            .to_string();
        return ProviderError::ContentFiltered(reason);
    }

    ProviderError::Status { status, body }
}

fn parse_completion(response: &Value) -> Result<LLMResponse, ProviderError> {
    let choice = &response["choices"][0];

    if choice["finish_reason"].as_str() == Some("content_filter") {
        return Err(ProviderError::ContentFiltered(
            "completion stopped by content filter".to_string(),
        ));
    }

    let content = choice["message"]["content"]
        .as_str()
        .ok_or_else(|| ProviderError::InvalidResponse("missing content".to_string()))?
        .to_string();

    let usage = response["usage"].as_object().map(|u| Usage {
        prompt_tokens: u32::try_from(u["prompt_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
        completion_tokens: u32::try_from(u["completion_tokens"].as_u64().unwrap_or(0))
            .unwrap_or(0),
        total_tokens: u32::try_from(u["total_tokens"].as_u64().unwrap_or(0)).unwrap_or(0),
    });

    Ok(LLMResponse { content, usage })
}

#[async_trait]
impl LLMProvider for OpenAiProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
        params: &SamplingParams,
    ) -> anyhow::Result<LLMResponse> {
        let request = build_request(messages, model, params);
        let url = self.endpoint(model);

        info!("Sending chat completion request: model={}", model);

        let response = retry_with_backoff(
            || self.try_send(&url, &request),
            &self.retry_delays,
            ProviderError::is_retryable,
        )
        .await?;

        info!("Received chat completion response: model={}", model);
        Ok(response)
    }

    fn get_default_model(&self) -> &str {
        &self.default_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_only_set_sampling_fields() {
        let params = SamplingParams::default()
            .with_temperature(0.7)
            .with_top_p(0.95)
            .with_penalties(0.0, 0.0);
        let request = build_request(&[ChatMessage::system("hi")], "Phi-4", &params);

        assert_eq!(request["model"], "Phi-4");
        assert_eq!(request["messages"][0]["role"], "system");
        assert_eq!(request["messages"][0]["content"], "hi");
        assert_eq!(request["stream"], false);
        assert!(request.get("top_p").is_some());
        assert_eq!(request["frequency_penalty"], json!(0.0_f32));
        assert!(request.get("max_tokens").is_none());
        assert!(request.get("response_format").is_none());
    }

    #[test]
    fn json_mode_sets_response_format() {
        let request = build_request(&[], "gpt", &SamplingParams::default().json());
        assert_eq!(request["response_format"]["type"], "json_object");
    }

    #[test]
    fn endpoint_switches_to_azure_route() {
        let plain = OpenAiProvider::new("k".to_string()).with_base_url("http://local/v1/".into());
        assert_eq!(plain.endpoint("gpt"), "http://local/v1/chat/completions");

        let azure = OpenAiProvider::new("k".to_string())
            .with_base_url("https://zava.openai.azure.com".into())
            .with_api_version(Some("2024-10-21".into()));
        assert_eq!(
            azure.endpoint("gpt-5-mini"),
            "https://zava.openai.azure.com/openai/deployments/gpt-5-mini/chat/completions?api-version=2024-10-21"
        );
    }

    #[test]
    fn content_filter_error_code_is_moderation() {
        let body = r#"{"error":{"code":"content_filter","message":"The response was filtered"}}"#;
        let err = classify_error(400, body.to_string());
        assert!(
            matches!(err, ProviderError::ContentFiltered(ref reason) if reason == "The response was filtered")
        );
    }

    #[test]
    fn policy_violation_inner_code_is_moderation() {
        let body = r#"{"error":{"code":"BadRequest","message":"blocked","innererror":{"code":"ResponsibleAIPolicyViolation"}}}"#;
        assert!(matches!(
            classify_error(400, body.to_string()),
            ProviderError::ContentFiltered(_)
        ));
    }

    #[test]
    fn other_errors_keep_status_and_body() {
        let err = classify_error(503, "upstream down".to_string());
        assert!(matches!(err, ProviderError::Status { status: 503, ref body } if body == "upstream down"));
        assert!(err.is_retryable());
    }

    #[test]
    fn parses_content_and_usage() {
        let response = json!({
            "choices": [{ "message": { "content": "hello" }, "finish_reason": "stop" }],
            "usage": { "prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5 }
        });
        let parsed = parse_completion(&response).unwrap();
        assert_eq!(parsed.content, "hello");
        let usage = parsed.usage.unwrap();
        assert_eq!(usage.total_tokens, 5);
    }

    #[test]
    fn filtered_finish_reason_is_moderation() {
        let response = json!({
            "choices": [{ "message": { "content": null }, "finish_reason": "content_filter" }]
        });
        assert!(matches!(
            parse_completion(&response),
            Err(ProviderError::ContentFiltered(_))
        ));
    }

    #[test]
    fn missing_content_is_invalid_response() {
        let response = json!({ "choices": [] });
        assert!(matches!(
            parse_completion(&response),
            Err(ProviderError::InvalidResponse(_))
        ));
    }
}
