//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own type, so dispatch is
//! resolved at compile time.

use cora_config::Config;
use cora_conversation::{ConversationConfig, ConversationManager, HistoryConfig};
use cora_core::LLMProvider;
use cora_providers::{FallbackModels, FallbackService, OpenAiProvider};
use cora_routing::{HandoffService, IntentClassifier, LlmIntentClassifier, RouterConfig};
use std::sync::Arc;
use tracing::info;

mod chat;
mod info;
mod init;
mod parse;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use parse::{ParseInput, ParseStrategy};
pub use version::VersionStrategy;

/// Components shared by the commands that talk to a model.
pub struct CommonComponents {
    pub config: Config,
    /// Primary agent provider, retrying per `retry_delays_secs`.
    pub provider: Arc<dyn LLMProvider>,
    /// Single-attempt provider for classification and fallback calls.
    pub single_shot: Arc<dyn LLMProvider>,
}

pub fn init_common_components() -> anyhow::Result<CommonComponents> {
    let config = Config::load()?;
    let openai = &config.providers.openai;

    let base = OpenAiProvider::new(openai.api_key.clone())
        .with_base_url(openai.base_url.clone())
        .with_api_version(openai.api_version.clone())
        .with_default_model(config.agents.defaults.model.clone());

    info!(
        "Provider ready: base_url={}, retries={}",
        openai.base_url,
        openai.retry_delays_secs.len()
    );

    let provider: Arc<dyn LLMProvider> =
        Arc::new(base.clone().with_retry_delays(openai.retry_delays()));
    let single_shot: Arc<dyn LLMProvider> = Arc::new(base);

    Ok(CommonComponents {
        config,
        provider,
        single_shot,
    })
}

/// Wire router, fallback and primary model into a conversation manager.
pub fn build_conversation_manager(
    common: &CommonComponents,
    model: Option<String>,
) -> ConversationManager {
    let config = &common.config;

    let classifier: Arc<dyn IntentClassifier> = Arc::new(LlmIntentClassifier::new(
        common.single_shot.clone(),
        config.classifier_model().to_string(),
    ));
    let router = HandoffService::new(
        classifier,
        RouterConfig {
            default_domain: config.routing.default_domain,
            lazy_classification: config.routing.lazy_classification,
        },
    );

    let fallback = FallbackService::new(
        common.single_shot.clone(),
        FallbackModels {
            general: config.fallback.model.clone(),
            cora: config.fallback.cora_model.clone(),
        },
    );

    let conversation_config = ConversationConfig {
        model: model.unwrap_or_else(|| config.agents.defaults.model.clone()),
        sampling: config.agents.defaults.sampling(),
        history_capacity: config.history.capacity,
        history: HistoryConfig::default()
            .with_max_messages(config.history.max_messages)
            .with_max_chars(config.history.max_chars),
        ..ConversationConfig::default()
    };

    ConversationManager::new(
        common.provider.clone(),
        fallback,
        router,
        conversation_config,
    )
}

/// Core trait defining the contract for all command strategies.
///
/// # Example
/// ```rust,ignore
/// struct MyStrategy;
///
/// impl CommandStrategy for MyStrategy {
///     type Input = MyInput;
///
///     async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}
