//! Conversation manager for routed multi-agent dialogue.
//!
//! The `ConversationManager` is the main entry point: each turn is routed to
//! a specialist agent, answered by the primary model (or the fallback model
//! when the primary call fails) and normalized into an [`AgentResponse`].

use cora_core::response::product_names_from_value;
use cora_core::{
    AgentResponse, CompletionOutcome, Domain, LLMProvider, SamplingParams, parse_agent_response,
};
use cora_providers::{FallbackProfile, FallbackService};
use cora_routing::{ClassificationResult, HandoffService, IntentClassifier, SessionDomains};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::history::{HistoryConfig, HistoryManager, format_chat_history};
use crate::session::ConversationSession;

/// Configuration for conversation management.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Model to use for specialist agent replies
    pub model: String,
    pub sampling: SamplingParams,
    /// Maximum history entries stored per session
    pub history_capacity: Option<usize>,
    /// Window of history sent with each request
    pub history: HistoryConfig,
    /// Answer given when moderation blocks a turn
    pub moderation_notice: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            sampling: SamplingParams::default().with_temperature(0.7),
            history_capacity: Some(20),
            history: HistoryConfig::default(),
            moderation_notice: "I'm sorry, I can't help with that request. \
                                Is there something else I can help you find?"
                .to_string(),
        }
    }
}

impl ConversationConfig {
    /// Set the model name.
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }
}

/// Errors that can occur during conversation management.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("LLM provider error: {0}")]
    LLMError(anyhow::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Empty response from LLM")]
    EmptyResponse,
}

/// Which model produced a turn's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Primary,
    Fallback,
    /// No model reply; the turn was blocked by moderation.
    Moderation,
}

/// Result of processing a conversation turn.
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub classification: ClassificationResult,
    pub response: AgentResponse,
    pub source: ReplySource,
    /// Number of user turns in the session so far
    pub turn_number: usize,
}

/// Multi-turn conversation manager.
pub struct ConversationManager<P = Arc<dyn LLMProvider>, C = Arc<dyn IntentClassifier>>
where
    P: Send + Sync,
    C: Send + Sync,
{
    provider: P,
    fallback: FallbackService<P>,
    router: HandoffService<C>,
    config: ConversationConfig,
    history_manager: HistoryManager,
    domains: SessionDomains,
    sessions: HashMap<String, ConversationSession>,
}

impl<P, C> ConversationManager<P, C>
where
    P: LLMProvider + Send + Sync,
    C: IntentClassifier + Send + Sync,
{
    pub fn new(
        provider: P,
        fallback: FallbackService<P>,
        router: HandoffService<C>,
        config: ConversationConfig,
    ) -> Self {
        info!("Creating conversation manager: model={}", config.model);
        let history_manager = HistoryManager::new(config.history.clone());
        Self {
            provider,
            fallback,
            router,
            config,
            history_manager,
            domains: SessionDomains::new(),
            sessions: HashMap::new(),
        }
    }

    /// Process a single conversation turn.
    pub async fn process_turn(
        &mut self,
        session_id: &str,
        user_input: &str,
    ) -> Result<TurnResult, ConversationError> {
        let capacity = self.config.history_capacity;
        let context = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| ConversationSession::new(session_id, capacity))
            .context_history();
        let history_text = format_chat_history(&context);

        let classification = self
            .router
            .classify_intent(
                &mut self.domains,
                user_input,
                session_id,
                (!history_text.is_empty()).then_some(history_text.as_str()),
            )
            .await;
        let domain = classification.domain;

        let messages =
            self.history_manager
                .build_llm_messages(&domain.persona_prompt(), &context, user_input);

        let primary = CompletionOutcome::from_result(
            self.provider
                .chat(&messages, &self.config.model, &self.config.sampling)
                .await,
        );

        let (reply, source) = match primary {
            CompletionOutcome::Reply(response) => (response.content, ReplySource::Primary),
            CompletionOutcome::ModerationBlocked(reason) => {
                warn!("Primary model blocked turn for session {session_id}: {reason}");
                (String::new(), ReplySource::Moderation)
            }
            CompletionOutcome::Failed(e) => {
                warn!("Primary model failed for session {session_id}: {e:#}. Calling fallback");
                let prompt = build_fallback_prompt(domain, &history_text, user_input);
                match self.fallback.call(&prompt, fallback_profile(domain)).await {
                    CompletionOutcome::Reply(response) => (response.content, ReplySource::Fallback),
                    CompletionOutcome::ModerationBlocked(_) => {
                        (String::new(), ReplySource::Moderation)
                    }
                    CompletionOutcome::Failed(e) => return Err(ConversationError::LLMError(e)),
                }
            }
        };

        let session = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| ConversationSession::new(session_id, capacity));

        let response = if source == ReplySource::Moderation {
            session.mark_bad_prompt(user_input);
            let mut response = AgentResponse::from_answer(self.config.moderation_notice.clone());
            response.agent.clone_from(&classification.agent_name);
            response
        } else {
            if reply.trim().is_empty() {
                return Err(ConversationError::EmptyResponse);
            }
            let mut response = parse_agent_response(&reply);
            if response.agent.is_empty() {
                response.agent.clone_from(&classification.agent_name);
            }
            response
        };

        session.record_turn(user_input, &history_entry(&response));
        let turn_number = session.user_turns();
        debug!("Turn {turn_number} completed for session {session_id} via {source:?}");

        Ok(TurnResult {
            classification,
            response,
            source,
            turn_number,
        })
    }

    /// Route a session to `domain`; unknown names fall back to the default domain.
    pub fn set_domain(&mut self, session_id: &str, domain: &str) -> Domain {
        self.router.set_domain(&mut self.domains, session_id, domain)
    }

    #[must_use]
    pub fn current_domain(&self, session_id: &str) -> Option<Domain> {
        self.router.get_current_domain(&self.domains, session_id)
    }

    /// Forget a session's routing and history. Returns whether anything was recorded.
    pub fn reset_session(&mut self, session_id: &str) -> bool {
        let routed = self.router.reset_session(&mut self.domains, session_id);
        let stored = self.sessions.remove(session_id).is_some();
        routed || stored
    }

    #[must_use]
    pub fn session(&self, session_id: &str) -> Option<&ConversationSession> {
        self.sessions.get(session_id)
    }

    /// Run an interactive conversation loop on stdin/stdout.
    ///
    /// `/agent <domain>` routes the session by hand and `/reset` starts over.
    pub async fn run_interactive(&mut self, session_id: &str) -> Result<(), ConversationError> {
        println!("=== Conversation Session: {session_id} ===");
        println!("Type 'exit', 'quit', or Ctrl+C to end the session.");
        println!("Commands: /agent <domain>, /reset\n");

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let mut input = String::new();
            if std::io::stdin().read_line(&mut input)? == 0 {
                break;
            }
            let input = input.trim();

            if matches!(input, "exit" | "quit" | "q") {
                break;
            }

            if input.is_empty() {
                continue;
            }

            if let Some(domain) = agent_command(input) {
                let domain = self.set_domain(session_id, domain);
                println!("\nNow talking to {}\n", domain.agent_name());
                continue;
            }

            if input == "/reset" {
                self.reset_session(session_id);
                println!("\nSession reset.\n");
                continue;
            }

            match self.process_turn(session_id, input).await {
                Ok(result) => {
                    println!("\n[{}] {}\n", result.response.agent, result.response.answer);
                    debug!(
                        "Routed to {} (confidence {:.2}): {}",
                        result.classification.domain,
                        result.classification.confidence,
                        result.classification.reasoning
                    );
                }
                Err(e) => {
                    eprintln!("Error: {e}");
                }
            }
        }

        let turns = self.session(session_id).map_or(0, ConversationSession::user_turns);
        println!("\nSession ended. Total turns: {turns}");
        Ok(())
    }
}

/// Domain named by an `/agent <domain>` command line.
fn agent_command(input: &str) -> Option<&str> {
    let mut words = input.split_whitespace();
    if words.next() != Some("/agent") {
        return None;
    }
    Some(words.next().unwrap_or_default())
}

const fn fallback_profile(domain: Domain) -> FallbackProfile {
    match domain {
        Domain::Cora => FallbackProfile::Cora,
        _ => FallbackProfile::General,
    }
}

fn build_fallback_prompt(domain: Domain, history_text: &str, user_input: &str) -> String {
    let mut prompt = domain.persona_prompt();
    if !history_text.is_empty() {
        prompt.push_str("\n\nConversation so far:\n");
        prompt.push_str(history_text);
    }
    prompt.push_str("\n\nCustomer message: ");
    prompt.push_str(user_input);
    prompt
}

/// Bot history entry: the answer plus the names of any products it mentioned.
fn history_entry(response: &AgentResponse) -> String {
    let products = serde_json::to_value(response)
        .map(|value| product_names_from_value(&value))
        .unwrap_or_default();
    format!("{}{products}", response.answer)
}
