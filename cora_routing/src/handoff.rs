//! Handoff service: picks the specialist agent for each message.

use cora_core::Domain;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::classifier::IntentClassifier;
use crate::state::{SessionDomains, current_domain};

/// Confidence reported for the first-message default route.
pub const FIRST_MESSAGE_CONFIDENCE: f32 = 1.0;

/// Confidence reported when the classifier could not be used.
pub const FALLBACK_CONFIDENCE: f32 = 0.3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Domain for new sessions and for correcting unknown domain names.
    pub default_domain: Domain,
    /// Route a session's first message to the default domain without classifying it.
    pub lazy_classification: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_domain: Domain::Cora,
            lazy_classification: true,
        }
    }
}

/// Routing decision for one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub domain: Domain,
    pub is_domain_change: bool,
    pub confidence: f32,
    pub reasoning: String,
    pub agent_id: String,
    pub agent_name: String,
}

impl ClassificationResult {
    fn new(domain: Domain, is_domain_change: bool, confidence: f32, reasoning: String) -> Self {
        Self {
            domain,
            is_domain_change,
            confidence,
            reasoning,
            agent_id: domain.as_str().to_string(),
            agent_name: domain.agent_name().to_string(),
        }
    }
}

/// Intent router between the specialist agents.
///
/// Classifier failures never propagate: the message stays with the session's
/// current agent at [`FALLBACK_CONFIDENCE`]. There is a single classifier
/// attempt per message.
pub struct HandoffService<C = Arc<dyn IntentClassifier>>
where
    C: Send + Sync,
{
    classifier: C,
    config: RouterConfig,
}

impl<C> HandoffService<C>
where
    C: IntentClassifier + Send + Sync,
{
    pub fn new(classifier: C, config: RouterConfig) -> Self {
        info!(
            "Handoff service initialized with default_domain={}, lazy_classification={}",
            config.default_domain, config.lazy_classification
        );
        Self { classifier, config }
    }

    #[must_use]
    pub const fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Classify `user_message` and update the session's domain in `state`.
    pub async fn classify_intent(
        &self,
        state: &mut SessionDomains,
        user_message: &str,
        session_id: &str,
        chat_history: Option<&str>,
    ) -> ClassificationResult {
        let current = current_domain(state, session_id);
        let default_domain = self.config.default_domain;

        if current.is_none() && self.config.lazy_classification {
            info!("First message for session {session_id}, routing to {default_domain}");
            state.assign(session_id, default_domain);
            return ClassificationResult::new(
                default_domain,
                true,
                FIRST_MESSAGE_CONFIDENCE,
                format!("First message, routing to {default_domain}"),
            );
        }

        let context_domain = current.unwrap_or(default_domain);

        match self
            .classifier
            .classify(context_domain, user_message, chat_history)
            .await
        {
            Ok(intent) => {
                if intent.is_domain_change {
                    info!(
                        "Domain change for session {session_id}: {context_domain} -> {}",
                        intent.domain
                    );
                    state.assign(session_id, intent.domain);
                } else if current.is_none() {
                    state.assign(session_id, intent.domain);
                }

                let result = ClassificationResult::new(
                    intent.domain,
                    intent.is_domain_change,
                    intent.confidence,
                    intent.reasoning,
                );
                info!(
                    "Intent classification for session {session_id}: domain={}, change={}, confidence={:.2}",
                    result.domain, result.is_domain_change, result.confidence
                );
                result
            }
            Err(e) => {
                error!("Intent classification failed for session {session_id}: {e:#}");
                if current.is_none() {
                    state.assign(session_id, context_domain);
                }
                warn!("Falling back to domain: {context_domain}");
                ClassificationResult::new(
                    context_domain,
                    false,
                    FALLBACK_CONFIDENCE,
                    format!("Classification error, using {context_domain}"),
                )
            }
        }
    }

    #[must_use]
    pub fn get_current_domain(&self, state: &SessionDomains, session_id: &str) -> Option<Domain> {
        current_domain(state, session_id)
    }

    /// Manually route a session; unknown names fall back to the default domain.
    pub fn set_domain(&self, state: &mut SessionDomains, session_id: &str, domain: &str) -> Domain {
        let domain = domain.parse::<Domain>().unwrap_or_else(|e| {
            warn!("{e}, using default: {}", self.config.default_domain);
            self.config.default_domain
        });

        state.assign(session_id, domain);
        info!("Set domain for session {session_id}: {domain}");
        domain
    }

    /// Forget the session's domain. Returns whether one was recorded.
    pub fn reset_session(&self, state: &mut SessionDomains, session_id: &str) -> bool {
        let removed = state.remove(session_id).is_some();
        if removed {
            info!("Reset session {session_id}");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::IntentClassification;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        intent: Option<IntentClassification>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn returning(domain: Domain, is_domain_change: bool) -> Self {
            Self {
                intent: Some(IntentClassification {
                    domain,
                    is_domain_change,
                    confidence: 0.85,
                    reasoning: "test".to_string(),
                }),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                intent: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl IntentClassifier for Fixed {
        async fn classify(
            &self,
            _current_domain: Domain,
            _user_message: &str,
            _chat_history: Option<&str>,
        ) -> anyhow::Result<IntentClassification> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.intent
                .clone()
                .ok_or_else(|| anyhow::anyhow!("deployment not found"))
        }
    }

    #[tokio::test]
    async fn first_message_routes_to_default_without_classifying() {
        let service = HandoffService::new(
            Fixed::returning(Domain::CartManager, true),
            RouterConfig::default(),
        );
        let mut state = SessionDomains::new();

        let result = service
            .classify_intent(&mut state, "hello", "s1", None)
            .await;

        assert_eq!(result.domain, Domain::Cora);
        assert!(result.is_domain_change);
        assert!((result.confidence - 1.0).abs() < f32::EPSILON);
        assert_eq!(result.agent_id, "cora");
        assert_eq!(result.agent_name, "Cora Shopping Assistant");
        assert_eq!(service.classifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(state.get("s1"), Some(Domain::Cora));
    }

    #[tokio::test]
    async fn first_message_honours_configured_default() {
        let config = RouterConfig {
            default_domain: Domain::InventoryAgent,
            lazy_classification: true,
        };
        let service = HandoffService::new(Fixed::failing(), config);
        let mut state = SessionDomains::new();

        let result = service.classify_intent(&mut state, "hi", "s", None).await;
        assert_eq!(result.domain, Domain::InventoryAgent);
        assert_eq!(result.reasoning, "First message, routing to inventory_agent");
    }

    #[tokio::test]
    async fn domain_change_updates_session() {
        let service = HandoffService::new(
            Fixed::returning(Domain::CartManager, true),
            RouterConfig::default(),
        );
        let mut state = SessionDomains::new();
        state.assign("s1", Domain::Cora);

        let result = service
            .classify_intent(&mut state, "add it to my cart", "s1", None)
            .await;

        assert_eq!(result.domain, Domain::CartManager);
        assert!(result.is_domain_change);
        assert_eq!(result.agent_name, "Cart Manager Specialist");
        assert_eq!(state.get("s1"), Some(Domain::CartManager));
    }

    #[tokio::test]
    async fn no_change_leaves_session_untouched() {
        let service = HandoffService::new(
            Fixed::returning(Domain::InventoryAgent, false),
            RouterConfig::default(),
        );
        let mut state = SessionDomains::new();
        state.assign("s1", Domain::InteriorDesigner);

        let result = service
            .classify_intent(&mut state, "is it in stock?", "s1", None)
            .await;

        assert_eq!(result.domain, Domain::InventoryAgent);
        assert!(!result.is_domain_change);
        assert_eq!(state.get("s1"), Some(Domain::InteriorDesigner));
    }

    #[tokio::test]
    async fn classifier_failure_keeps_current_domain() {
        let service = HandoffService::new(Fixed::failing(), RouterConfig::default());
        let mut state = SessionDomains::new();
        state.assign("s1", Domain::CustomerLoyalty);

        let result = service
            .classify_intent(&mut state, "what now", "s1", None)
            .await;

        assert_eq!(result.domain, Domain::CustomerLoyalty);
        assert!(!result.is_domain_change);
        assert!((result.confidence - FALLBACK_CONFIDENCE).abs() < f32::EPSILON);
        assert_eq!(result.reasoning, "Classification error, using customer_loyalty");
        assert_eq!(service.classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn eager_first_message_is_classified() {
        let config = RouterConfig {
            lazy_classification: false,
            ..RouterConfig::default()
        };
        let service = HandoffService::new(Fixed::returning(Domain::InteriorDesigner, false), config);
        let mut state = SessionDomains::new();

        let result = service
            .classify_intent(&mut state, "paint ideas for my den", "s1", None)
            .await;

        assert_eq!(result.domain, Domain::InteriorDesigner);
        assert_eq!(state.get("s1"), Some(Domain::InteriorDesigner));
        assert_eq!(service.classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn eager_first_message_failure_uses_default() {
        let config = RouterConfig {
            lazy_classification: false,
            ..RouterConfig::default()
        };
        let service = HandoffService::new(Fixed::failing(), config);
        let mut state = SessionDomains::new();

        let result = service.classify_intent(&mut state, "hi", "s1", None).await;

        assert_eq!(result.domain, Domain::Cora);
        assert!((result.confidence - FALLBACK_CONFIDENCE).abs() < f32::EPSILON);
        assert_eq!(state.get("s1"), Some(Domain::Cora));
    }

    #[test]
    fn set_domain_corrects_unknown_names() {
        let service = HandoffService::new(Fixed::failing(), RouterConfig::default());
        let mut state = SessionDomains::new();

        assert_eq!(
            service.set_domain(&mut state, "s1", "customer_loyalty"),
            Domain::CustomerLoyalty
        );
        assert_eq!(service.set_domain(&mut state, "s1", "florist"), Domain::Cora);
        assert_eq!(service.get_current_domain(&state, "s1"), Some(Domain::Cora));
    }

    #[test]
    fn reset_session_removes_domain() {
        let service = HandoffService::new(Fixed::failing(), RouterConfig::default());
        let mut state = SessionDomains::new();
        state.assign("s1", Domain::CartManager);

        assert!(service.reset_session(&mut state, "s1"));
        assert!(!service.reset_session(&mut state, "s1"));
        assert_eq!(service.get_current_domain(&state, "s1"), None);
    }
}
