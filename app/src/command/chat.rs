//! Multi-turn shopping conversation routed between the specialist agents.

use tracing::info;
use uuid::Uuid;

use super::{build_conversation_manager, init_common_components};

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    /// Session to use (a new one is generated if not provided)
    pub session_id: Option<String>,
    /// Optional single message to send (non-interactive mode)
    pub message: Option<String>,
    /// Optional model override
    pub model: Option<String>,
    /// Start the session with this agent instead of the default
    pub domain: Option<String>,
}

/// Strategy for executing the Chat command.
///
/// In single-message mode the normalized reply is printed as JSON together
/// with the routing decision; otherwise an interactive loop runs on stdin.
#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let common = init_common_components()?;
        let mut manager = build_conversation_manager(&common, input.model);

        let session_id = input
            .session_id
            .unwrap_or_else(|| format!("cli:{}", Uuid::now_v7()));
        info!("Starting conversation session: {session_id}");

        if let Some(domain) = input.domain {
            manager.set_domain(&session_id, &domain);
        }

        if let Some(msg) = input.message {
            let result = manager.process_turn(&session_id, &msg).await?;
            let output = serde_json::json!({
                "session_id": session_id,
                "routing": result.classification,
                "source": format!("{:?}", result.source),
                "response": result.response,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            manager.run_interactive(&session_id).await?;
        }

        Ok(())
    }
}
