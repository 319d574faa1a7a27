use cora_config::Config;
use cora_core::Domain;

/// Strategy for displaying configuration information.
///
/// Prints the endpoint (API key masked), agent defaults, routing, fallback
/// models, history limits and the agent catalogue.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let openai = &config.providers.openai;

        println!("=== cora Configuration ===\n");

        println!("Endpoint:");
        println!("  Base URL: {}", openai.base_url);
        println!("  API Key: {}", mask_api_key(&openai.api_key));
        match &openai.api_version {
            Some(version) => println!("  Style: Azure deployment (api-version {version})"),
            None => println!("  Style: OpenAI"),
        }
        println!("  Retry Delays (s): {:?}", openai.retry_delays_secs);
        println!();

        let defaults = &config.agents.defaults;
        println!("Agent Defaults:");
        println!("  Model: {}", defaults.model);
        println!("  Temperature: {}", defaults.temperature);
        if let Some(max_tokens) = defaults.max_tokens {
            println!("  Max Tokens: {max_tokens}");
        }
        if let Some(top_p) = defaults.top_p {
            println!("  Top P: {top_p}");
        }
        println!();

        println!("Routing:");
        println!("  Default Domain: {}", config.routing.default_domain);
        println!("  Lazy Classification: {}", config.routing.lazy_classification);
        println!("  Classifier Model: {}", config.classifier_model());
        println!();

        println!("Fallback:");
        println!("  General Model: {}", config.fallback.model);
        println!("  Cora Model: {}", config.fallback.cora_model);
        println!();

        println!("History:");
        match config.history.capacity {
            Some(capacity) => println!("  Capacity: {capacity}"),
            None => println!("  Capacity: unbounded"),
        }
        println!("  Max Messages: {}", config.history.max_messages);
        println!("  Max Chars: {}", config.history.max_chars);
        println!();

        println!("Agents:");
        for domain in Domain::ALL {
            println!("  {:<18} {}", domain.as_str(), domain.agent_name());
        }

        Ok(())
    }
}

fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}
