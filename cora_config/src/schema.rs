use cora_core::{Domain, SamplingParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub agents: AgentsConfig,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub history: HistoryLimits,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentsConfig {
    pub defaults: AgentDefaults,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentDefaults {
    pub model: String,
    #[serde(default = "AgentDefaults::default_temperature")]
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
}

impl AgentDefaults {
    const fn default_temperature() -> f32 {
        0.7
    }

    /// Sampling parameters for specialist agent replies.
    #[must_use]
    pub const fn sampling(&self) -> SamplingParams {
        SamplingParams {
            temperature: Some(self.temperature),
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
            max_tokens: self.max_tokens,
            json_mode: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub openai: ProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    #[serde(default = "ProviderConfig::default_base_url")]
    pub base_url: String,
    /// Set for Azure deployments; selects the deployment URL style.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Waits between attempts of the primary agent call.
    #[serde(default)]
    pub retry_delays_secs: Vec<u64>,
}

impl ProviderConfig {
    fn default_base_url() -> String {
        "https://api.openai.com/v1".to_string()
    }

    #[must_use]
    pub fn retry_delays(&self) -> Vec<Duration> {
        self.retry_delays_secs
            .iter()
            .copied()
            .map(Duration::from_secs)
            .collect()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RoutingConfig {
    #[serde(default)]
    pub default_domain: Domain,
    #[serde(default = "RoutingConfig::default_lazy")]
    pub lazy_classification: bool,
    /// Model for intent classification; the agent model when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier_model: Option<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_domain: Domain::default(),
            lazy_classification: Self::default_lazy(),
            classifier_model: None,
        }
    }
}

impl RoutingConfig {
    const fn default_lazy() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FallbackConfig {
    #[serde(default = "FallbackConfig::default_model")]
    pub model: String,
    #[serde(default = "FallbackConfig::default_cora_model")]
    pub cora_model: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            cora_model: Self::default_cora_model(),
        }
    }
}

impl FallbackConfig {
    fn default_model() -> String {
        "gpt-5-mini".to_string()
    }

    fn default_cora_model() -> String {
        "Phi-4".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryLimits {
    /// Entries stored per session; `null` keeps everything.
    #[serde(default = "HistoryLimits::default_capacity")]
    pub capacity: Option<usize>,
    #[serde(default = "HistoryLimits::default_max_messages")]
    pub max_messages: usize,
    #[serde(default = "HistoryLimits::default_max_chars")]
    pub max_chars: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            capacity: Self::default_capacity(),
            max_messages: Self::default_max_messages(),
            max_chars: Self::default_max_chars(),
        }
    }
}

impl HistoryLimits {
    #[allow(clippy::unnecessary_wraps)]
    const fn default_capacity() -> Option<usize> {
        Some(20)
    }

    const fn default_max_messages() -> usize {
        20
    }

    const fn default_max_chars() -> usize {
        8000
    }
}

const CONFIG_TEMPLATE: &str = r#"{
  "agents": {
    "defaults": {
      "model": "gpt-4o-mini",
      "temperature": 0.7,
      "max_tokens": 2048
    }
  },
  "providers": {
    "openai": {
      "api_key": "your-api-key-here",
      "base_url": "https://api.openai.com/v1",
      "retry_delays_secs": [1, 2, 4]
    }
  },
  "routing": {
    "default_domain": "cora",
    "lazy_classification": true
  },
  "fallback": {
    "model": "gpt-5-mini",
    "cora_model": "Phi-4"
  },
  "history": {
    "capacity": 20,
    "max_messages": 20,
    "max_chars": 8000
  }
}"#;

impl Config {
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("cora"))
    }

    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_dir()?.join("config.json");

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'cora init' to create config.",
                config_path.display()
            );
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config at {}: {e}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Model used by the intent classifier.
    #[must_use]
    pub fn classifier_model(&self) -> &str {
        self.routing
            .classifier_model
            .as_deref()
            .unwrap_or(&self.agents.defaults.model)
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<PathBuf> {
        let config_path = Self::ensure_config_dir()?.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, CONFIG_TEMPLATE)?;
        Ok(config_path)
    }
}
