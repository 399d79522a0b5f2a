//! Configuration schema.
//!
//! Hierarchy: `Config` → `RelayConfig`, `ProvidersConfig`, `GatesConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ProviderId;

/// System prompt seeded into every new conversation.
///
/// Instant-messaging register: concise by default, thorough when that serves
/// the user better, and questions come after the help, not before.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful assistant in an instant-messaging chat, so keep your \
answers short and to the point. Give a detailed answer when that is the best \
way to help — a simple question deserves a short reply, but if the user wants \
a complicated email written, write it in full. Asking follow-up questions can \
help tailor your advice, but the user does not enjoy typing, so avoid \
unnecessary questions and prefer asking AFTER you have already helped, as an \
option to continue. Use the user's language unless the task requires \
otherwise.";

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.relaybot/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub relay: RelayConfig,
    pub providers: ProvidersConfig,
    pub gates: GatesConfig,
}

/// Fatal configuration problems, checked before serving any turns.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("default provider '{0}' has no API key configured")]
    MissingApiKey(ProviderId),
    #[error("default provider '{0}' has no model handle configured")]
    MissingModel(ProviderId),
}

impl Config {
    /// Validate startup requirements: the default provider must be usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let default = self.relay.default_provider;
        let provider = self.providers.get(default);
        if provider.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey(default));
        }
        if provider.model.is_empty() {
            return Err(ConfigError::MissingModel(default));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Relay
// ─────────────────────────────────────────────

/// Core relay settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelayConfig {
    /// Provider used until the user issues a switch directive.
    pub default_provider: ProviderId,
    /// History bound per user; truncation keeps the newest entries.
    pub max_history_messages: usize,
    /// Default answer budget passed to backends.
    pub max_answer_tokens: u32,
    /// System prompt seeded into new conversations.
    pub system_prompt: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_provider: ProviderId::OpenAi,
            max_history_messages: 100,
            max_answer_tokens: 500,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Configuration for a single backend (API key, base URL, model handle).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for authentication.
    #[serde(default)]
    pub api_key: String,
    /// Custom API base URL (overrides the backend default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Model handle (e.g. "gpt-5", an Azure deployment name, or a Claude
    /// model id).
    #[serde(default)]
    pub model: String,
}

impl ProviderConfig {
    /// Whether this backend can be constructed.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.model.is_empty()
    }
}

/// One `ProviderConfig` per supported backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    #[serde(default = "default_openai")]
    pub openai: ProviderConfig,
    #[serde(default = "default_anthropic")]
    pub anthropic: ProviderConfig,
}

fn default_openai() -> ProviderConfig {
    ProviderConfig {
        model: "gpt-5".to_string(),
        ..Default::default()
    }
}

fn default_anthropic() -> ProviderConfig {
    ProviderConfig {
        model: "claude-sonnet-4-20250514".to_string(),
        ..Default::default()
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: default_openai(),
            anthropic: default_anthropic(),
        }
    }
}

impl ProvidersConfig {
    /// Get the config for a provider id.
    pub fn get(&self, id: ProviderId) -> &ProviderConfig {
        match id {
            ProviderId::OpenAi => &self.openai,
            ProviderId::Anthropic => &self.anthropic,
        }
    }
}

// ─────────────────────────────────────────────
// Gates
// ─────────────────────────────────────────────

/// Per-gate enable flags, in the registry's declared order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatesConfig {
    pub summarize_youtube: bool,
    pub web_reader: bool,
    pub watch_video: bool,
    pub watch_picture: bool,
    pub listen_audio: bool,
    pub generate_picture: bool,
}

impl Default for GatesConfig {
    fn default() -> Self {
        Self {
            summarize_youtube: true,
            web_reader: true,
            watch_video: true,
            watch_picture: true,
            listen_audio: true,
            generate_picture: true,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.relay.default_provider, ProviderId::OpenAi);
        assert_eq!(config.relay.max_history_messages, 100);
        assert_eq!(config.relay.max_answer_tokens, 500);
        assert_eq!(config.providers.openai.model, "gpt-5");
        assert!(config.gates.summarize_youtube);
    }

    #[test]
    fn test_config_from_json_camel_case() {
        let json = serde_json::json!({
            "relay": {
                "defaultProvider": "anthropic",
                "maxHistoryMessages": 50,
                "maxAnswerTokens": 1000
            },
            "providers": {
                "anthropic": {
                    "apiKey": "sk-ant-123",
                    "model": "claude-opus-4-1"
                }
            }
        });

        let config: Config = serde_json::from_value(json).unwrap();
        assert_eq!(config.relay.default_provider, ProviderId::Anthropic);
        assert_eq!(config.relay.max_history_messages, 50);
        assert_eq!(config.relay.max_answer_tokens, 1000);
        assert_eq!(config.providers.anthropic.api_key, "sk-ant-123");
        assert_eq!(config.providers.anthropic.model, "claude-opus-4-1");
        // Defaults preserved for missing fields
        assert_eq!(config.providers.openai.model, "gpt-5");
        assert!(config.gates.web_reader);
    }

    #[test]
    fn test_config_json_uses_camel_case() {
        let config = Config::default();
        let json = serde_json::to_value(&config).unwrap();
        assert!(json["relay"].get("defaultProvider").is_some());
        assert!(json["relay"].get("maxHistoryMessages").is_some());
        assert!(json["relay"].get("max_history_messages").is_none());
        assert!(json["gates"].get("summarizeYoutube").is_some());
    }

    #[test]
    fn test_provider_is_configured() {
        let empty = ProviderConfig::default();
        assert!(!empty.is_configured());

        let no_model = ProviderConfig {
            api_key: "sk-123".into(),
            ..Default::default()
        };
        assert!(!no_model.is_configured());

        let full = ProviderConfig {
            api_key: "sk-123".into(),
            model: "gpt-5".into(),
            ..Default::default()
        };
        assert!(full.is_configured());
    }

    #[test]
    fn test_validate_missing_key_is_fatal() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey(ProviderId::OpenAi)));
    }

    #[test]
    fn test_validate_missing_model_is_fatal() {
        let mut config = Config::default();
        config.providers.openai.api_key = "sk-123".into();
        config.providers.openai.model = String::new();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingModel(ProviderId::OpenAi)));
    }

    #[test]
    fn test_validate_ok() {
        let mut config = Config::default();
        config.providers.openai.api_key = "sk-123".into();
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_checks_default_provider_only() {
        let mut config = Config::default();
        config.relay.default_provider = ProviderId::Anthropic;
        config.providers.anthropic.api_key = "sk-ant-123".into();
        // OpenAI unconfigured — still fine, it is not the default.
        config.validate().unwrap();
    }

    #[test]
    fn test_gates_partial_json() {
        let json = serde_json::json!({
            "gates": { "webReader": false }
        });
        let config: Config = serde_json::from_value(json).unwrap();
        assert!(!config.gates.web_reader);
        assert!(config.gates.summarize_youtube);
    }
}
