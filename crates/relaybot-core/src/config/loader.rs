//! Config loader — reads `~/.relaybot/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.relaybot/config.json`
//! 3. Environment variables `RELAYBOT_<SECTION>__<FIELD>` (override JSON)
//!
//! Plain `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` are accepted as key
//! fallbacks when no key is configured elsewhere.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::schema::{Config, ProviderConfig};
use crate::types::ProviderId;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be
/// parsed. Validation (fatal checks) is the caller's job, after loading.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let config: Config = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Env var format: `RELAYBOT_<SECTION>__<FIELD>` (double underscore as
/// delimiter).
///
/// Supported overrides:
/// - `RELAYBOT_RELAY__DEFAULT_PROVIDER` → `relay.default_provider`
/// - `RELAYBOT_RELAY__MAX_HISTORY_MESSAGES` → `relay.max_history_messages`
/// - `RELAYBOT_RELAY__MAX_ANSWER_TOKENS` → `relay.max_answer_tokens`
/// - `RELAYBOT_RELAY__SYSTEM_PROMPT` → `relay.system_prompt`
/// - `RELAYBOT_PROVIDERS__<NAME>__API_KEY` → `providers.<name>.api_key`
/// - `RELAYBOT_PROVIDERS__<NAME>__API_BASE` → `providers.<name>.api_base`
/// - `RELAYBOT_PROVIDERS__<NAME>__MODEL` → `providers.<name>.model`
/// - `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` → key fallback when still empty
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(val) = std::env::var("RELAYBOT_RELAY__DEFAULT_PROVIDER") {
        match ProviderId::parse(&val) {
            Some(id) => config.relay.default_provider = id,
            None => warn!("Unknown provider '{}' in RELAYBOT_RELAY__DEFAULT_PROVIDER", val),
        }
    }
    if let Ok(val) = std::env::var("RELAYBOT_RELAY__MAX_HISTORY_MESSAGES") {
        if let Ok(n) = val.parse::<usize>() {
            config.relay.max_history_messages = n;
        }
    }
    if let Ok(val) = std::env::var("RELAYBOT_RELAY__MAX_ANSWER_TOKENS") {
        if let Ok(n) = val.parse::<u32>() {
            config.relay.max_answer_tokens = n;
        }
    }
    if let Ok(val) = std::env::var("RELAYBOT_RELAY__SYSTEM_PROMPT") {
        config.relay.system_prompt = val;
    }

    apply_provider_env(&mut config.providers.openai, "OPENAI");
    apply_provider_env(&mut config.providers.anthropic, "ANTHROPIC");

    // Conventional key env vars as last-resort fallback.
    if config.providers.openai.api_key.is_empty() {
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            config.providers.openai.api_key = val;
        }
    }
    if config.providers.anthropic.api_key.is_empty() {
        if let Ok(val) = std::env::var("ANTHROPIC_API_KEY") {
            config.providers.anthropic.api_key = val;
        }
    }

    config
}

/// Apply env var overrides for a single provider.
fn apply_provider_env(provider: &mut ProviderConfig, name: &str) {
    if let Ok(val) = std::env::var(format!("RELAYBOT_PROVIDERS__{name}__API_KEY")) {
        provider.api_key = val;
    }
    if let Ok(val) = std::env::var(format!("RELAYBOT_PROVIDERS__{name}__API_BASE")) {
        provider.api_base = Some(val);
    }
    if let Ok(val) = std::env::var(format!("RELAYBOT_PROVIDERS__{name}__MODEL")) {
        provider.model = val;
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
