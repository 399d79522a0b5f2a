//! Backend adapter layer for Relaybot.
//!
//! # Architecture
//!
//! - [`traits::ChatBackend`] — trait every backend implements; `ask` never
//!   fails past its boundary (errors become the answer text)
//! - [`model_rules`] — class identification and per-class request quirks for
//!   OpenAI model handles
//! - [`openai::OpenAiBackend`] — dual-mode adapter (legacy chat-completions
//!   vs. structured responses)
//! - [`anthropic::AnthropicBackend`] — Messages API adapter

pub mod anthropic;
pub mod model_rules;
pub mod openai;
pub mod traits;

use relaybot_core::config::ProviderConfig;
use relaybot_core::types::ProviderId;

pub use anthropic::AnthropicBackend;
pub use model_rules::{identify_model_class, ModelClass, ModelDescriptor};
pub use openai::OpenAiBackend;
pub use traits::ChatBackend;

/// Construct the backend for a provider id from its config.
pub fn build_backend(id: ProviderId, config: &ProviderConfig) -> Box<dyn ChatBackend> {
    match id {
        ProviderId::OpenAi => Box::new(OpenAiBackend::new(config)),
        ProviderId::Anthropic => Box::new(AnthropicBackend::new(config)),
    }
}
