//! Backend trait — one implementation per LLM service.

use async_trait::async_trait;
use relaybot_core::types::{Message, ProviderId};

/// A chat backend that turns a conversation history into an answer.
///
/// `ask` never fails past this boundary: any error during request
/// construction, the HTTP call, or response extraction becomes the returned
/// text, prefixed so the caller (and the user) can tell it apart from a
/// model answer. The same text is logged for the operator. No retries.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Ask the backend for the assistant's next turn.
    ///
    /// `max_tokens` is an answer budget; backends may override it with a
    /// model-specific reserved budget (reasoning headroom) or ignore it in
    /// request modes that carry no explicit cap.
    async fn ask(&self, history: &[Message], max_tokens: u32) -> String;

    /// Which provider this backend belongs to.
    fn provider(&self) -> ProviderId;

    /// The concrete model handle in use.
    fn model(&self) -> &str;
}
