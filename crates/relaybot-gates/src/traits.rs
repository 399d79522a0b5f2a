//! Gate trait — the predicate+transform contract every gate implements.

use async_trait::async_trait;
use relaybot_core::types::{Message, ProviderId};

/// A pluggable content gate.
///
/// Gates see the pending history (stored history plus the not-yet-committed
/// new turn) and may rewrite the last message: replace multimedia with
/// explanatory text when the active provider lacks a capability, or replace
/// a URL with fetched content. The relay offers the pending view to gates in
/// declared order and commits only the transformed last message of the first
/// gate that applies.
#[async_trait]
pub trait Gate: Send + Sync {
    /// Stable gate name, matching config keys.
    fn name(&self) -> &'static str;

    /// Whether this gate wants to process the pending turn.
    fn applicable(&self, pending: &[Message], provider: ProviderId) -> bool;

    /// Rewrite the pending history. An `Err` means the gate failed (e.g. a
    /// fetch error); the caller logs it and moves on as if the gate had not
    /// applied.
    async fn transform(
        &self,
        pending: Vec<Message>,
        provider: ProviderId,
    ) -> anyhow::Result<Vec<Message>>;
}

/// Replace the content of the last message with plain text, in place.
/// The helper every rewriting gate uses.
pub(crate) fn replace_last_content(pending: &mut [Message], text: String) {
    if let Some(Message::User { content }) = pending.last_mut() {
        *content = relaybot_core::types::MessageContent::Text(text);
    }
}
