//! Turn pipeline — glues the router, gates, store, and backends together.
//!
//! One inbound turn flows: directive routing → gate pass → commit user turn
//! → backend dispatch → commit assistant turn. Every step degrades to
//! displayable text; the user always gets a reply and the turn is always
//! committed, so a retry works against updated context.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use relaybot_core::config::{Config, ConfigError};
use relaybot_core::history::ConversationStore;
use relaybot_core::types::{ContentPart, Message, MessageContent, ProviderId};
use relaybot_core::utils::truncate_string;
use relaybot_gates::GateRegistry;
use relaybot_providers::{build_backend, ChatBackend};

use crate::router::DirectiveRouter;

/// Everything the transport needs to render one processed turn.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Provider that served the turn.
    pub provider: ProviderId,
    /// "old -> new" line when the turn carried a switch directive that
    /// changed the selection.
    pub switch_report: Option<String>,
    /// Name of the gate that processed the turn, if any.
    pub gate_applied: Option<String>,
    /// The assistant's reply (or an error description standing in for it).
    pub answer: String,
}

/// The conversational relay.
pub struct Relay {
    store: ConversationStore,
    router: DirectiveRouter,
    gates: RwLock<GateRegistry>,
    backends: HashMap<ProviderId, Box<dyn ChatBackend>>,
    max_answer_tokens: u32,
}

impl Relay {
    /// Build the relay from config: validates startup requirements and
    /// constructs a backend for every configured provider.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut backends: HashMap<ProviderId, Box<dyn ChatBackend>> = HashMap::new();
        for id in [ProviderId::OpenAi, ProviderId::Anthropic] {
            let provider_config = config.providers.get(id);
            if provider_config.is_configured() {
                info!(provider = %id, model = %provider_config.model, "backend configured");
                backends.insert(id, build_backend(id, provider_config));
            }
        }

        Ok(Self::with_backends(config, backends))
    }

    /// Build the relay with explicit backends (tests inject mocks here).
    /// Skips config validation.
    pub fn with_backends(
        config: &Config,
        backends: HashMap<ProviderId, Box<dyn ChatBackend>>,
    ) -> Self {
        Relay {
            store: ConversationStore::new(
                config.relay.system_prompt.clone(),
                config.relay.max_history_messages,
            ),
            router: DirectiveRouter::new(config.relay.default_provider),
            gates: RwLock::new(GateRegistry::with_defaults(&config.gates)),
            backends,
            max_answer_tokens: config.relay.max_answer_tokens,
        }
    }

    /// Process one inbound turn and produce the reply.
    pub async fn handle_turn(&self, user_id: &str, content: MessageContent) -> TurnOutcome {
        // 1. Directive routing on the leading text.
        let route = self.router.route(&leading_text(&content));
        let content = apply_stripped_text(content, route.text);

        // 2. Gate pass over the pending view (stored history + new turn,
        //    not yet committed).
        let mut pending = self.store.history(user_id);
        pending.push(Message::User { content });
        let gate_outcome = self
            .gates
            .read()
            .await
            .apply(pending, route.provider)
            .await;

        let committed = match gate_outcome.message {
            Message::User { content } => content,
            // Gates contract on the last message staying the user turn;
            // salvage the text if one misbehaves.
            Message::System { content } | Message::Assistant { content } => {
                warn!("gate returned a non-user last message, committing its text");
                MessageContent::Text(content)
            }
        };

        // 3. Commit the user turn (seeds [system, user] on first contact).
        self.store.append_user_turn(user_id, committed);

        // 4. Dispatch.
        let answer = match self.backends.get(&route.provider) {
            Some(backend) => {
                let history = self.store.history(user_id);
                backend.ask(&history, self.max_answer_tokens).await
            }
            None => {
                let msg = format!(
                    "Error calling {}: provider is not configured",
                    route.provider
                );
                error!(provider = %route.provider, "{msg}");
                msg
            }
        };

        // 5. Commit the assistant turn — error text included, so a retry
        //    runs against updated context.
        self.store.append_assistant_turn(user_id, &answer);

        debug!(
            user = user_id,
            provider = %route.provider,
            gate = gate_outcome.applied.unwrap_or("-"),
            history = self.store.len(user_id),
            answer = %truncate_string(&answer, 80),
            "turn processed"
        );

        TurnOutcome {
            provider: route.provider,
            switch_report: route.report,
            gate_applied: gate_outcome.applied.map(String::from),
            answer,
        }
    }

    /// Convenience wrapper for plain-text turns.
    pub async fn handle_text_turn(&self, user_id: &str, text: &str) -> TurnOutcome {
        self.handle_turn(user_id, MessageContent::Text(text.to_string()))
            .await
    }

    /// The provider currently serving turns.
    pub fn current_provider(&self) -> ProviderId {
        self.router.current()
    }

    /// The conversation store (read access for transports and tests).
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    // ────────────── Gate administration ──────────────

    /// `(name, enabled)` for every gate, in declared order.
    pub async fn gate_status(&self) -> Vec<(&'static str, bool)> {
        self.gates.read().await.status()
    }

    /// Toggle one gate. Returns false for unknown names.
    pub async fn set_gate_enabled(&self, name: &str, enabled: bool) -> bool {
        self.gates.write().await.set_enabled(name, enabled)
    }

    /// Enable every gate.
    pub async fn enable_all_gates(&self) {
        self.gates.write().await.enable_all();
    }

    /// Disable every gate.
    pub async fn disable_all_gates(&self) {
        self.gates.write().await.disable_all();
    }
}

// ─────────────────────────────────────────────
// Content helpers
// ─────────────────────────────────────────────

/// The text the router sees: the whole text, or the first text part of
/// multipart content (the caption comes first by construction).
fn leading_text(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Parts(parts) => parts
            .iter()
            .find_map(|part| match part {
                ContentPart::Text { text } => Some(text.clone()),
                _ => None,
            })
            .unwrap_or_default(),
    }
}

/// Put the directive-stripped text back into the content. For multipart
/// content the first text part is replaced (or dropped when stripping left
/// it empty); other parts pass through untouched.
fn apply_stripped_text(content: MessageContent, stripped: String) -> MessageContent {
    match content {
        MessageContent::Text(_) => MessageContent::Text(stripped),
        MessageContent::Parts(parts) => {
            let mut replaced = false;
            let new_parts: Vec<ContentPart> = parts
                .into_iter()
                .filter_map(|part| match part {
                    ContentPart::Text { .. } if !replaced => {
                        replaced = true;
                        if stripped.is_empty() {
                            None
                        } else {
                            Some(ContentPart::Text {
                                text: stripped.clone(),
                            })
                        }
                    }
                    other => Some(other),
                })
                .collect();
            MessageContent::Parts(new_parts)
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
