//! Conversation store — per-user bounded message histories.
//!
//! Process-lifetime, in-memory only: histories are created lazily on a user's
//! first turn and rebuilt empty on restart. The store owns the two invariants
//! the rest of the system relies on:
//!
//! - entry 0 of a non-empty history is always the system message;
//! - after any mutation the length is at most `max_messages + 1` (truncation
//!   keeps the newest `max_messages` entries and prepends a fresh system
//!   message, which is accepted rather than rebalanced further).

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{Message, MessageContent};

/// One user's conversation.
#[derive(Clone, Debug)]
pub struct Conversation {
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    fn new() -> Self {
        let now = Utc::now();
        Conversation {
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Thread-safe map from user identity to bounded history.
///
/// `append_user_turn` and `append_assistant_turn` are the only mutation
/// points; no component mutates history length any other way. The store does
/// not serialize turns per user — concurrent turns for the same user are
/// last-writer-wins, which the transport is expected to avoid or accept.
pub struct ConversationStore {
    system_prompt: String,
    max_messages: usize,
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl ConversationStore {
    /// Create a store with the system prompt seeded into new conversations
    /// and re-inserted on truncation.
    pub fn new(system_prompt: impl Into<String>, max_messages: usize) -> Self {
        ConversationStore {
            system_prompt: system_prompt.into(),
            max_messages,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// Append a user turn. A user's first turn seeds the history with
    /// `[system, user]`.
    pub fn append_user_turn(&self, user_id: &str, content: MessageContent) {
        let mut conversations = self.conversations.write().unwrap();
        let conversation = conversations
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!(user = user_id, "seeding new conversation");
                let mut c = Conversation::new();
                c.messages.push(Message::system(self.system_prompt.clone()));
                c
            });
        conversation.messages.push(Message::User { content });
        conversation.updated_at = Utc::now();
    }

    /// Append an assistant turn and enforce the history bound.
    ///
    /// When the bound is exceeded, only the newest `max_messages` entries are
    /// kept and a fresh system message is prepended (length becomes
    /// `max_messages + 1`).
    pub fn append_assistant_turn(&self, user_id: &str, content: impl Into<String>) {
        let mut conversations = self.conversations.write().unwrap();
        let conversation = conversations
            .entry(user_id.to_string())
            .or_insert_with(Conversation::new);
        conversation.messages.push(Message::assistant(content));
        conversation.updated_at = Utc::now();

        if conversation.messages.len() > self.max_messages {
            let drop = conversation.messages.len() - self.max_messages;
            conversation.messages.drain(..drop);
            conversation
                .messages
                .insert(0, Message::system(self.system_prompt.clone()));
            debug!(
                user = user_id,
                len = conversation.messages.len(),
                "truncated history, re-inserted system message"
            );
        }
    }

    /// Snapshot of a user's history (empty for unknown users).
    pub fn history(&self, user_id: &str) -> Vec<Message> {
        let conversations = self.conversations.read().unwrap();
        conversations
            .get(user_id)
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    /// Current history length for a user.
    pub fn len(&self, user_id: &str) -> usize {
        let conversations = self.conversations.read().unwrap();
        conversations.get(user_id).map_or(0, |c| c.messages.len())
    }

    /// Whether a user has no history yet.
    pub fn is_empty(&self, user_id: &str) -> bool {
        self.len(user_id) == 0
    }

    /// The configured system prompt.
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
