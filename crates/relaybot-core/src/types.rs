//! Core types for Relaybot — the provider-agnostic conversation model.
//!
//! A conversation is a list of [`Message`]s; message content is either plain
//! text or an ordered list of typed [`ContentPart`]s. Content parts are a
//! closed enum so every adapter boundary handles them exhaustively instead of
//! stringifying unknown shapes at runtime.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Providers and capabilities
// ─────────────────────────────────────────────

/// Identifier of a backend provider.
///
/// Exact enumerated keys — never matched by substring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Anthropic,
}

/// A content capability a provider may or may not have.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Vision,
    Audio,
    Video,
    ImageGeneration,
}

impl ProviderId {
    /// Stable lowercase name, matching config keys and switch reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Anthropic => "anthropic",
        }
    }

    /// Parse an exact (case-insensitive) provider name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "openai" => Some(ProviderId::OpenAi),
            "anthropic" => Some(ProviderId::Anthropic),
            _ => None,
        }
    }

    /// Capability lookup table.
    pub fn supports(&self, capability: Capability) -> bool {
        match self {
            ProviderId::OpenAi => matches!(
                capability,
                Capability::Vision
                    | Capability::Audio
                    | Capability::Video
                    | Capability::ImageGeneration
            ),
            ProviderId::Anthropic => matches!(capability, Capability::Vision),
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Capability {
    /// Human-readable capability name for user-facing messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Capability::Vision => "image analysis",
            Capability::Audio => "audio analysis",
            Capability::Video => "video analysis",
            Capability::ImageGeneration => "image generation",
        }
    }
}

// ─────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────

/// A conversation turn.
///
/// Serializes in the familiar chat-completions layout (`role` tag + content),
/// which the legacy OpenAI request mode uses verbatim.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role")]
pub enum Message {
    #[serde(rename = "system")]
    System { content: String },

    #[serde(rename = "user")]
    User { content: MessageContent },

    #[serde(rename = "assistant")]
    Assistant { content: String },
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a user message with text content.
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a user message with multipart content.
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Message::User {
            content: MessageContent::Parts(parts),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: content.into(),
        }
    }

    /// Whether this is a user turn.
    pub fn is_user(&self) -> bool {
        matches!(self, Message::User { .. })
    }

    /// The user content, if this is a user turn.
    pub fn user_content(&self) -> Option<&MessageContent> {
        match self {
            Message::User { content } => Some(content),
            _ => None,
        }
    }
}

/// Message content — plain text or an ordered list of typed parts.
///
/// Serialized form: text becomes a string, parts become an array of objects.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// All text carried by this content, parts joined with a space.
    ///
    /// Used by the router and gates to scan for directives, URLs, and
    /// keywords regardless of the content shape.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => {
                let texts: Vec<&str> = parts
                    .iter()
                    .filter_map(|p| match p {
                        ContentPart::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect();
                texts.join(" ")
            }
        }
    }

    /// Whether any part carries an image reference.
    pub fn has_image(&self) -> bool {
        matches!(self, MessageContent::Parts(parts)
            if parts.iter().any(|p| matches!(p, ContentPart::ImageUrl { .. })))
    }

    /// Whether any part carries a video reference.
    pub fn has_video(&self) -> bool {
        matches!(self, MessageContent::Parts(parts)
            if parts.iter().any(|p| matches!(p, ContentPart::Video { .. })))
    }

    /// Whether any part carries an audio reference.
    pub fn has_audio(&self) -> bool {
        matches!(self, MessageContent::Parts(parts)
            if parts.iter().any(|p| matches!(p, ContentPart::Audio { .. })))
    }
}

/// A single part of multipart content. Closed set — adapters match
/// exhaustively and log what they cannot represent.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },

    /// Image by URL or `data:` URI.
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },

    /// Video reference (transport file handle, not bytes).
    #[serde(rename = "video")]
    Video { media: MediaRef },

    /// Audio/voice reference (transport file handle, not bytes).
    #[serde(rename = "audio")]
    Audio { media: MediaRef },
}

/// Image URL payload.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A media reference delivered by the transport (video, audio, voice).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MediaRef {
    /// Transport-side file handle for later retrieval.
    pub handle: String,
    /// MIME type (e.g. "video/mp4", "audio/ogg").
    pub mime_type: String,
    /// File size in bytes, when the transport reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Original filename, when the transport reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
