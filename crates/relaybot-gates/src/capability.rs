//! Capability gates — block content the active provider cannot handle.
//!
//! These gates never fetch anything. They look at the pending turn, consult
//! the provider capability table, and either pass the turn through unchanged
//! or replace it with an explanatory text so the model (and the user) get a
//! sensible reply instead of an API error.

use async_trait::async_trait;
use relaybot_core::types::{Capability, Message, MessageContent, ProviderId};
use tracing::debug;

use crate::traits::{replace_last_content, Gate};

// ─────────────────────────────────────────────
// Media capability gate (video / image / audio)
// ─────────────────────────────────────────────

/// Checks that an uploaded media part is supported by the active provider.
pub struct MediaCapabilityGate {
    name: &'static str,
    capability: Capability,
    /// Extra guidance appended to the refusal text, when switching providers
    /// would help.
    switch_hint: Option<&'static str>,
}

impl MediaCapabilityGate {
    /// Video uploads — only providers with native video understanding.
    pub fn watch_video() -> Self {
        MediaCapabilityGate {
            name: "watch_video",
            capability: Capability::Video,
            switch_hint: Some("Please switch to OpenAI."),
        }
    }

    /// Image uploads — vision-capable providers.
    pub fn watch_picture() -> Self {
        MediaCapabilityGate {
            name: "watch_picture",
            capability: Capability::Vision,
            switch_hint: None,
        }
    }

    /// Audio/voice uploads — providers with native audio understanding.
    pub fn listen_audio() -> Self {
        MediaCapabilityGate {
            name: "listen_audio",
            capability: Capability::Audio,
            switch_hint: None,
        }
    }

    fn content_matches(&self, content: &MessageContent) -> bool {
        match self.capability {
            Capability::Video => content.has_video(),
            Capability::Vision => content.has_image(),
            Capability::Audio => content.has_audio(),
            Capability::ImageGeneration => false,
        }
    }
}

#[async_trait]
impl Gate for MediaCapabilityGate {
    fn name(&self) -> &'static str {
        self.name
    }

    fn applicable(&self, pending: &[Message], _provider: ProviderId) -> bool {
        match pending.last() {
            Some(Message::User { content }) => self.content_matches(content),
            _ => false,
        }
    }

    async fn transform(
        &self,
        mut pending: Vec<Message>,
        provider: ProviderId,
    ) -> anyhow::Result<Vec<Message>> {
        if provider.supports(self.capability) {
            debug!(gate = self.name, provider = %provider, "capability present, passing through");
            return Ok(pending);
        }

        debug!(gate = self.name, provider = %provider, "capability missing, blocking");
        let mut text = format!(
            "Sorry, the current AI provider ({provider}) does not support {}.",
            self.capability.describe()
        );
        if let Some(hint) = self.switch_hint {
            text.push(' ');
            text.push_str(hint);
        }
        replace_last_content(&mut pending, text);
        Ok(pending)
    }
}

// ─────────────────────────────────────────────
// Image generation intent gate
// ─────────────────────────────────────────────

/// Keywords (English and Spanish) signalling image-generation intent.
const GENERATION_KEYWORDS: &[&str] = &[
    "generate image",
    "create image",
    "draw",
    "paint",
    "picture of",
    "generar imagen",
    "crear imagen",
    "dibuja",
    "pinta",
    "foto de",
    "generate a picture",
    "create a picture",
    "haz un dibujo",
    "haz una imagen",
];

/// Detects image-generation requests and blocks them on providers without
/// generation support.
pub struct ImageGenerationGate;

impl ImageGenerationGate {
    pub fn new() -> Self {
        ImageGenerationGate
    }
}

impl Default for ImageGenerationGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gate for ImageGenerationGate {
    fn name(&self) -> &'static str {
        "generate_picture"
    }

    fn applicable(&self, pending: &[Message], _provider: ProviderId) -> bool {
        let content = match pending.last() {
            Some(Message::User { content }) => content,
            _ => return false,
        };
        let text = content.text().to_lowercase();
        GENERATION_KEYWORDS.iter().any(|kw| text.contains(kw))
    }

    async fn transform(
        &self,
        mut pending: Vec<Message>,
        provider: ProviderId,
    ) -> anyhow::Result<Vec<Message>> {
        if provider.supports(Capability::ImageGeneration) {
            debug!(provider = %provider, "image generation supported, passing through");
            return Ok(pending);
        }

        debug!(provider = %provider, "image generation unsupported, blocking");
        replace_last_content(
            &mut pending,
            format!(
                "Sorry, the current AI provider ({provider}) does not support image \
                 generation. Please switch to OpenAI."
            ),
        );
        Ok(pending)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
