//! Anthropic backend — Messages API.
//!
//! The Messages API differs from the chat-completions family in three ways
//! this adapter absorbs: system turns are lifted into a top-level `system`
//! field (the `messages` array allows only user/assistant roles),
//! `max_tokens` is mandatory, and content is always a list of typed blocks.
//! Auth is `x-api-key` plus a pinned `anthropic-version` header.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use relaybot_core::config::ProviderConfig;
use relaybot_core::types::{ContentPart, Message, MessageContent, ProviderId};

use crate::traits::ChatBackend;

/// Default API base.
const DEFAULT_API_BASE: &str = "https://api.anthropic.com";

/// Pinned API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ─────────────────────────────────────────────
// AnthropicBackend
// ─────────────────────────────────────────────

/// Adapter for the Anthropic Messages API.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicBackend")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl AnthropicBackend {
    /// Create a backend from a provider config.
    pub fn new(config: &ProviderConfig) -> Self {
        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        AnthropicBackend {
            client,
            api_base,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.api_base.trim_end_matches('/'))
    }

    async fn ask_inner(&self, history: &[Message], max_tokens: u32) -> anyhow::Result<String> {
        let (system, messages) = to_messages_request(history);

        let body = MessagesRequest {
            model: &self.model,
            max_tokens,
            system,
            messages,
        };

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            anyhow::bail!("{} — {}", status, error_text);
        }

        let parsed: MessagesResponse = response.json().await?;
        Ok(extract_text(parsed))
    }
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    async fn ask(&self, history: &[Message], max_tokens: u32) -> String {
        debug!(model = %self.model, messages = history.len(), "calling Anthropic");

        match self.ask_inner(history, max_tokens).await {
            Ok(answer) => answer,
            Err(e) => {
                let msg = format!("Error calling Anthropic: {e}");
                error!(model = %self.model, "{msg}");
                msg
            }
        }
    }

    fn provider(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ─────────────────────────────────────────────
// Request shape
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize, PartialEq)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { source: ImageSource },
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type")]
enum ImageSource {
    #[serde(rename = "base64")]
    Base64 { media_type: String, data: String },
    #[serde(rename = "url")]
    Url { url: String },
}

/// Split the history into the top-level `system` field and the
/// user/assistant message list. Multiple system turns are joined.
fn to_messages_request(history: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
    let mut system_parts: Vec<&str> = Vec::new();
    let mut messages = Vec::new();

    for message in history {
        match message {
            Message::System { content } => system_parts.push(content),
            Message::Assistant { content } => messages.push(AnthropicMessage {
                role: "assistant",
                content: vec![AnthropicContentBlock::Text {
                    text: content.clone(),
                }],
            }),
            Message::User { content } => {
                let blocks = user_content_to_blocks(content);
                if blocks.is_empty() {
                    warn!("skipping user turn with no representable content");
                    continue;
                }
                messages.push(AnthropicMessage {
                    role: "user",
                    content: blocks,
                });
            }
        }
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    (system, messages)
}

fn user_content_to_blocks(content: &MessageContent) -> Vec<AnthropicContentBlock> {
    match content {
        MessageContent::Text(text) => vec![AnthropicContentBlock::Text { text: text.clone() }],
        MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => {
                    Some(AnthropicContentBlock::Text { text: text.clone() })
                }
                ContentPart::ImageUrl { image_url } => Some(AnthropicContentBlock::Image {
                    source: to_image_source(&image_url.url),
                }),
                ContentPart::Video { media } | ContentPart::Audio { media } => {
                    warn!(
                        handle = %media.handle,
                        mime = %media.mime_type,
                        "dropping media part the Messages API cannot carry"
                    );
                    None
                }
            })
            .collect(),
    }
}

/// Turn an image URL into a Messages API image source: `data:` URIs become
/// base64 sources, anything else is passed as a URL source.
fn to_image_source(url: &str) -> ImageSource {
    if let Some(rest) = url.strip_prefix("data:") {
        if let Some((media_type, data)) = rest.split_once(";base64,") {
            return ImageSource::Base64 {
                media_type: media_type.to_string(),
                data: data.to_string(),
            };
        }
    }
    ImageSource::Url {
        url: url.to_string(),
    }
}

// ─────────────────────────────────────────────
// Response shape
// ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Join the text blocks of the response. No text blocks is a success with
/// an empty answer.
fn extract_text(response: MessagesResponse) -> String {
    let collected: Vec<String> = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .filter(|text| !text.is_empty())
        .collect();

    collected.join("\n")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use relaybot_core::types::ImageUrl;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_config(api_base: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            api_key: "sk-ant-test".to_string(),
            api_base: api_base.map(String::from),
            model: "claude-sonnet-4-20250514".to_string(),
        }
    }

    // ── request translation ──

    #[test]
    fn test_system_lifted_out_of_messages() {
        let history = vec![
            Message::system("be brief"),
            Message::user("hello"),
            Message::assistant("hi"),
        ];
        let (system, messages) = to_messages_request(&history);

        assert_eq!(system.as_deref(), Some("be brief"));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
    }

    #[test]
    fn test_multiple_system_turns_joined() {
        let history = vec![
            Message::system("first"),
            Message::user("hello"),
            Message::system("second"),
        ];
        let (system, messages) = to_messages_request(&history);

        assert_eq!(system.as_deref(), Some("first\n\nsecond"));
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_no_system_turn() {
        let history = vec![Message::user("hello")];
        let (system, _) = to_messages_request(&history);
        assert!(system.is_none());
    }

    #[test]
    fn test_data_url_becomes_base64_source() {
        let source = to_image_source("data:image/jpeg;base64,abc123");
        assert_eq!(
            source,
            ImageSource::Base64 {
                media_type: "image/jpeg".into(),
                data: "abc123".into()
            }
        );
    }

    #[test]
    fn test_plain_url_becomes_url_source() {
        let source = to_image_source("https://example.com/cat.png");
        assert_eq!(
            source,
            ImageSource::Url {
                url: "https://example.com/cat.png".into()
            }
        );
    }

    #[test]
    fn test_media_parts_dropped() {
        use relaybot_core::types::MediaRef;

        let content = MessageContent::Parts(vec![
            ContentPart::Text { text: "see".into() },
            ContentPart::Video {
                media: MediaRef {
                    handle: "v1".into(),
                    mime_type: "video/mp4".into(),
                    size: None,
                    name: None,
                },
            },
        ]);
        let blocks = user_content_to_blocks(&content);
        assert_eq!(blocks.len(), 1);
    }

    // ── response extraction ──

    #[test]
    fn test_extract_joins_text_blocks() {
        let resp: MessagesResponse = serde_json::from_value(serde_json::json!({
            "content": [
                {"type": "text", "text": "part one"},
                {"type": "tool_use", "id": "x", "name": "t", "input": {}},
                {"type": "text", "text": "part two"}
            ]
        }))
        .unwrap();
        assert_eq!(extract_text(resp), "part one\npart two");
    }

    #[test]
    fn test_extract_empty_content() {
        let resp: MessagesResponse =
            serde_json::from_value(serde_json::json!({ "content": [] })).unwrap();
        assert_eq!(extract_text(resp), "");
    }

    // ── wiremock integration ──

    #[tokio::test]
    async fn test_ask_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(serde_json::json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 500,
                "system": "S"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "Hi there"}]
            })))
            .mount(&mock_server)
            .await;

        let backend = AnthropicBackend::new(&make_config(Some(&mock_server.uri())));
        let history = vec![Message::system("S"), Message::user("Hello")];

        let answer = backend.ask(&history, 500).await;
        assert_eq!(answer, "Hi there");
    }

    #[tokio::test]
    async fn test_ask_api_error_becomes_text() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_json(serde_json::json!({
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .mount(&mock_server)
            .await;

        let backend = AnthropicBackend::new(&make_config(Some(&mock_server.uri())));
        let answer = backend.ask(&[Message::user("Hello")], 500).await;

        assert!(answer.starts_with("Error calling Anthropic:"));
        assert!(answer.contains("Overloaded"));
    }

    #[tokio::test]
    async fn test_ask_network_error_becomes_text() {
        let backend = AnthropicBackend::new(&make_config(Some("http://127.0.0.1:1")));
        let answer = backend.ask(&[Message::user("Hello")], 500).await;

        assert!(answer.starts_with("Error calling Anthropic:"));
    }
}
