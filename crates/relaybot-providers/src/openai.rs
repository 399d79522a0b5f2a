//! OpenAI backend — dual request mode.
//!
//! Older model classes (`gpt-4.1`, `gpt-5-chat`) use the flat
//! `/chat/completions` shape; everything else goes through the structured
//! `/responses` shape with typed input blocks. The model-rule tables in
//! [`crate::model_rules`] decide the mode plus per-class quirks: system-role
//! support, verbosity hint, and output-budget field naming.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use relaybot_core::config::ProviderConfig;
use relaybot_core::types::{ContentPart, Message, MessageContent, ProviderId};

use crate::model_rules::{max_tokens_field, ModelDescriptor};
use crate::traits::ChatBackend;

/// Default API base.
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Verbosity hint value sent to qualifying models.
const VERBOSITY_HINT: &str = "low";

// ─────────────────────────────────────────────
// OpenAiBackend
// ─────────────────────────────────────────────

/// Adapter for the OpenAI API (or an OpenAI-compatible deployment).
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    descriptor: ModelDescriptor,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("api_base", &self.api_base)
            .field("model", &self.descriptor.handle)
            .field("legacy", &self.descriptor.legacy_request)
            .finish()
    }
}

impl OpenAiBackend {
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

        let descriptor = ModelDescriptor::for_handle(config.model.clone());
        debug!(
            model = %descriptor.handle,
            legacy = descriptor.legacy_request,
            system_role = descriptor.system_role,
            verbosity = descriptor.verbosity,
            "OpenAI backend ready"
        );

        OpenAiBackend {
            client,
            api_base,
            api_key: config.api_key.clone(),
            descriptor,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), endpoint)
    }

    async fn ask_inner(&self, history: &[Message], max_tokens: u32) -> anyhow::Result<String> {
        let messages = apply_system_role_policy(&self.descriptor, history);

        if self.descriptor.legacy_request {
            self.ask_legacy(&messages, max_tokens).await
        } else {
            self.ask_responses(&messages).await
        }
    }

    /// Legacy `/chat/completions` call.
    async fn ask_legacy(&self, messages: &[Message], max_tokens: u32) -> anyhow::Result<String> {
        let body = build_legacy_request(&self.descriptor, messages, max_tokens);

        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.api_key)
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

        let parsed: LegacyChatResponse = response.json().await?;
        let answer = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        Ok(answer)
    }

    /// Structured `/responses` call. Carries no explicit output cap — the
    /// answer budget applies in legacy mode only.
    async fn ask_responses(&self, messages: &[Message]) -> anyhow::Result<String> {
        let body = ResponsesRequest {
            model: &self.descriptor.handle,
            input: to_responses_input(messages),
            text: self
                .descriptor
                .verbosity
                .then_some(TextOptions {
                    verbosity: VERBOSITY_HINT,
                }),
        };

        let response = self
            .client
            .post(self.url("responses"))
            .bearer_auth(&self.api_key)
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

        let parsed: ResponsesResponse = response.json().await?;
        Ok(extract_responses_text(parsed))
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn ask(&self, history: &[Message], max_tokens: u32) -> String {
        debug!(
            model = %self.descriptor.handle,
            messages = history.len(),
            "calling OpenAI"
        );

        match self.ask_inner(history, max_tokens).await {
            Ok(answer) => answer,
            Err(e) => {
                let msg = format!("Error calling OpenAI: {e}");
                error!(model = %self.descriptor.handle, "{msg}");
                msg
            }
        }
    }

    fn provider(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn model(&self) -> &str {
        &self.descriptor.handle
    }
}

// ─────────────────────────────────────────────
// History preparation
// ─────────────────────────────────────────────

/// Resend system turns as assistant turns when the model rejects the system
/// role. Content is preserved — never dropped.
fn apply_system_role_policy(descriptor: &ModelDescriptor, history: &[Message]) -> Vec<Message> {
    if descriptor.system_role {
        return history.to_vec();
    }
    history
        .iter()
        .map(|message| match message {
            Message::System { content } => Message::assistant(content.clone()),
            other => other.clone(),
        })
        .collect()
}

// ─────────────────────────────────────────────
// Legacy request shape
// ─────────────────────────────────────────────

/// Request body for the legacy `/chat/completions` endpoint. The output
/// budget travels under a class-dependent field name, so both are modeled
/// and exactly one is set.
#[derive(Debug, Serialize)]
struct LegacyChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verbosity: Option<&'static str>,
}

fn build_legacy_request<'a>(
    descriptor: &'a ModelDescriptor,
    messages: &'a [Message],
    max_tokens: u32,
) -> LegacyChatRequest<'a> {
    let budget = descriptor.effective_max_tokens(max_tokens);
    let (completion, output) = match max_tokens_field(descriptor.class) {
        "max_output_tokens" => (None, Some(budget)),
        _ => (Some(budget), None),
    };

    LegacyChatRequest {
        model: &descriptor.handle,
        messages,
        max_completion_tokens: completion,
        max_output_tokens: output,
        verbosity: descriptor.verbosity.then_some(VERBOSITY_HINT),
    }
}

#[derive(Debug, Deserialize)]
struct LegacyChatResponse {
    choices: Vec<LegacyChoice>,
}

#[derive(Debug, Deserialize)]
struct LegacyChoice {
    message: LegacyChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct LegacyChoiceMessage {
    content: Option<String>,
}

// ─────────────────────────────────────────────
// Structured ("responses") request shape
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<ResponsesInputItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<TextOptions>,
}

#[derive(Debug, Serialize)]
struct TextOptions {
    verbosity: &'static str,
}

#[derive(Debug, Serialize)]
struct ResponsesInputItem {
    role: &'static str,
    content: Vec<ResponsesInputPart>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type")]
enum ResponsesInputPart {
    #[serde(rename = "input_text")]
    InputText { text: String },
    #[serde(rename = "output_text")]
    OutputText { text: String },
    #[serde(rename = "input_image")]
    InputImage { image_url: String },
}

/// Translate the history into structured input blocks.
///
/// Assistant turns carry output-kind text; everything else carries
/// input-kind text. Images travel by URL only. Video and audio references
/// cannot be represented in this mode — a gate must have rewritten them
/// upstream, so leftovers are logged and dropped.
fn to_responses_input(messages: &[Message]) -> Vec<ResponsesInputItem> {
    messages
        .iter()
        .map(|message| match message {
            Message::System { content } => ResponsesInputItem {
                role: "system",
                content: vec![ResponsesInputPart::InputText {
                    text: content.clone(),
                }],
            },
            Message::Assistant { content } => ResponsesInputItem {
                role: "assistant",
                content: vec![ResponsesInputPart::OutputText {
                    text: content.clone(),
                }],
            },
            Message::User { content } => ResponsesInputItem {
                role: "user",
                content: user_content_to_parts(content),
            },
        })
        .collect()
}

fn user_content_to_parts(content: &MessageContent) -> Vec<ResponsesInputPart> {
    match content {
        MessageContent::Text(text) => vec![ResponsesInputPart::InputText { text: text.clone() }],
        MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => {
                    Some(ResponsesInputPart::InputText { text: text.clone() })
                }
                ContentPart::ImageUrl { image_url } => Some(ResponsesInputPart::InputImage {
                    image_url: image_url.url.clone(),
                }),
                ContentPart::Video { media } | ContentPart::Audio { media } => {
                    warn!(
                        handle = %media.handle,
                        mime = %media.mime_type,
                        "dropping media part with no structured-input representation"
                    );
                    None
                }
            })
            .collect(),
    }
}

// ─────────────────────────────────────────────
// Structured response extraction
// ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    /// Convenience field some deployments expose; preferred when non-empty.
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<ResponsesOutputBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponsesOutputBlock {
    #[serde(default)]
    content: Vec<ResponsesOutputPart>,
}

#[derive(Debug, Deserialize)]
struct ResponsesOutputPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Prefer the convenience field, else walk the output blocks collecting
/// every text-bearing part in order. Nothing recognizable is a success with
/// an empty answer, not an error.
fn extract_responses_text(response: ResponsesResponse) -> String {
    if let Some(text) = response.output_text {
        if !text.is_empty() {
            return text;
        }
    }

    let collected: Vec<String> = response
        .output
        .into_iter()
        .flat_map(|block| block.content)
        .filter(|part| part.kind == "output_text" || part.kind == "input_text")
        .filter_map(|part| part.text)
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

    fn make_config(model: &str, api_base: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            api_key: "test-key-123".to_string(),
            api_base: api_base.map(String::from),
            model: model.to_string(),
        }
    }

    // ── system role policy ──

    #[test]
    fn test_system_role_preserved_when_supported() {
        let d = ModelDescriptor::for_handle("gpt-5");
        let history = vec![Message::system("be brief"), Message::user("hi")];
        let prepared = apply_system_role_policy(&d, &history);
        assert_eq!(prepared, history);
    }

    #[test]
    fn test_system_role_reassigned_for_o1() {
        let d = ModelDescriptor::for_handle("o1-preview");
        let history = vec![Message::system("be brief"), Message::user("hi")];
        let prepared = apply_system_role_policy(&d, &history);
        assert_eq!(prepared[0], Message::assistant("be brief"));
        assert_eq!(prepared[1], Message::user("hi"));
    }

    // ── legacy request building ──

    #[test]
    fn test_legacy_request_completion_tokens_field() {
        let d = ModelDescriptor::for_handle("gpt-4.1");
        let messages = vec![Message::user("hi")];
        let body = build_legacy_request(&d, &messages, 500);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["max_completion_tokens"], 500);
        assert!(json.get("max_output_tokens").is_none());
        assert!(json.get("verbosity").is_none());
    }

    #[test]
    fn test_legacy_request_o1_output_tokens_with_reserved_budget() {
        // o1 in legacy mode uses the output-tokens field name and the
        // reserved budget regardless of the caller's max length.
        let d = ModelDescriptor::for_handle("o1");
        let messages = vec![Message::user("hi")];
        let body = build_legacy_request(&d, &messages, 500);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["max_output_tokens"], 30_000);
        assert!(json.get("max_completion_tokens").is_none());
    }

    #[test]
    fn test_legacy_request_gpt5_chat_has_no_verbosity() {
        let d = ModelDescriptor::for_handle("gpt-5-chat-latest");
        let messages = vec![Message::user("hi")];
        let body = build_legacy_request(&d, &messages, 500);
        let json = serde_json::to_value(&body).unwrap();

        assert!(json.get("verbosity").is_none());
    }

    // ── structured input translation ──

    #[test]
    fn test_responses_input_roles_and_kinds() {
        let history = vec![
            Message::system("be brief"),
            Message::user("hello"),
            Message::assistant("hi there"),
        ];
        let input = to_responses_input(&history);

        assert_eq!(input.len(), 3);
        assert_eq!(input[0].role, "system");
        assert_eq!(
            input[0].content[0],
            ResponsesInputPart::InputText {
                text: "be brief".into()
            }
        );
        assert_eq!(
            input[1].content[0],
            ResponsesInputPart::InputText {
                text: "hello".into()
            }
        );
        assert_eq!(
            input[2].content[0],
            ResponsesInputPart::OutputText {
                text: "hi there".into()
            }
        );
    }

    #[test]
    fn test_responses_input_image_by_url() {
        let history = vec![Message::user_parts(vec![
            ContentPart::Text {
                text: "what is this?".into(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "data:image/jpeg;base64,abc".into(),
                    detail: None,
                },
            },
        ])];
        let input = to_responses_input(&history);

        assert_eq!(input[0].content.len(), 2);
        assert_eq!(
            input[0].content[1],
            ResponsesInputPart::InputImage {
                image_url: "data:image/jpeg;base64,abc".into()
            }
        );
    }

    #[test]
    fn test_responses_input_drops_video_and_audio() {
        use relaybot_core::types::MediaRef;

        let history = vec![Message::user_parts(vec![
            ContentPart::Text {
                text: "listen".into(),
            },
            ContentPart::Audio {
                media: MediaRef {
                    handle: "f1".into(),
                    mime_type: "audio/ogg".into(),
                    size: None,
                    name: None,
                },
            },
        ])];
        let input = to_responses_input(&history);

        assert_eq!(input[0].content.len(), 1);
    }

    // ── structured response extraction ──

    #[test]
    fn test_extract_prefers_convenience_field() {
        let resp: ResponsesResponse = serde_json::from_value(serde_json::json!({
            "output_text": "direct answer",
            "output": [{"content": [{"type": "output_text", "text": "ignored"}]}]
        }))
        .unwrap();
        assert_eq!(extract_responses_text(resp), "direct answer");
    }

    #[test]
    fn test_extract_walks_blocks_when_convenience_empty() {
        let resp: ResponsesResponse = serde_json::from_value(serde_json::json!({
            "output_text": "",
            "output": [
                {"content": [{"type": "output_text", "text": "part one"}]},
                {"content": [
                    {"type": "reasoning", "text": "hidden"},
                    {"type": "output_text", "text": "part two"}
                ]}
            ]
        }))
        .unwrap();
        assert_eq!(extract_responses_text(resp), "part one\npart two");
    }

    #[test]
    fn test_extract_empty_is_empty_string() {
        let resp: ResponsesResponse =
            serde_json::from_value(serde_json::json!({ "output": [] })).unwrap();
        assert_eq!(extract_responses_text(resp), "");
    }

    // ── wiremock integration ──

    #[tokio::test]
    async fn test_ask_responses_mode() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(header("Authorization", "Bearer test-key-123"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-5",
                "text": {"verbosity": "low"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "output_text": "Hi there",
                "output": []
            })))
            .mount(&mock_server)
            .await;

        let backend = OpenAiBackend::new(&make_config("gpt-5", Some(&mock_server.uri())));
        let history = vec![Message::system("S"), Message::user("Hello")];

        let answer = backend.ask(&history, 500).await;
        assert_eq!(answer, "Hi there");
    }

    #[tokio::test]
    async fn test_ask_legacy_mode() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4.1",
                "max_completion_tokens": 500
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "legacy answer"}}]
            })))
            .mount(&mock_server)
            .await;

        let backend = OpenAiBackend::new(&make_config("gpt-4.1", Some(&mock_server.uri())));
        let history = vec![Message::user("Hello")];

        let answer = backend.ask(&history, 500).await;
        assert_eq!(answer, "legacy answer");
    }

    #[tokio::test]
    async fn test_ask_api_error_becomes_text() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "Rate limit exceeded"}
            })))
            .mount(&mock_server)
            .await;

        let backend = OpenAiBackend::new(&make_config("gpt-5", Some(&mock_server.uri())));
        let answer = backend.ask(&[Message::user("Hello")], 500).await;

        assert!(answer.starts_with("Error calling OpenAI:"));
        assert!(answer.contains("429"));
        assert!(answer.contains("Rate limit exceeded"));
    }

    #[tokio::test]
    async fn test_ask_network_error_becomes_text() {
        // Point to a port that's not listening.
        let backend = OpenAiBackend::new(&make_config("gpt-5", Some("http://127.0.0.1:1")));
        let answer = backend.ask(&[Message::user("Hello")], 500).await;

        assert!(answer.starts_with("Error calling OpenAI:"));
    }

    #[tokio::test]
    async fn test_ask_malformed_response_becomes_text() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let backend = OpenAiBackend::new(&make_config("gpt-4.1", Some(&mock_server.uri())));
        let answer = backend.ask(&[Message::user("Hello")], 500).await;

        assert!(answer.starts_with("Error calling OpenAI:"));
    }

    #[tokio::test]
    async fn test_legacy_missing_content_is_empty_answer() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": null}}]
            })))
            .mount(&mock_server)
            .await;

        let backend = OpenAiBackend::new(&make_config("gpt-5-chat", Some(&mock_server.uri())));
        let answer = backend.ask(&[Message::user("Hello")], 500).await;

        assert_eq!(answer, "");
    }
}
