//! YouTube summarization gate — swaps a YouTube link for the video's
//! transcript wrapped in a strict summarization prompt.
//!
//! Transcripts come from the public timedtext endpoint, tried per language
//! in a fixed order. A video without captions makes the gate fail, which the
//! registry treats as non-applicable.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use relaybot_core::types::{Message, ProviderId};
use tracing::{debug, warn};

use crate::traits::{replace_last_content, Gate};

/// Timedtext endpoint base.
const TIMEDTEXT_BASE: &str = "https://video.google.com";

/// Caption languages tried in order.
const TRANSCRIPT_LANGS: &[&str] = &["es", "en"];

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})").expect("valid video id regex"))
}

fn transcript_text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<text[^>]*>(.*?)</text>").expect("valid transcript regex"))
}

/// Extract the 11-character video id from a YouTube URL.
fn extract_video_id(text: &str) -> Option<&str> {
    video_id_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn mentions_youtube(text: &str) -> bool {
    text.contains("youtube.com") || text.contains("youtu.be")
}

/// Pull the caption phrases out of a timedtext XML document and join them
/// into one block of prose.
fn parse_transcript_xml(xml: &str) -> String {
    let phrases: Vec<String> = transcript_text_regex()
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| decode_xml_entities(m.as_str().trim()))
        .filter(|phrase| !phrase.is_empty())
        .collect();
    phrases.join(" ")
}

/// `&amp;` last so it cannot re-introduce decodable sequences.
fn decode_xml_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

// ─────────────────────────────────────────────
// SummarizeYoutubeGate
// ─────────────────────────────────────────────

/// Replaces a YouTube link with its transcript and a summarization prompt.
pub struct SummarizeYoutubeGate {
    client: reqwest::Client,
    base: String,
}

impl SummarizeYoutubeGate {
    pub fn new() -> Self {
        Self::with_base(TIMEDTEXT_BASE)
    }

    /// Use a different timedtext endpoint (tests point this at a mock).
    pub fn with_base(base: impl Into<String>) -> Self {
        SummarizeYoutubeGate {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base: base.into(),
        }
    }

    /// Fetch the transcript, trying each configured language.
    async fn fetch_transcript(&self, video_id: &str) -> anyhow::Result<String> {
        for &lang in TRANSCRIPT_LANGS {
            let url = format!(
                "{}/timedtext?lang={}&v={}",
                self.base.trim_end_matches('/'),
                lang,
                video_id
            );
            let response = match self.client.get(&url).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(video = video_id, lang, error = %e, "timedtext request failed");
                    continue;
                }
            };
            if !response.status().is_success() {
                continue;
            }
            let xml = response.text().await.unwrap_or_default();
            let transcript = parse_transcript_xml(&xml);
            if !transcript.is_empty() {
                debug!(video = video_id, lang, chars = transcript.len(), "transcript fetched");
                return Ok(transcript);
            }
        }
        anyhow::bail!("no transcript available for video {video_id}")
    }

    fn summarization_prompt(transcript: &str) -> String {
        format!(
            "STRICT INFORMATION PROCESSING INSTRUCTIONS:\n\
             1. OUTPUT FORMAT:\n\
             - Executive summary in maximum 5 points\n\
             - Neutral and direct language\n\
             - No subjective assessments\n\
             - Style: informative and objective\n\n\
             2. MANDATORY ANALYSIS:\n\
             - Identify MAIN FACTS\n\
             - Extract CONCRETE DATA\n\
             - Contextualize without personal opinion\n\
             - Prioritize verifiable information\n\n\
             3. RESTRICTIONS:\n\
             - Prohibited use of emotional adjectives\n\
             - Avoid personal interpretations\n\
             - Maximum linguistic neutrality\n\
             - Mathematical precision in description\n\n\
             4. STRUCTURE:\n\
             [Objective headline]\n\
             - Point 1: What happened\n\
             - Point 2: Who was involved\n\
             - Point 3: When and where\n\
             - Point 4: Immediate consequences\n\
             - Point 5: Relevant context\n\n\
             CONTENT TO SUMMARIZE:\n{transcript}"
        )
    }
}

impl Default for SummarizeYoutubeGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gate for SummarizeYoutubeGate {
    fn name(&self) -> &'static str {
        "summarize_youtube"
    }

    fn applicable(&self, pending: &[Message], _provider: ProviderId) -> bool {
        match pending.last() {
            Some(Message::User { content }) => mentions_youtube(&content.text()),
            _ => false,
        }
    }

    async fn transform(
        &self,
        mut pending: Vec<Message>,
        _provider: ProviderId,
    ) -> anyhow::Result<Vec<Message>> {
        let text = pending
            .last()
            .and_then(Message::user_content)
            .map(|c| c.text())
            .unwrap_or_default();
        let video_id = extract_video_id(&text)
            .ok_or_else(|| anyhow::anyhow!("no video id in YouTube link"))?
            .to_string();

        let transcript = self.fetch_transcript(&video_id).await?;
        replace_last_content(&mut pending, Self::summarization_prompt(&transcript));
        Ok(pending)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use relaybot_core::types::MessageContent;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // ── video id extraction ──

    #[test]
    fn test_extract_id_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn test_extract_id_short_url() {
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn test_extract_id_none() {
        assert_eq!(extract_video_id("https://youtube.com/"), None);
    }

    // ── transcript parsing ──

    #[test]
    fn test_parse_transcript_xml() {
        let xml = r#"<?xml version="1.0"?><transcript>
            <text start="0.0" dur="2.5">Hello everyone</text>
            <text start="2.5" dur="3.0">welcome &amp; enjoy</text>
        </transcript>"#;
        assert_eq!(parse_transcript_xml(xml), "Hello everyone welcome & enjoy");
    }

    #[test]
    fn test_parse_transcript_empty() {
        assert_eq!(parse_transcript_xml("<transcript></transcript>"), "");
    }

    // ── applicability ──

    #[test]
    fn test_applicable_youtube_link() {
        let gate = SummarizeYoutubeGate::new();
        let pending = vec![Message::user("https://youtu.be/dQw4w9WgXcQ")];
        assert!(gate.applicable(&pending, ProviderId::OpenAi));
    }

    #[test]
    fn test_not_applicable_other_url() {
        let gate = SummarizeYoutubeGate::new();
        let pending = vec![Message::user("https://example.com/video")];
        assert!(!gate.applicable(&pending, ProviderId::OpenAi));
    }

    #[test]
    fn test_not_applicable_assistant_turn() {
        let gate = SummarizeYoutubeGate::new();
        let pending = vec![Message::assistant("see https://youtu.be/dQw4w9WgXcQ")];
        assert!(!gate.applicable(&pending, ProviderId::OpenAi));
    }

    // ── transform ──

    #[tokio::test]
    async fn test_transform_builds_summarization_prompt() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/timedtext"))
            .and(query_param("lang", "es"))
            .and(query_param("v", "dQw4w9WgXcQ"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<transcript><text start="0" dur="1">la noticia del dia</text></transcript>"#,
            ))
            .mount(&mock_server)
            .await;

        let gate = SummarizeYoutubeGate::with_base(mock_server.uri());
        let pending = vec![Message::user("https://youtu.be/dQw4w9WgXcQ")];

        let result = gate.transform(pending, ProviderId::OpenAi).await.unwrap();
        match result.last().unwrap() {
            Message::User {
                content: MessageContent::Text(text),
            } => {
                assert!(text.starts_with("STRICT INFORMATION PROCESSING INSTRUCTIONS"));
                assert!(text.contains("la noticia del dia"));
            }
            other => panic!("expected text user turn, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transform_falls_back_to_second_language() {
        let mock_server = MockServer::start().await;
        // Spanish: empty transcript. English: real one.
        Mock::given(method("GET"))
            .and(path("/timedtext"))
            .and(query_param("lang", "es"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<transcript></transcript>"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/timedtext"))
            .and(query_param("lang", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<transcript><text start="0" dur="1">the news of the day</text></transcript>"#,
            ))
            .mount(&mock_server)
            .await;

        let gate = SummarizeYoutubeGate::with_base(mock_server.uri());
        let pending = vec![Message::user("https://www.youtube.com/watch?v=dQw4w9WgXcQ")];

        let result = gate.transform(pending, ProviderId::OpenAi).await.unwrap();
        let text = result.last().and_then(Message::user_content).unwrap().text();
        assert!(text.contains("the news of the day"));
    }

    #[tokio::test]
    async fn test_transform_no_captions_fails() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/timedtext"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&mock_server)
            .await;

        let gate = SummarizeYoutubeGate::with_base(mock_server.uri());
        let pending = vec![Message::user("https://youtu.be/dQw4w9WgXcQ")];

        let result = gate.transform(pending, ProviderId::OpenAi).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_transform_no_video_id_fails() {
        let gate = SummarizeYoutubeGate::new();
        // Mentions youtube.com but carries no 11-char id.
        let pending = vec![Message::user("I love youtube.com in general")];

        let result = gate.transform(pending, ProviderId::OpenAi).await;
        assert!(result.is_err());
    }
}
