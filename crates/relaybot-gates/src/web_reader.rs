//! Web reader gate — replaces a URL in the user's message with the page's
//! visible text wrapped in a summarization prompt.
//!
//! YouTube links are excluded; the YouTube gate handles those (and runs
//! earlier anyway).

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use relaybot_core::types::{Message, ProviderId};
use tracing::{debug, warn};

use crate::traits::{replace_last_content, Gate};

/// User-Agent header; some sites block the default reqwest one.
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_2) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Cap on extracted text, to keep the context window sane.
const MAX_CONTENT_CHARS: usize = 10_000;

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").expect("valid URL regex"))
}

/// First URL in the text, if any.
fn find_url(text: &str) -> Option<&str> {
    url_regex().find(text).map(|m| m.as_str())
}

fn is_youtube(url: &str) -> bool {
    url.contains("youtube.com") || url.contains("youtu.be")
}

// ─────────────────────────────────────────────
// WebReaderGate
// ─────────────────────────────────────────────

/// Fetches a linked page and rewrites the turn into a summarization prompt.
pub struct WebReaderGate {
    client: reqwest::Client,
}

impl WebReaderGate {
    pub fn new() -> Self {
        WebReaderGate {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .redirect(reqwest::redirect::Policy::limited(5))
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    fn summarization_prompt(text: &str) -> String {
        format!(
            "Please provide a brief and comprehensive summary of the following \
             web page content.\nFocus on the main points and key information.\n\n\
             CONTENT:\n{text}"
        )
    }
}

impl Default for WebReaderGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gate for WebReaderGate {
    fn name(&self) -> &'static str {
        "web_reader"
    }

    fn applicable(&self, pending: &[Message], _provider: ProviderId) -> bool {
        let content = match pending.last() {
            Some(Message::User { content }) => content,
            _ => return false,
        };
        match find_url(&content.text()) {
            Some(url) => !is_youtube(url),
            None => false,
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
        let url = find_url(&text)
            .ok_or_else(|| anyhow::anyhow!("no URL in pending turn"))?
            .to_string();

        debug!(url = %url, "fetching linked page");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("fetching {url} returned {status}");
        }
        let body = response.text().await?;

        let mut extracted = extract_visible_text(&body);
        if extracted.is_empty() {
            anyhow::bail!("no visible text extracted from {url}");
        }
        if extracted.chars().count() > MAX_CONTENT_CHARS {
            warn!(url = %url, "extracted text capped at {MAX_CONTENT_CHARS} chars");
            extracted = extracted.chars().take(MAX_CONTENT_CHARS).collect();
        }

        replace_last_content(&mut pending, Self::summarization_prompt(&extracted));
        Ok(pending)
    }
}

// ─────────────────────────────────────────────
// HTML helpers
// ─────────────────────────────────────────────

/// Remove HTML tags, scripts, and styles; decode common entities; collapse
/// blank lines. Good enough for LLM consumption without an HTML parser.
fn extract_visible_text(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;
    let mut tag_name = String::new();
    let mut collecting_tag_name = false;

    for ch in html.chars() {
        if ch == '<' {
            in_tag = true;
            collecting_tag_name = true;
            tag_name.clear();
            continue;
        }
        if ch == '>' {
            in_tag = false;
            collecting_tag_name = false;
            let lower = tag_name.to_lowercase();
            match lower.as_str() {
                "script" => in_script = true,
                "/script" => in_script = false,
                "style" => in_style = true,
                "/style" => in_style = false,
                "br" | "br/" | "p" | "/p" | "div" | "/div" | "li" | "/li" | "h1" | "/h1"
                | "h2" | "/h2" | "h3" | "/h3" => result.push('\n'),
                _ => {}
            }
            continue;
        }
        if in_tag {
            if collecting_tag_name && (ch.is_alphanumeric() || ch == '/') {
                tag_name.push(ch);
            } else {
                collecting_tag_name = false;
            }
            continue;
        }
        if in_script || in_style {
            continue;
        }
        result.push(ch);
    }

    let decoded = decode_entities(&result);

    // Trim each line, drop blanks.
    let lines: Vec<&str> = decoded
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    lines.join("\n")
}

/// Decode the handful of entities that actually matter in prose.
/// `&amp;` goes last so it cannot re-introduce decodable sequences.
fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
