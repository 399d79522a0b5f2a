//! Dispatch router — provider switch directives at the start of a message.
//!
//! A short indicator prefix ("o:", "a:", …) switches the sticky provider
//! selection. The indicator sets deliberately include visually-identical
//! Cyrillic letters so users typing on a non-Latin keyboard don't have to
//! switch layouts.

use std::sync::Mutex;

use relaybot_core::types::ProviderId;
use tracing::info;

/// Indicator prefixes per provider, in tie-break order. Matching is
/// case-insensitive and only ever at the very start of the text.
///
/// Invariant: no indicator may be a prefix of another (for the same or a
/// different provider) — only the first match in this order is honored.
pub const PROVIDER_INDICATORS: &[(ProviderId, &[&str])] = &[
    (ProviderId::OpenAi, &["o:", "о:"]),          // Latin and Cyrillic
    (ProviderId::Anthropic, &["a:", "а:", "c:", "с:"]), // Latin and Cyrillic
];

/// Result of routing one inbound text.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    /// Provider serving this turn.
    pub provider: ProviderId,
    /// The text with any matched indicator stripped and whitespace trimmed.
    pub text: String,
    /// Human-readable "old -> new" line when the selection changed.
    pub report: Option<String>,
}

/// Sticky provider selection plus directive parsing.
///
/// The selection is shared across every user of this router instance — a
/// deliberate simplification carried over from the original design. A switch
/// directive from one user changes which provider serves other users'
/// subsequent (or racing in-flight) turns. Single writer: only `route`
/// mutates the selection.
pub struct DirectiveRouter {
    default_provider: ProviderId,
    selected: Mutex<Option<ProviderId>>,
}

impl DirectiveRouter {
    /// Create a router that falls back to the configured default provider.
    pub fn new(default_provider: ProviderId) -> Self {
        DirectiveRouter {
            default_provider,
            selected: Mutex::new(None),
        }
    }

    /// The provider currently serving turns.
    pub fn current(&self) -> ProviderId {
        self.selected
            .lock()
            .unwrap()
            .unwrap_or(self.default_provider)
    }

    /// Parse an inbound text: detect a switch directive, update the sticky
    /// selection, and strip the indicator.
    ///
    /// The indicator is stripped whether or not the selection actually
    /// changed; the transition report is produced only on a change, with the
    /// configured default standing in for "no selection yet".
    pub fn route(&self, raw_text: &str) -> RouteOutcome {
        let trimmed = raw_text.trim();
        let lowered = trimmed.to_lowercase();

        for (provider, indicators) in PROVIDER_INDICATORS {
            for indicator in *indicators {
                if !lowered.starts_with(indicator) {
                    continue;
                }

                let mut selected = self.selected.lock().unwrap();
                let report = if *selected != Some(*provider) {
                    let previous = selected.unwrap_or(self.default_provider);
                    let line = format!("{previous} -> {provider}");
                    info!(from = %previous, to = %provider, "provider switched");
                    Some(line)
                } else {
                    None
                };
                *selected = Some(*provider);

                let stripped: String = trimmed
                    .chars()
                    .skip(indicator.chars().count())
                    .collect();
                return RouteOutcome {
                    provider: *provider,
                    text: stripped.trim().to_string(),
                    report,
                };
            }
        }

        RouteOutcome {
            provider: self.current(),
            text: trimmed.to_string(),
            report: None,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
