//! Gate registry — declared-order gate list with per-entry enable flags.
//!
//! No filesystem discovery: the built-in gates are registered in a fixed
//! order and toggled by config or at runtime. At most one gate processes a
//! given turn — the first applicable one wins.

use relaybot_core::config::GatesConfig;
use relaybot_core::types::{Message, ProviderId};
use tracing::{debug, warn};

use crate::capability::{ImageGenerationGate, MediaCapabilityGate};
use crate::traits::Gate;
use crate::web_reader::WebReaderGate;
use crate::youtube::SummarizeYoutubeGate;

/// One registered gate plus its enable flag.
struct GateEntry {
    gate: Box<dyn Gate>,
    enabled: bool,
}

/// What the registry did with a pending turn.
pub struct GateOutcome {
    /// The message to commit as the turn (the transformed last message, or
    /// the original when no gate applied).
    pub message: Message,
    /// Name of the gate that processed the turn, if any.
    pub applied: Option<&'static str>,
}

/// Ordered gate collection.
pub struct GateRegistry {
    entries: Vec<GateEntry>,
}

impl GateRegistry {
    /// Build the registry from explicit gates, in the given order.
    pub fn new(gates: Vec<Box<dyn Gate>>) -> Self {
        GateRegistry {
            entries: gates
                .into_iter()
                .map(|gate| GateEntry {
                    gate,
                    enabled: true,
                })
                .collect(),
        }
    }

    /// The built-in gate set in its declared order, flags from config.
    ///
    /// Order matters: the YouTube gate runs before the generic web reader
    /// (which excludes YouTube links on its own as a second line of
    /// defense), and content-rewriting gates run before capability checks.
    pub fn with_defaults(config: &GatesConfig) -> Self {
        let mut registry = GateRegistry::new(vec![
            Box::new(SummarizeYoutubeGate::new()),
            Box::new(WebReaderGate::new()),
            Box::new(MediaCapabilityGate::watch_video()),
            Box::new(MediaCapabilityGate::watch_picture()),
            Box::new(MediaCapabilityGate::listen_audio()),
            Box::new(ImageGenerationGate::new()),
        ]);

        registry.set_enabled("summarize_youtube", config.summarize_youtube);
        registry.set_enabled("web_reader", config.web_reader);
        registry.set_enabled("watch_video", config.watch_video);
        registry.set_enabled("watch_picture", config.watch_picture);
        registry.set_enabled("listen_audio", config.listen_audio);
        registry.set_enabled("generate_picture", config.generate_picture);
        registry
    }

    /// Offer the pending turn to the gates in order.
    ///
    /// The first enabled gate whose `applicable` returns true gets to
    /// transform; a failing transform is logged and scanning continues with
    /// the next gate. `pending` must end with the new turn.
    pub async fn apply(&self, pending: Vec<Message>, provider: ProviderId) -> GateOutcome {
        for entry in &self.entries {
            if !entry.enabled {
                continue;
            }
            if !entry.gate.applicable(&pending, provider) {
                continue;
            }

            let name = entry.gate.name();
            debug!(gate = name, "gate applicable, transforming");
            match entry.gate.transform(pending.clone(), provider).await {
                Ok(transformed) => {
                    if let Some(message) = transformed.into_iter().last() {
                        return GateOutcome {
                            message,
                            applied: Some(name),
                        };
                    }
                    warn!(gate = name, "gate returned an empty history, skipping");
                }
                Err(e) => {
                    warn!(gate = name, error = %e, "gate failed, treating as non-applicable");
                }
            }
        }

        let message = pending
            .into_iter()
            .last()
            .expect("pending history includes the new turn");
        GateOutcome {
            message,
            applied: None,
        }
    }

    /// `(name, enabled)` for every gate, in declared order.
    pub fn status(&self) -> Vec<(&'static str, bool)> {
        self.entries
            .iter()
            .map(|e| (e.gate.name(), e.enabled))
            .collect()
    }

    /// Set one gate's enable flag. Returns false for unknown names.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.gate.name() == name) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Enable every gate.
    pub fn enable_all(&mut self) {
        for entry in &mut self.entries {
            entry.enabled = true;
        }
    }

    /// Disable every gate.
    pub fn disable_all(&mut self) {
        for entry in &mut self.entries {
            entry.enabled = false;
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
