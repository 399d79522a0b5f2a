//! Model-rule tables for the OpenAI backend.
//!
//! A model handle string ("gpt-5", "o1-preview", an Azure deployment name)
//! determines everything about how the request is built: which request mode
//! to use, whether the system role exists, how the output budget is named,
//! and whether the verbosity hint applies. The flags are independent — a
//! model can need legacy mode and lack verbosity support at the same time.

// ─────────────────────────────────────────────
// Model classes
// ─────────────────────────────────────────────

/// Known OpenAI model classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelClass {
    O1,
    FourO,
    Gpt41,
    Gpt5,
    Gpt5Chat,
}

impl ModelClass {
    /// The tag matched against model handles (case-insensitive substring).
    pub fn tag(&self) -> &'static str {
        match self {
            ModelClass::O1 => "o1",
            ModelClass::FourO => "4o",
            ModelClass::Gpt41 => "gpt-4.1",
            ModelClass::Gpt5 => "gpt-5",
            ModelClass::Gpt5Chat => "gpt-5-chat",
        }
    }
}

/// Identification priority order. The first tag that appears in the handle
/// wins, so `gpt-5-chat` handles identify as `Gpt5` — the chat variant is
/// distinguished by the exclusion lists below, not by class.
pub const MODEL_CLASSES: &[ModelClass] = &[
    ModelClass::O1,
    ModelClass::FourO,
    ModelClass::Gpt41,
    ModelClass::Gpt5,
    ModelClass::Gpt5Chat,
];

/// Classes whose API rejects the system role.
const NO_SYSTEM_ROLE: &[ModelClass] = &[ModelClass::O1];

/// Handle substrings that force the legacy chat-completions request shape.
/// Ordered longest-first so a short token cannot mask a more specific one.
const LEGACY_TRIGGERS: &[&str] = &["gpt-5-chat", "gpt-4.1"];

/// Handle substrings excluded from the verbosity hint even when the class
/// qualifies.
const NO_VERBOSITY: &[&str] = &["gpt-5-chat"];

/// Reserved output budget for reasoning-capable classes, overriding the
/// caller's max length. OpenAI recommends at least 25k tokens of headroom
/// for reasoning plus output.
const RESERVED_OUTPUT_BUDGET: &[(ModelClass, u32)] = &[(ModelClass::O1, 30_000)];

// ─────────────────────────────────────────────
// Rule functions
// ─────────────────────────────────────────────

/// Find the first class (in declared priority order) whose tag is a
/// case-insensitive substring of the handle.
pub fn identify_model_class(handle: &str) -> Option<ModelClass> {
    let lowered = handle.to_lowercase();
    MODEL_CLASSES
        .iter()
        .copied()
        .find(|class| lowered.contains(class.tag()))
}

/// Whether the model accepts role=system messages.
pub fn supports_system_role(class: Option<ModelClass>) -> bool {
    match class {
        Some(c) => !NO_SYSTEM_ROLE.contains(&c),
        None => true,
    }
}

/// Whether the handle requires the legacy chat-completions request shape.
pub fn uses_legacy_request(handle: &str) -> bool {
    let lowered = handle.to_lowercase();
    LEGACY_TRIGGERS.iter().any(|token| lowered.contains(token))
}

/// Whether the handle gets the low-verbosity hint.
///
/// Only exact class `Gpt5`, and never for handles on the exclusion list —
/// `gpt-5-chat-latest` identifies as `Gpt5` too, but is excluded.
pub fn supports_verbosity(handle: &str) -> bool {
    let lowered = handle.to_lowercase();
    if NO_VERBOSITY.iter().any(|token| lowered.contains(token)) {
        return false;
    }
    identify_model_class(handle) == Some(ModelClass::Gpt5)
}

/// Field name carrying the output budget in legacy requests.
pub fn max_tokens_field(class: Option<ModelClass>) -> &'static str {
    match class {
        Some(ModelClass::O1) => "max_output_tokens",
        _ => "max_completion_tokens",
    }
}

/// Fixed output budget for classes that override the caller's max length.
pub fn reserved_output_budget(class: Option<ModelClass>) -> Option<u32> {
    let class = class?;
    RESERVED_OUTPUT_BUDGET
        .iter()
        .find(|(c, _)| *c == class)
        .map(|(_, budget)| *budget)
}

// ─────────────────────────────────────────────
// ModelDescriptor
// ─────────────────────────────────────────────

/// All request-shaping flags for one model handle, derived deterministically.
/// Not persisted — computed once per adapter instance.
#[derive(Clone, Debug)]
pub struct ModelDescriptor {
    pub handle: String,
    pub class: Option<ModelClass>,
    pub legacy_request: bool,
    pub system_role: bool,
    pub verbosity: bool,
    pub max_tokens_override: Option<u32>,
}

impl ModelDescriptor {
    /// Derive the descriptor for a handle.
    pub fn for_handle(handle: impl Into<String>) -> Self {
        let handle = handle.into();
        let class = identify_model_class(&handle);
        ModelDescriptor {
            legacy_request: uses_legacy_request(&handle),
            system_role: supports_system_role(class),
            verbosity: supports_verbosity(&handle),
            max_tokens_override: reserved_output_budget(class),
            class,
            handle,
        }
    }

    /// Effective output budget: the reserved override when present,
    /// otherwise the caller's request.
    pub fn effective_max_tokens(&self, requested: u32) -> u32 {
        self.max_tokens_override.unwrap_or(requested)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
