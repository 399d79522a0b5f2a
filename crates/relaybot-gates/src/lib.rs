//! Content-detection gates for Relaybot.
//!
//! A gate inspects the pending turn before dispatch and may rewrite it:
//! enrichment gates swap a link for fetched content, capability gates swap
//! unsupported media for an explanation. The relay consumes gates through
//! [`registry::GateRegistry`], which owns ordering, enable flags, and the
//! single-gate-per-turn policy.
//!
//! Built-in gates, in declared order:
//!
//! 1. [`youtube::SummarizeYoutubeGate`]
//! 2. [`web_reader::WebReaderGate`]
//! 3. [`capability::MediaCapabilityGate`] (video, picture, audio)
//! 4. [`capability::ImageGenerationGate`]

pub mod capability;
pub mod registry;
pub mod traits;
pub mod web_reader;
pub mod youtube;

pub use capability::{ImageGenerationGate, MediaCapabilityGate};
pub use registry::{GateOutcome, GateRegistry};
pub use traits::Gate;
pub use web_reader::WebReaderGate;
pub use youtube::SummarizeYoutubeGate;
