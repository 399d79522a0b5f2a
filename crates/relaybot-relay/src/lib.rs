//! Relay layer — the dispatch router and the turn pipeline.
//!
//! # Architecture
//!
//! - [`router::DirectiveRouter`] — sticky provider selection driven by
//!   switch directives embedded at the start of message text
//! - [`relay::Relay`] — one inbound turn end to end: route → gates → commit
//!   → dispatch → commit → reply

pub mod relay;
pub mod router;

pub use relay::{Relay, TurnOutcome};
pub use router::{DirectiveRouter, RouteOutcome, PROVIDER_INDICATORS};
