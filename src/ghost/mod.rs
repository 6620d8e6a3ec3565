//! Ghost envelopes, plans and flags.

pub mod envelope;
pub mod flags;
pub mod synthesizer;

pub use envelope::{GhostEnvelope, GhostLayout};
pub use flags::{GhostDataType, GhostFlags, GhostKind};
pub use synthesizer::{GhostPlan, GhostSource, GhostSynthesizer, LinkPlan};
