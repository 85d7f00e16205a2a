//! Fallback model catalog — used when the listing call yields nothing.
//!
//! Some access tiers cannot call `/v1/models` at all; probing this fixed
//! set of well-known ids keeps the tool useful for them. Legacy
//! completion-only models are included on purpose, since they exercise
//! the chat → legacy endpoint fallback.

use crate::adapters::ModelInfo;

/// The single user prompt sent to every model.
pub const PROBE_PROMPT: &str = "Write a single-line friendly hello message.";

/// Output bound for probe replies.
pub const PROBE_MAX_TOKENS: u32 = 50;

/// Sampling temperature for probe replies.
pub const PROBE_TEMPERATURE: f64 = 0.7;

/// Known model ids, newest chat models first.
pub const FALLBACK_MODELS: [&str; 11] = [
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4-turbo",
    "gpt-4",
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-16k",
    "text-davinci-003",
    "text-davinci-002",
    "text-curie-001",
    "text-babbage-001",
    "text-ada-001",
];

/// The catalog as descriptors, in catalog order.
pub fn fallback_catalog() -> Vec<ModelInfo> {
    FALLBACK_MODELS.iter().map(|id| ModelInfo::from_id(*id)).collect()
}
