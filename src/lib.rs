//! KeyProbe — checks which of a provider's models answer for an API key.
//!
//! One listing call, then one probe per model, strictly in order. Each
//! probe tries the chat-style endpoint and, on a 404 only, the legacy
//! completion endpoint. Results stream out as they are finalised.
//!
//! No persistence, no concurrency, no retries beyond that one endpoint
//! switch. The key is never logged.

pub mod adapters;
pub mod config;
pub mod credential;
pub mod discovery;
pub mod error;
pub mod report;

pub use adapters::{ModelInfo, ProviderAdapter};
pub use credential::Credential;
pub use discovery::prober::{
    ListPolicy, ModelListing, ModelProber, ModelSource, ProbeResult, ProbeRun, ProbeState, ProbeUpdate,
    ResolvedModels, RunOutcome,
};
pub use error::ProbeError;
