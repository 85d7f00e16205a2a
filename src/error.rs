//! Error taxonomy for listing and probing.
//!
//! Every variant is local to the request it concerns. None of them
//! aborts a probe run; they end up as the error text of a single result.

use thiserror::Error;

/// Fallback text when no better description of a failure exists.
pub const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Blank credential, rejected before any network call.
    #[error("Please enter an API key")]
    MissingCredential,

    /// No response was obtained at all.
    #[error("{}", non_empty_or_unknown(.0))]
    Transport(String),

    /// Non-2xx response. `message` is the provider's `error.message`.
    #[error("{}", provider_message(.status, .message))]
    Provider { status: u16, message: Option<String> },

    /// The model listing call failed.
    #[error("Failed to fetch models: {0}")]
    ListLookup(String),

    /// A 2xx response whose body could not be decoded.
    #[error("{}", non_empty_or_unknown(.0))]
    Decode(String),
}

impl ProbeError {
    /// HTTP status of the failed call, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProbeError::Provider { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The only failure that sends a chat probe to the legacy endpoint.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProbeError::Decode(e.to_string())
        } else {
            ProbeError::Transport(e.to_string())
        }
    }
}

fn non_empty_or_unknown(msg: &str) -> &str {
    if msg.trim().is_empty() { UNKNOWN_ERROR } else { msg }
}

fn provider_message(status: &u16, message: &Option<String>) -> String {
    match message.as_deref() {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => format!("HTTP {}", status),
    }
}
