//! Provider adapter trait — the outbound HTTP boundary.
//!
//! An adapter knows the three call shapes a probe needs: the model
//! listing, the chat-style completion and the legacy completion. It
//! never decides what to do with a failure; the prober does.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::error::ProbeError;

pub mod openai;

/// Shown when a successful reply carries no extractable text.
pub const NO_RESPONSE_CONTENT: &str = "No response content";

// ── Core Types ──────────────────────────────────────────────────────

/// One queryable model, as reported by `GET /v1/models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub object: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub owned_by: String,
}

impl ModelInfo {
    /// A descriptor known only by id (catalog entries, `--model` flags).
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "model".to_string(),
            created: 0,
            owned_by: String::new(),
        }
    }

    /// One `data[]` entry of a listing. Only `id` is required; missing,
    /// null or oddly typed metadata falls back to empty values.
    pub fn from_json(entry: &serde_json::Value) -> Option<Self> {
        Some(Self {
            id: entry["id"].as_str()?.to_string(),
            object: entry["object"].as_str().unwrap_or_default().to_string(),
            created: entry["created"].as_i64().unwrap_or_default(),
            owned_by: entry["owned_by"].as_str().unwrap_or_default().to_string(),
        })
    }
}

fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

/// Models in a listing body, in provider order. Entries without a
/// string `id` are skipped.
pub fn parse_model_list(body: &serde_json::Value) -> Vec<ModelInfo> {
    body["data"]
        .as_array()
        .map(|arr| arr.iter().filter_map(ModelInfo::from_json).collect())
        .unwrap_or_default()
}

/// A single-prompt completion request. The same values feed both the
/// chat-style and legacy call shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Success body of either completion endpoint, kept as raw JSON. Any
/// valid JSON is a successful reply; its shape only decides the text.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct CompletionBody(pub serde_json::Value);

impl CompletionBody {
    /// Chat message content, else legacy `text`, else the placeholder.
    /// Empty strings and non-string values count as missing.
    pub fn response_text(&self) -> String {
        let choice = &self.0["choices"][0];
        choice["message"]["content"]
            .as_str()
            .filter(|s| !s.is_empty())
            .or_else(|| choice["text"].as_str().filter(|s| !s.is_empty()))
            .unwrap_or(NO_RESPONSE_CONTENT)
            .to_string()
    }
}

/// Provider error envelope: `{ "error": { "message": ... } }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

/// Pull `error.message` out of a raw error body, if it is there.
pub fn parse_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()?
        .error?
        .message
        .filter(|m| !m.is_empty())
}

// ── Adapter Trait ───────────────────────────────────────────────────

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Unique provider identifier (e.g., "openai").
    fn provider_id(&self) -> &str;

    /// List the models the credential can see, in provider order.
    async fn list_models(&self, key: &Credential) -> Result<Vec<ModelInfo>, ProbeError>;

    /// Chat-style probe: one user-role message.
    async fn chat_completion(
        &self,
        req: &CompletionRequest,
        key: &Credential,
    ) -> Result<CompletionBody, ProbeError>;

    /// Legacy probe: flat prompt string.
    async fn legacy_completion(
        &self,
        req: &CompletionRequest,
        key: &Credential,
    ) -> Result<CompletionBody, ProbeError>;
}
