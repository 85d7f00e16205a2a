//! Sequential model prober — lists a key's models, then asks each one
//! for a one-line hello.
//!
//! Probes run strictly one at a time: model N+1 is not contacted until
//! model N has a final result. A failure is recorded against its model
//! and never stops the run. The only retry is the chat → legacy endpoint
//! switch on HTTP 404.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapters::{CompletionRequest, ModelInfo, ProviderAdapter};
use crate::credential::Credential;
use crate::discovery::catalog;
use crate::error::{ProbeError, UNKNOWN_ERROR};

// ── Results ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeState {
    Testing,
    Success,
    Error,
}

/// Outcome of probing one model.
///
/// Created as `Testing` when the model's turn starts and replaced once
/// by a terminal `Success` or `Error` value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub model_id: String,
    pub state: ProbeState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

impl ProbeResult {
    pub fn testing(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            state: ProbeState::Testing,
            response_text: None,
            error_message: None,
            elapsed_ms: None,
        }
    }

    /// Terminal result from whichever call resolved the probe.
    pub fn finished(
        model_id: impl Into<String>,
        outcome: Result<String, ProbeError>,
        elapsed_ms: u64,
    ) -> Self {
        let mut result = Self::testing(model_id);
        result.elapsed_ms = Some(elapsed_ms);
        match outcome {
            Ok(text) => {
                result.state = ProbeState::Success;
                result.response_text = Some(text);
            }
            Err(e) => {
                let message = e.to_string();
                result.state = ProbeState::Error;
                result.error_message = Some(if message.is_empty() {
                    UNKNOWN_ERROR.to_string()
                } else {
                    message
                });
            }
        }
        result
    }

    pub fn is_terminal(&self) -> bool {
        self.state != ProbeState::Testing
    }
}

/// Progress event emitted while a run is in flight. `index` is the
/// position of the model in the run's input order.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeUpdate {
    Started { index: usize, result: ProbeResult },
    Finished { index: usize, result: ProbeResult },
}

impl ProbeUpdate {
    pub fn index(&self) -> usize {
        match self {
            ProbeUpdate::Started { index, .. } | ProbeUpdate::Finished { index, .. } => *index,
        }
    }

    pub fn result(&self) -> &ProbeResult {
        match self {
            ProbeUpdate::Started { result, .. } | ProbeUpdate::Finished { result, .. } => result,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Success,
    Failure,
}

impl RunOutcome {
    /// Process exit status for the outcome.
    pub fn exit_code(self) -> u8 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::Failure => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
}

/// A completed run. `results[i]` belongs to `models[i]`.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeRun {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub models: Vec<ModelInfo>,
    pub results: Vec<ProbeResult>,
}

impl ProbeRun {
    /// `Success` if and only if at least one model answered.
    pub fn outcome(&self) -> RunOutcome {
        if self.results.iter().any(|r| r.state == ProbeState::Success) {
            RunOutcome::Success
        } else {
            RunOutcome::Failure
        }
    }

    pub fn summary(&self) -> RunSummary {
        let succeeded = self.results.iter().filter(|r| r.state == ProbeState::Success).count();
        let failed = self.results.iter().filter(|r| r.state == ProbeState::Error).count();
        RunSummary {
            total: self.results.len(),
            succeeded,
            failed,
            elapsed_ms: self.results.iter().filter_map(|r| r.elapsed_ms).sum(),
        }
    }

    /// Owning organisation of a probed model, "Unknown" when unlisted.
    pub fn owner_of(&self, model_id: &str) -> &str {
        owner_of(&self.models, model_id)
    }
}

pub fn owner_of<'a>(models: &'a [ModelInfo], model_id: &str) -> &'a str {
    models
        .iter()
        .find(|m| m.id == model_id)
        .map(|m| m.owned_by.as_str())
        .filter(|o| !o.is_empty())
        .unwrap_or("Unknown")
}

// ── Listing ─────────────────────────────────────────────────────────

/// Result of a listing call. A failed lookup is not fatal: `models` is
/// empty and `error` says why.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelListing {
    pub models: Vec<ModelInfo>,
    pub error: Option<String>,
}

/// Where the models of a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    /// Ids supplied by the caller.
    Explicit,
    /// A fresh listing call.
    Listing,
    /// The listing cached from an earlier run.
    Cached,
    /// The built-in fallback catalog.
    Catalog,
}

/// Models chosen for a run. `listing_error` keeps the reason a listing
/// call failed, even though the run proceeds on the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModels {
    pub models: Vec<ModelInfo>,
    pub source: ModelSource,
    pub listing_error: Option<String>,
}

/// Whether a run may reuse a listing fetched by an earlier run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListPolicy {
    /// Use the cached listing when it is non-empty.
    Reuse,
    /// Always call the listing endpoint again.
    #[default]
    Refresh,
}

// ── Prober ──────────────────────────────────────────────────────────

/// Knobs of the probe request.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSettings {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            prompt: catalog::PROBE_PROMPT.to_string(),
            max_tokens: catalog::PROBE_MAX_TOKENS,
            temperature: catalog::PROBE_TEMPERATURE,
        }
    }
}

pub struct ModelProber {
    adapter: Arc<dyn ProviderAdapter>,
    settings: ProbeSettings,
    cached_models: Vec<ModelInfo>,
}

impl ModelProber {
    pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self::with_settings(adapter, ProbeSettings::default())
    }

    pub fn with_settings(adapter: Arc<dyn ProviderAdapter>, settings: ProbeSettings) -> Self {
        Self { adapter, settings, cached_models: Vec::new() }
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// Listing from the last successful lookup, possibly empty.
    pub fn cached_models(&self) -> &[ModelInfo] {
        &self.cached_models
    }

    /// One read-only listing call.
    pub async fn list_models(&self, key: &Credential) -> ModelListing {
        info!(provider = self.adapter.provider_id(), "Fetching available models...");
        match self.adapter.list_models(key).await {
            Ok(models) => {
                info!(count = models.len(), "Model listing received");
                ModelListing { models, error: None }
            }
            Err(e) => {
                let message = match &e {
                    ProbeError::ListLookup(_) => e.to_string(),
                    other => format!("Error fetching models: {}", other),
                };
                warn!("{}", message);
                ModelListing { models: Vec::new(), error: Some(message) }
            }
        }
    }

    /// Decide which models a run will probe.
    ///
    /// A non-empty explicit list wins. Otherwise the listing is used,
    /// either the cached one (`ListPolicy::Reuse`) or a fresh one. An
    /// empty listing falls back to the fixed catalog.
    pub async fn resolve_models(
        &mut self,
        key: &Credential,
        explicit: Option<Vec<ModelInfo>>,
        policy: ListPolicy,
    ) -> ResolvedModels {
        if let Some(models) = explicit.filter(|m| !m.is_empty()) {
            return ResolvedModels { models, source: ModelSource::Explicit, listing_error: None };
        }

        if policy == ListPolicy::Reuse && !self.cached_models.is_empty() {
            debug!(count = self.cached_models.len(), "Reusing cached model listing");
            return ResolvedModels {
                models: self.cached_models.clone(),
                source: ModelSource::Cached,
                listing_error: None,
            };
        }

        let listing = self.list_models(key).await;
        if listing.models.is_empty() {
            warn!("No models listed — falling back to the built-in catalog");
            return ResolvedModels {
                models: catalog::fallback_catalog(),
                source: ModelSource::Catalog,
                listing_error: listing.error,
            };
        }
        self.cached_models = listing.models.clone();
        ResolvedModels { models: listing.models, source: ModelSource::Listing, listing_error: None }
    }

    /// Probe one model: chat endpoint first, legacy endpoint on a 404.
    pub async fn probe_model(&self, key: &Credential, model: &ModelInfo) -> ProbeResult {
        let req = CompletionRequest {
            model: model.id.clone(),
            prompt: self.settings.prompt.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let start = Instant::now();
        let outcome = match self.adapter.chat_completion(&req, key).await {
            Err(e) if e.is_not_found() => {
                debug!(model = %model.id, "Chat endpoint returned 404 — trying legacy completions");
                self.adapter.legacy_completion(&req, key).await
            }
            other => other,
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        ProbeResult::finished(model.id.clone(), outcome.map(|body| body.response_text()), elapsed_ms)
    }

    /// Probe every model in order, one at a time.
    ///
    /// When `updates` is given, a `Started` event is sent before each
    /// request and a `Finished` event once it resolves. A closed
    /// receiver is ignored and the run carries on.
    pub async fn probe_all_models(
        &self,
        key: &Credential,
        models: &[ModelInfo],
        updates: Option<&UnboundedSender<ProbeUpdate>>,
    ) -> ProbeRun {
        let models = if models.is_empty() {
            catalog::fallback_catalog()
        } else {
            models.to_vec()
        };

        let mut run = ProbeRun {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            models,
            results: Vec::new(),
        };

        info!(run_id = %run.id, models = run.models.len(), "📡 Probing models...");

        let emit = |update: ProbeUpdate| {
            if let Some(tx) = updates {
                let _ = tx.send(update);
            }
        };

        for (index, model) in run.models.iter().enumerate() {
            let pending = ProbeResult::testing(model.id.clone());
            run.results.push(pending.clone());
            emit(ProbeUpdate::Started { index, result: pending });

            let result = self.probe_model(key, model).await;
            match result.state {
                ProbeState::Success => info!(
                    model = %model.id,
                    elapsed_ms = result.elapsed_ms.unwrap_or_default(),
                    "✅ Model responded"
                ),
                _ => warn!(
                    model = %model.id,
                    elapsed_ms = result.elapsed_ms.unwrap_or_default(),
                    error = result.error_message.as_deref().unwrap_or(UNKNOWN_ERROR),
                    "❌ Model probe failed"
                ),
            }

            run.results[index] = result.clone();
            emit(ProbeUpdate::Finished { index, result });
        }

        let summary = run.summary();
        info!(
            run_id = %run.id,
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            outcome = ?run.outcome(),
            "📡 Probe run complete"
        );

        run
    }
}
