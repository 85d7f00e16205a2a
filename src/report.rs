//! Terminal and JSON rendering of listings and probe runs.
//!
//! Everything writes to a `std::io::Write` so the binary can target
//! stdout and tests can target a buffer.

use std::io::{self, Write};

use crate::adapters::ModelInfo;
use crate::discovery::prober::{
    owner_of, ModelListing, ModelSource, ProbeRun, ProbeState, ProbeUpdate, ResolvedModels, RunOutcome,
};

/// Number of model ids shown before collapsing into "+N more".
pub const LISTING_PREVIEW: usize = 10;

pub const VERDICT_SUCCESS: &str = "API key validation completed successfully!";
pub const VERDICT_FAILURE: &str = "API key validation failed. Please check your key and try again.";

/// Result of the `models` command: the error if the listing failed,
/// otherwise a count and every model with its owner, one per line.
pub fn render_model_table(w: &mut impl Write, listing: &ModelListing) -> io::Result<()> {
    if let Some(err) = &listing.error {
        return writeln!(w, "⚠️  {}", err);
    }
    writeln!(w, "Found {} available models:", listing.models.len())?;
    let models = &listing.models;
    let width = models.iter().map(|m| m.id.len()).max().unwrap_or(0);
    for m in models {
        writeln!(w, "  {:<width$}  {}", m.id, owner_of(models, &m.id), width = width)?;
    }
    Ok(())
}

/// Prelude of a probe run: where the models came from and a short
/// preview of their ids.
pub fn render_resolved(w: &mut impl Write, resolved: &ResolvedModels) -> io::Result<()> {
    if let Some(err) = &resolved.listing_error {
        writeln!(w, "⚠️  {}", err)?;
    }
    let n = resolved.models.len();
    match resolved.source {
        ModelSource::Listing | ModelSource::Cached => writeln!(w, "Found {} available models:", n)?,
        ModelSource::Catalog => writeln!(w, "Probing the built-in catalog of {} models:", n)?,
        ModelSource::Explicit => writeln!(w, "Probing {} requested models:", n)?,
    }
    let ids: Vec<&str> = resolved.models.iter().take(LISTING_PREVIEW).map(|m| m.id.as_str()).collect();
    write!(w, "  {}", ids.join(", "))?;
    if n > LISTING_PREVIEW {
        write!(w, " +{} more", n - LISTING_PREVIEW)?;
    }
    writeln!(w)
}

/// One progress line per event. `models` supplies owner names.
pub fn render_update(w: &mut impl Write, update: &ProbeUpdate, models: &[ModelInfo]) -> io::Result<()> {
    let result = update.result();
    let owner = owner_of(models, &result.model_id);
    match (update, result.state) {
        (ProbeUpdate::Started { .. }, _) | (_, ProbeState::Testing) => {
            writeln!(w, "⏳ {} ({}) Testing...", result.model_id, owner)
        }
        (ProbeUpdate::Finished { .. }, ProbeState::Success) => {
            writeln!(w, "✅ {} ({}) Success{}", result.model_id, owner, elapsed(result.elapsed_ms))?;
            if let Some(text) = &result.response_text {
                writeln!(w, "   Response: {}", text.trim())?;
            }
            Ok(())
        }
        (ProbeUpdate::Finished { .. }, ProbeState::Error) => {
            writeln!(w, "❌ {} ({}) Error{}", result.model_id, owner, elapsed(result.elapsed_ms))?;
            if let Some(err) = &result.error_message {
                writeln!(w, "   Error: {}", err)?;
            }
            Ok(())
        }
    }
}

pub fn render_summary(w: &mut impl Write, run: &ProbeRun) -> io::Result<()> {
    let summary = run.summary();
    writeln!(w)?;
    writeln!(
        w,
        "{} of {} models responded ({} failed, {} ms total)",
        summary.succeeded, summary.total, summary.failed, summary.elapsed_ms
    )?;
    match run.outcome() {
        RunOutcome::Success => writeln!(w, "{}", VERDICT_SUCCESS),
        RunOutcome::Failure => writeln!(w, "{}", VERDICT_FAILURE),
    }
}

pub fn render_json(w: &mut impl Write, run: &ProbeRun) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *w, run)?;
    writeln!(w)
}

fn elapsed(ms: Option<u64>) -> String {
    ms.map(|ms| format!(" {}ms", ms)).unwrap_or_default()
}
