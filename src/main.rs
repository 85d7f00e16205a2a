//! KeyProbe CLI.
//!
//! `keyprobe models` lists what a key can see; `keyprobe probe` asks
//! every model for a one-line hello and reports which ones answered.
//! Logs go to stderr, the report to stdout.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use keyprobe::config::{ProbeConfig, ENV_API_KEY};
use keyprobe::discovery::catalog;
use keyprobe::report;
use keyprobe::{
    Credential, ListPolicy, ModelInfo, ModelProber, ModelSource, ProbeUpdate, ResolvedModels, RunOutcome,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// API key. Read from stdin when neither this nor the env var is set.
    #[arg(long, global = true, env = ENV_API_KEY, hide_env_values = true)]
    api_key: Option<String>,
    /// Provider base URL (overrides config and KEYPROBE_BASE_URL).
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// YAML config file. Defaults to <config dir>/keyprobe/config.yaml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the models available to the key.
    Models,
    /// Probe models one by one with a trivial prompt.
    Probe {
        /// Probe only these model ids (repeatable).
        #[arg(long = "model", value_name = "ID")]
        models: Vec<String>,
        /// Skip the listing call and probe the built-in catalog.
        #[arg(long, conflicts_with = "models")]
        catalog: bool,
        /// Print the finished run as JSON instead of live progress.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.log_json);

    info!("🔑 KeyProbe v{}", env!("CARGO_PKG_VERSION"));

    let mut config = ProbeConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(url) = &args.base_url {
        config.base_url = url.clone();
    }

    let key = match args.api_key.clone() {
        Some(raw) => Credential::new(raw)?,
        None => read_key_from_stdin().await?,
    };

    let adapter = Arc::new(config.adapter()?);
    info!(base_url = adapter.base_url(), "Provider configured");
    let mut prober = ModelProber::with_settings(adapter, config.settings());

    let outcome = match args.command {
        Command::Models => list(&prober, &key).await?,
        Command::Probe { models, catalog, json } => {
            probe(&mut prober, &key, models, catalog, json).await?
        }
    };

    // Returning (rather than exiting) lets the credential wipe itself on drop.
    Ok(ExitCode::from(outcome.exit_code()))
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "keyprobe=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn read_key_from_stdin() -> Result<Credential> {
    eprint!("Enter your OpenAI API key (sk-...): ");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read API key from stdin")?;
    Ok(Credential::new(line)?)
}

async fn list(prober: &ModelProber, key: &Credential) -> Result<RunOutcome> {
    let listing = prober.list_models(key).await;
    let mut out = std::io::stdout().lock();
    report::render_model_table(&mut out, &listing)?;
    Ok(if listing.error.is_some() { RunOutcome::Failure } else { RunOutcome::Success })
}

async fn probe(
    prober: &mut ModelProber,
    key: &Credential,
    explicit: Vec<String>,
    use_catalog: bool,
    json: bool,
) -> Result<RunOutcome> {
    let resolved = if use_catalog {
        ResolvedModels {
            models: catalog::fallback_catalog(),
            source: ModelSource::Catalog,
            listing_error: None,
        }
    } else {
        let explicit: Vec<ModelInfo> = explicit.into_iter().map(ModelInfo::from_id).collect();
        // One run per process, so there is never an earlier listing to reuse.
        prober.resolve_models(key, Some(explicit), ListPolicy::Refresh).await
    };

    if !json {
        report::render_resolved(&mut std::io::stdout().lock(), &resolved)?;
    }
    let models = resolved.models;

    let run = if json {
        prober.probe_all_models(key, &models, None).await
    } else {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ProbeUpdate>();
        let owners = models.clone();
        let printer = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                let mut out = std::io::stdout().lock();
                if let Err(e) = report::render_update(&mut out, &update, &owners) {
                    tracing::warn!("Failed to write progress: {}", e);
                }
            }
        });
        let run = prober.probe_all_models(key, &models, Some(&tx)).await;
        drop(tx);
        printer.await.context("Progress printer panicked")?;
        run
    };

    let mut out = std::io::stdout().lock();
    if json {
        report::render_json(&mut out, &run)?;
    } else {
        report::render_summary(&mut out, &run)?;
    }
    Ok(run.outcome())
}
