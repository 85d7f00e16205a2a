//! Layered configuration: defaults, then YAML file, then environment,
//! then command-line flags (applied by the binary).
//!
//! The API key is deliberately not a config field. It comes from the
//! command line, `OPENAI_API_KEY` or stdin.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapters::openai::{OpenAIAdapter, DEFAULT_BASE_URL};
use crate::discovery::catalog;
use crate::discovery::prober::ProbeSettings;

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "KEYPROBE_BASE_URL";
pub const ENV_MAX_TOKENS: &str = "KEYPROBE_MAX_TOKENS";
pub const ENV_TEMPERATURE: &str = "KEYPROBE_TEMPERATURE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    pub base_url: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Per-request timeout. Unset means the HTTP client default (none).
    pub timeout_secs: Option<u64>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            prompt: catalog::PROBE_PROMPT.to_string(),
            max_tokens: catalog::PROBE_MAX_TOKENS,
            temperature: catalog::PROBE_TEMPERATURE,
            timeout_secs: None,
        }
    }
}

impl ProbeConfig {
    /// `<config_dir>/keyprobe/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("keyprobe").join("config.yaml"))
    }

    /// Load from an explicit path (must exist) or the default path
    /// (optional), then apply the environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|k| std::env::var(k).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Override fields from environment variables, read through `lookup`.
    /// Blank values count as unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_MAX_TOKENS) {
            self.max_tokens = raw.trim().parse()
                .with_context(|| format!("{} is not a positive integer: {:?}", ENV_MAX_TOKENS, raw))?;
        }
        if let Some(raw) = lookup(ENV_TEMPERATURE) {
            self.temperature = raw.trim().parse()
                .with_context(|| format!("{} is not a number: {:?}", ENV_TEMPERATURE, raw))?;
        }
        Ok(())
    }

    pub fn settings(&self) -> ProbeSettings {
        ProbeSettings {
            prompt: self.prompt.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    pub fn adapter(&self) -> Result<OpenAIAdapter> {
        match self.timeout_secs {
            Some(secs) => OpenAIAdapter::with_timeout(&self.base_url, Duration::from_secs(secs))
                .context("Failed to build HTTP client"),
            None => Ok(OpenAIAdapter::with_base_url(&self.base_url)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_probe_constants() {
        let config = ProbeConfig::default();
        assert_eq!(config.base_url, "https://api.openai.com");
        assert_eq!(config.max_tokens, 50);
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.timeout_secs, None);
        assert_eq!(config.settings(), ProbeSettings::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "base_url: http://localhost:8080\ntimeout_secs: 30\n").unwrap();

        let config = ProbeConfig::from_file(&path).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout_secs, Some(30));
        assert_eq!(config.prompt, catalog::PROBE_PROMPT);
    }

    #[test]
    fn test_unknown_yaml_field_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "api_key: sk-should-not-be-here\n").unwrap();
        assert!(ProbeConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProbeConfig::load(Some(&dir.path().join("nope.yaml"))).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_BASE_URL, " http://proxy.local "),
            (ENV_MAX_TOKENS, "16"),
            (ENV_TEMPERATURE, "0.2"),
        ].into_iter().collect();

        let mut config = ProbeConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.base_url, "http://proxy.local");
        assert_eq!(config.max_tokens, 16);
        assert_eq!(config.temperature, 0.2);
    }

    #[test]
    fn test_env_rejects_garbage() {
        let mut config = ProbeConfig::default();
        let err = config.apply_env(|k| (k == ENV_MAX_TOKENS).then(|| "lots".to_string()));
        assert!(err.is_err());
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config = ProbeConfig::default();
        config.apply_env(|k| match k {
            ENV_MAX_TOKENS => Some(String::new()),
            ENV_TEMPERATURE => Some("  ".to_string()),
            ENV_BASE_URL => Some("\t".to_string()),
            _ => None,
        }).unwrap();
        let defaults = ProbeConfig::default();
        assert_eq!(config.max_tokens, defaults.max_tokens);
        assert_eq!(config.temperature, defaults.temperature);
        assert_eq!(config.base_url, defaults.base_url);
    }
}
