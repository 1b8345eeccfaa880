use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{Config, Tokens};

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Everything the entry point needs from the environment: the config file
/// path, the per-provider tokens, and the optional Slack webhook.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub tokens: Tokens,
    pub slack_webhook_url: Option<String>,
}

pub fn load_options() -> Result<RunOptions> {
    load_options_with_env(&SystemEnvironment)
}

pub fn load_options_with_env<E: EnvironmentProvider>(env: &E) -> Result<RunOptions> {
    let config_path = env
        .get_var("CONFIG_FILE_PATH")
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("CONFIG_FILE_PATH env var must be set"))?;

    let tokens = Tokens {
        github: non_empty(env.get_var("GITHUB_TOKEN")),
        argocd: non_empty(env.get_var("ARGOCD_TOKEN")),
        snyk: non_empty(env.get_var("SNYK_TOKEN")),
    };

    Ok(RunOptions {
        config_path: PathBuf::from(config_path),
        tokens,
        slack_webhook_url: non_empty(env.get_var("SLACK_WEBHOOK_URL")),
    })
}

/// Read and parse the JSON configuration file.
pub fn read_config(path: &Path) -> Result<Config> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: Config = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

// An empty or whitespace-only token is the same as no token at all.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
