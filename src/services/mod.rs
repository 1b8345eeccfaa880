pub mod argo_cd;
pub mod github_actions;
pub mod github_prs;
pub mod snyk;

pub use argo_cd::ArgoCdService;
pub use github_actions::GithubActionsService;
pub use github_prs::GithubPrsService;
pub use snyk::SnykService;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::types::{Config, SectionResult, Tokens};

/// One external status source. Implementations validate their configuration
/// slice at construction, before any network access, and fetch on demand.
#[async_trait]
pub trait Service: Send + Sync + std::fmt::Debug {
    async fn get_result(&self) -> Result<SectionResult>;
}

/// Configuration problems, surfaced by service constructors with the
/// provider-prefixed messages the report consumers grep for.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{provider}: {field} is missing")]
    MissingField {
        provider: &'static str,
        field: &'static str,
    },
    #[error("{provider}: {field} are missing")]
    MissingList {
        provider: &'static str,
        field: &'static str,
    },
    #[error("{provider}: no {targets} were passed to be checked")]
    NoTargets {
        provider: &'static str,
        targets: &'static str,
    },
}

/// Evaluate a sequence of predicates with logical AND.
pub(crate) fn passes_all<T>(filters: &[&dyn Fn(&T) -> bool], item: &T) -> bool {
    filters.iter().all(|filter| filter(item))
}

// A present-but-empty config value counts as missing.
pub(crate) fn require_field(
    value: Option<&String>,
    provider: &'static str,
    field: &'static str,
) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.clone()),
        _ => Err(ValidationError::MissingField { provider, field }),
    }
}

/// Build the service list for one run. A provider is included only when its
/// token is present; the GitHub-backed services additionally require their
/// config section, matching how the host supplies optional credentials.
pub fn build_services(
    config: &Config,
    tokens: &Tokens,
    client: &Client,
) -> Result<Vec<Box<dyn Service>>, ValidationError> {
    let mut services: Vec<Box<dyn Service>> = Vec::new();

    if let Some(github_token) = &tokens.github {
        if config.github.is_some() {
            services.push(Box::new(GithubActionsService::new(
                github_token,
                config,
                client.clone(),
            )?));
        }
        if config.github_prs.is_some() {
            services.push(Box::new(GithubPrsService::new(
                github_token,
                config,
                client.clone(),
            )?));
        }
    }
    if tokens.argocd.is_some() {
        services.push(Box::new(ArgoCdService::new(
            tokens.argocd.as_deref(),
            config,
            client.clone(),
        )?));
    }
    if let Some(snyk_token) = &tokens.snyk {
        services.push(Box::new(SnykService::new(snyk_token, config, client.clone())?));
    }

    Ok(services)
}
