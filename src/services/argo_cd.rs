use anyhow::Result;
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::fetch::{fetch_json, Method};
use crate::format::slack_link;
use crate::services::{require_field, Service, ValidationError};
use crate::types::{Config, SectionResult};

const DEFAULT_TITLE: &str = ":argocd: *ArgoCD envs status:*";

#[derive(Debug, Clone, Deserialize)]
pub struct ArgoApplication {
    pub status: ArgoApplicationStatus,
    pub metadata: ArgoApplicationMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArgoApplicationStatus {
    pub health: ArgoApplicationHealth,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArgoApplicationHealth {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArgoApplicationMetadata {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ArgoApplicationsResponse {
    #[serde(default)]
    items: Vec<ArgoApplication>,
}

/// GitOps health: one line per application across the configured projects.
/// A missing token yields an empty section rather than an error.
#[derive(Debug)]
pub struct ArgoCdService {
    token: Option<String>,
    title: String,
    url: String,
    projects: Vec<String>,
    client: Client,
}

impl ArgoCdService {
    pub fn new(token: Option<&str>, config: &Config, client: Client) -> Result<Self, ValidationError> {
        let section = config
            .argo_cd
            .as_ref()
            .ok_or(ValidationError::MissingField { provider: "Argo", field: "config" })?;
        let url = require_field(section.url.as_ref(), "Argo", "api Url")?;
        if section.projects.is_empty() {
            return Err(ValidationError::MissingList { provider: "Argo", field: "projects" });
        }

        Ok(Self {
            token: token.filter(|t| !t.is_empty()).map(str::to_string),
            title: section.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            url,
            projects: section.projects.clone(),
            client,
        })
    }

    async fn fetch_applications(&self, project: &str, token: &str) -> Result<ArgoApplicationsResponse> {
        let url = format!("{}/api/v1/applications?projects={project}", self.url);
        fetch_json(&self.client, &url, &format!("Bearer {token}"), Method::Get).await
    }

    fn parse_message(&self, application: &ArgoApplication) -> String {
        let healthy = application.status.health.status == "Healthy";
        let glyph = if healthy { "🟢" } else { "🔴" };
        let name = &application.metadata.name;
        let link = slack_link(&format!("{}/applications/argocd/{name}", self.url), name);
        format!("{glyph} {link}")
    }
}

#[async_trait]
impl Service for ArgoCdService {
    async fn get_result(&self) -> Result<SectionResult> {
        let Some(token) = &self.token else {
            return Ok(SectionResult { title: self.title.clone(), messages: Vec::new() });
        };

        let responses = try_join_all(
            self.projects
                .iter()
                .map(|project| self.fetch_applications(project, token)),
        )
        .await?;
        debug!("fetched applications for {} projects", responses.len());

        let messages = responses
            .iter()
            .flat_map(|response| &response.items)
            .map(|application| self.parse_message(application))
            .collect();

        Ok(SectionResult { title: self.title.clone(), messages })
    }
}
