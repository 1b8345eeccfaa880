use anyhow::Result;
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::fetch::{fetch_json, Method};
use crate::format::slack_link;
use crate::services::{require_field, Service, ValidationError};
use crate::types::{Config, SectionResult, WorkflowTarget};

const DEFAULT_TITLE: &str = ":github: *GH actions status:*";
const GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    pub html_url: String,
    pub name: String,
    pub head_branch: String,
    pub status: String,
    pub conclusion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRunsResponse {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

/// CI status: the most recent completed run per configured workflow/branch.
#[derive(Debug)]
pub struct GithubActionsService {
    token: String,
    title: String,
    organization: String,
    repository: String,
    default_branch: Option<String>,
    workflows: Vec<WorkflowTarget>,
    base_url: String,
    client: Client,
}

impl GithubActionsService {
    pub fn new(token: &str, config: &Config, client: Client) -> Result<Self, ValidationError> {
        if token.is_empty() {
            return Err(ValidationError::MissingField { provider: "Github", field: "token" });
        }
        let section = config
            .github
            .as_ref()
            .ok_or(ValidationError::MissingField { provider: "Github", field: "config" })?;
        let organization = require_field(section.organization.as_ref(), "Github", "organization")?;
        let repository = require_field(section.repository.as_ref(), "Github", "repository")?;
        if section.workflows.is_empty() {
            return Err(ValidationError::NoTargets { provider: "Github", targets: "workflows" });
        }

        Ok(Self {
            token: token.to_string(),
            title: section.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            organization,
            repository,
            default_branch: section.default_branch.clone(),
            workflows: section.workflows.clone(),
            base_url: GITHUB_API_BASE.to_string(),
            client,
        })
    }

    /// Point the service at a different API host (mock servers, GHE).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// One fetch per (workflow, branch) pair. Targets without an explicit
    /// branch list fall back to the default branch, or an unscoped fetch.
    fn expand_targets(&self) -> Vec<(String, Option<String>)> {
        let mut targets = Vec::new();
        for workflow in &self.workflows {
            match workflow {
                WorkflowTarget::Name(name) => {
                    targets.push((name.clone(), self.default_branch.clone()));
                }
                WorkflowTarget::Spec { name, branches: Some(branches) } if !branches.is_empty() => {
                    for branch in branches {
                        targets.push((name.clone(), Some(branch.clone())));
                    }
                }
                WorkflowTarget::Spec { name, .. } => {
                    targets.push((name.clone(), self.default_branch.clone()));
                }
            }
        }
        targets
    }

    async fn fetch_workflow_runs(
        &self,
        workflow: &str,
        branch: Option<&str>,
    ) -> Result<WorkflowRunsResponse> {
        let mut url = format!(
            "{}/repos/{}/{}/actions/workflows/{workflow}.yml/runs",
            self.base_url, self.organization, self.repository
        );
        if let Some(branch) = branch {
            url.push_str(&format!("?branch={branch}"));
        }
        fetch_json(&self.client, &url, &format!("token {}", self.token), Method::Get).await
    }
}

fn parse_message(run: &WorkflowRun) -> String {
    let successful = run.status == "completed" && run.conclusion.as_deref() == Some("success");
    let glyph = if successful { "🟢" } else { "🔴" };
    let label = format!("{} ({})", run.name, run.head_branch);
    format!("{glyph} {}", slack_link(&run.html_url, &label))
}

#[async_trait]
impl Service for GithubActionsService {
    async fn get_result(&self) -> Result<SectionResult> {
        let targets = self.expand_targets();
        let responses = try_join_all(
            targets
                .iter()
                .map(|(workflow, branch)| self.fetch_workflow_runs(workflow, branch.as_deref())),
        )
        .await?;
        debug!("fetched runs for {} workflow targets", responses.len());

        // Most recent run that is not still in progress; skip the target
        // entirely when every run is in flight.
        let messages = responses
            .iter()
            .filter_map(|response| {
                response
                    .workflow_runs
                    .iter()
                    .find(|run| run.status != "in_progress")
            })
            .map(parse_message)
            .collect();

        Ok(SectionResult { title: self.title.clone(), messages })
    }
}
