use anyhow::Result;
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::fetch::{fetch_json, Method};
use crate::format::{capitalize, slack_link};
use crate::services::{passes_all, require_field, Service, ValidationError};
use crate::types::{Config, SectionResult, SnykProjectSpec, VulnLevel};

const DEFAULT_TITLE: &str = ":snyk: *Snyk status:*";
const DEFAULT_VULN_LEVELS: [VulnLevel; 2] = [VulnLevel::Critical, VulnLevel::High];
const SNYK_API_VERSION: &str = "2023-05-29";
const SNYK_REST_API_BASE: &str = "https://api.snyk.io/rest";
const SNYK_V1_API_BASE: &str = "https://snyk.io/api/v1";

#[derive(Debug, Clone, Deserialize)]
pub struct SnykProject {
    pub id: String,
    pub attributes: SnykProjectAttributes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnykProjectAttributes {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct SnykProjectsResponse {
    #[serde(default)]
    data: Vec<SnykProject>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnykIssue {
    pub issue_data: SnykIssueData,
    #[serde(default)]
    pub is_patched: bool,
    #[serde(default)]
    pub is_ignored: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnykIssueData {
    pub id: String,
    pub severity: Option<VulnLevel>,
    pub identifiers: Option<SnykIdentifiers>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnykIdentifiers {
    #[serde(default, rename = "CVE")]
    pub cve: Vec<String>,
    #[serde(default, rename = "CWE")]
    pub cwe: Vec<String>,
}

// The provider pads issue arrays with nulls; those entries carry no data.
#[derive(Debug, Deserialize)]
struct SnykIssuesResponse {
    #[serde(default)]
    issues: Vec<Option<SnykIssue>>,
}

struct ProjectWithIssues {
    project: SnykProject,
    issues: Vec<SnykIssue>,
}

// One (configured project, version) pair and the provider projects whose
// names embed both.
struct ProjectsGroup<'a> {
    project: &'a str,
    origin: &'a str,
    version: &'a str,
    projects: Vec<&'a ProjectWithIssues>,
}

#[derive(Debug, Default, Clone, Copy)]
struct VulnCounts {
    critical: u32,
    high: u32,
    medium: u32,
    low: u32,
}

impl VulnCounts {
    fn add(&mut self, level: VulnLevel) {
        match level {
            VulnLevel::Critical => self.critical += 1,
            VulnLevel::High => self.high += 1,
            VulnLevel::Medium => self.medium += 1,
            VulnLevel::Low => self.low += 1,
        }
    }

    fn get(&self, level: VulnLevel) -> u32 {
        match level {
            VulnLevel::Critical => self.critical,
            VulnLevel::High => self.high,
            VulnLevel::Medium => self.medium,
            VulnLevel::Low => self.low,
        }
    }
}

/// Vulnerability status: open issue counts per configured project+version,
/// with ignore lists applied and a deep-link into the provider's reporting UI.
#[derive(Debug)]
pub struct SnykService {
    token: String,
    title: String,
    organization_id: String,
    organization_name: String,
    api_version: String,
    vuln_levels: Vec<VulnLevel>,
    projects: Vec<SnykProjectSpec>,
    ignored_cves: Vec<String>,
    ignored_cwes: Vec<String>,
    ignored_vuln_ids: Vec<String>,
    rest_base: String,
    v1_base: String,
    client: Client,
}

impl SnykService {
    pub fn new(token: &str, config: &Config, client: Client) -> Result<Self, ValidationError> {
        if token.is_empty() {
            return Err(ValidationError::MissingField { provider: "Snyk", field: "token" });
        }
        let section = config
            .snyk
            .as_ref()
            .ok_or(ValidationError::MissingField { provider: "Snyk", field: "config" })?;
        let organization_id =
            require_field(section.organization_id.as_ref(), "Snyk", "organizationId")?;
        let organization_name =
            require_field(section.organization_name.as_ref(), "Snyk", "organizationName")?;
        if section.projects.is_empty() {
            return Err(ValidationError::NoTargets { provider: "Snyk", targets: "projects" });
        }

        Ok(Self {
            token: token.to_string(),
            title: section.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            organization_id,
            organization_name,
            api_version: section
                .api_version
                .clone()
                .unwrap_or_else(|| SNYK_API_VERSION.to_string()),
            vuln_levels: section
                .vuln_levels
                .clone()
                .unwrap_or_else(|| DEFAULT_VULN_LEVELS.to_vec()),
            projects: section.projects.clone(),
            ignored_cves: section.ignored_cves.clone(),
            ignored_cwes: section.ignored_cwes.clone(),
            ignored_vuln_ids: section.ignored_vuln_ids.clone(),
            rest_base: SNYK_REST_API_BASE.to_string(),
            v1_base: SNYK_V1_API_BASE.to_string(),
            client,
        })
    }

    /// Point the service at different API hosts (mock servers).
    pub fn with_base_urls(
        mut self,
        rest_base: impl Into<String>,
        v1_base: impl Into<String>,
    ) -> Self {
        self.rest_base = rest_base.into();
        self.v1_base = v1_base.into();
        self
    }

    async fn fetch_projects(&self) -> Result<Vec<SnykProject>> {
        let url = format!(
            "{}/orgs/{}/projects?version={}&limit=100",
            self.rest_base, self.organization_id, self.api_version
        );
        let response: SnykProjectsResponse =
            fetch_json(&self.client, &url, &self.auth_header(), Method::Get).await?;
        Ok(response.data)
    }

    async fn fetch_project_issues(&self, project_id: &str) -> Result<Vec<SnykIssue>> {
        let url = format!(
            "{}/org/{}/project/{}/aggregated-issues",
            self.v1_base, self.organization_name, project_id
        );
        let response: SnykIssuesResponse =
            fetch_json(&self.client, &url, &self.auth_header(), Method::Post).await?;
        Ok(self.filter_issues(response.issues.into_iter().flatten().collect()))
    }

    fn auth_header(&self) -> String {
        format!("token {}", self.token)
    }

    /// Drop issues already resolved by the provider or matching one of the
    /// three independent ignore lists.
    fn filter_issues(&self, issues: Vec<SnykIssue>) -> Vec<SnykIssue> {
        let not_resolved = |issue: &SnykIssue| !issue.is_ignored && !issue.is_patched;
        let no_ignored_cve = |issue: &SnykIssue| {
            !self.ignored_cves.iter().any(|cve| {
                issue
                    .issue_data
                    .identifiers
                    .as_ref()
                    .map_or(false, |identifiers| identifiers.cve.contains(cve))
            })
        };
        let no_ignored_cwe = |issue: &SnykIssue| {
            !self.ignored_cwes.iter().any(|cwe| {
                issue
                    .issue_data
                    .identifiers
                    .as_ref()
                    .map_or(false, |identifiers| identifiers.cwe.contains(cwe))
            })
        };
        let no_ignored_id =
            |issue: &SnykIssue| !self.ignored_vuln_ids.iter().any(|id| issue.issue_data.id == *id);
        let filters: [&dyn Fn(&SnykIssue) -> bool; 4] =
            [&not_resolved, &no_ignored_cve, &no_ignored_cwe, &no_ignored_id];

        issues
            .into_iter()
            .filter(|issue| passes_all(&filters, issue))
            .collect()
    }

    // Provider project names embed both the project and the version label,
    // so both are matched as substrings rather than exactly.
    fn matches_config(&self, name: &str) -> bool {
        self.projects.iter().any(|spec| {
            spec.versions.iter().any(|version| {
                name.contains(spec.project.as_str()) && name.contains(version.as_str())
            })
        })
    }

    fn group_projects<'a>(&'a self, retained: &[&'a ProjectWithIssues]) -> Vec<ProjectsGroup<'a>> {
        let mut groups = Vec::new();
        for spec in &self.projects {
            for version in &spec.versions {
                let members = retained
                    .iter()
                    .copied()
                    .filter(|candidate| {
                        let name = &candidate.project.attributes.name;
                        name.contains(spec.project.as_str()) && name.contains(version.as_str())
                    })
                    .collect();
                groups.push(ProjectsGroup {
                    project: spec.project.as_str(),
                    origin: spec.origin.as_str(),
                    version: version.as_str(),
                    projects: members,
                });
            }
        }
        groups
    }

    fn format_group(&self, group: &ProjectsGroup<'_>) -> String {
        let mut counts = VulnCounts::default();
        for project in &group.projects {
            for issue in &project.issues {
                if let Some(severity) = issue.issue_data.severity {
                    counts.add(severity);
                }
            }
        }

        let summary = self
            .vuln_levels
            .iter()
            .map(|level| format!("{} {}", counts.get(*level), capitalize(level.as_str())))
            .collect::<Vec<_>>()
            .join(", ");
        slack_link(&self.reporting_url(group), &format!("{}: {summary}", group.version))
    }

    fn reporting_url(&self, group: &ProjectsGroup<'_>) -> String {
        let levels = self
            .vuln_levels
            .iter()
            .map(|level| format!("\"{}\"", capitalize(level.as_str())))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "https://app.snyk.io/org/{}/reporting?context[page]=issues-detail&project_target={}&project_origin={}&target_ref=[\"{}\"]&v=1&issue_status=Open&issue_by=Severity&issue_severity=[{}]",
            self.organization_name, group.project, group.origin, group.version, levels
        )
    }
}

#[async_trait]
impl Service for SnykService {
    async fn get_result(&self) -> Result<SectionResult> {
        let projects = self.fetch_projects().await?;
        debug!("fetched {} snyk projects", projects.len());

        let with_issues: Vec<ProjectWithIssues> =
            try_join_all(projects.into_iter().map(|project| async move {
                let issues = self.fetch_project_issues(&project.id).await?;
                Ok::<_, anyhow::Error>(ProjectWithIssues { project, issues })
            }))
            .await?;

        let retained: Vec<&ProjectWithIssues> = with_issues
            .iter()
            .filter(|candidate| self.matches_config(&candidate.project.attributes.name))
            .collect();
        debug!("{} projects match the configured targets", retained.len());

        let messages = self
            .group_projects(&retained)
            .iter()
            .filter(|group| !group.projects.is_empty())
            .map(|group| self.format_group(group))
            .collect();

        Ok(SectionResult { title: self.title.clone(), messages })
    }
}
