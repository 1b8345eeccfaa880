use serde::Deserialize;

/// Root configuration, parsed from a JSON file. One optional section per
/// provider; a missing section simply means that provider is never run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub github: Option<GithubConfig>,
    pub github_prs: Option<GithubPrsConfig>,
    pub argo_cd: Option<ArgoCdConfig>,
    pub snyk: Option<SnykConfig>,
}

/// CI status section: which workflows (and branches) to report on.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubConfig {
    pub title: Option<String>,
    pub organization: Option<String>,
    pub repository: Option<String>,
    pub default_branch: Option<String>,
    #[serde(default)]
    pub workflows: Vec<WorkflowTarget>,
}

/// A workflow to check: either a bare workflow file id, or an id plus an
/// explicit list of branches (one status line per branch).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WorkflowTarget {
    Name(String),
    Spec {
        name: String,
        branches: Option<Vec<String>>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgoCdConfig {
    pub title: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub projects: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubPrsConfig {
    pub title: Option<String>,
    pub organization: Option<String>,
    pub repository: Option<String>,
    #[serde(default)]
    pub prs: Vec<PrGroupConfig>,
}

/// One pull-request filter group. All fields are optional; the configured
/// ones both narrow the result set and name the group in the report.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrGroupConfig {
    pub author: Option<String>,
    pub base: Option<String>,
    pub labels: Option<Vec<String>>,
    pub state: Option<String>,
    pub title: Option<String>,
    pub result_type: Option<ResultType>,
}

/// How a PR group is rendered: every matching PR, or just how many there are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    #[default]
    List,
    Count,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnykConfig {
    pub title: Option<String>,
    pub organization_id: Option<String>,
    pub organization_name: Option<String>,
    pub api_version: Option<String>,
    pub vuln_levels: Option<Vec<VulnLevel>>,
    #[serde(default)]
    pub projects: Vec<SnykProjectSpec>,
    #[serde(default, rename = "ignoredCVEs")]
    pub ignored_cves: Vec<String>,
    #[serde(default, rename = "ignoredCWEs")]
    pub ignored_cwes: Vec<String>,
    #[serde(default)]
    pub ignored_vuln_ids: Vec<String>,
}

/// A vulnerability target: provider project names embed both the project and
/// the version label, so both are matched as substrings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnykProjectSpec {
    pub project: String,
    pub origin: String,
    #[serde(default)]
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VulnLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl VulnLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            VulnLevel::Critical => "critical",
            VulnLevel::High => "high",
            VulnLevel::Medium => "medium",
            VulnLevel::Low => "low",
        }
    }
}

/// Per-provider bearer tokens, read from the environment at startup. A
/// missing token means that provider's service is never constructed.
#[derive(Debug, Clone, Default)]
pub struct Tokens {
    pub github: Option<String>,
    pub argocd: Option<String>,
    pub snyk: Option<String>,
}

/// One provider's contribution to the report. An empty message list means
/// the section is omitted entirely, title included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionResult {
    pub title: String,
    pub messages: Vec<String>,
}
