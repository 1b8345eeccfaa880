use anyhow::Result;
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::fetch::{fetch_json, Method};
use crate::format::{encode_uri, slack_link};
use crate::services::{passes_all, require_field, Service, ValidationError};
use crate::types::{Config, PrGroupConfig, ResultType, SectionResult};

const DEFAULT_TITLE: &str = ":github: *GH PRs summary:*";
const GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub url: String,
    pub title: String,
    pub user: PrAuthor,
    #[serde(default)]
    pub labels: Vec<PrLabel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrAuthor {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrLabel {
    pub name: String,
}

/// Pull-request summary: one block per configured filter group, rendered as
/// a full listing or a bare count with a deep-link into GitHub search.
#[derive(Debug)]
pub struct GithubPrsService {
    token: String,
    title: String,
    organization: String,
    repository: String,
    groups: Vec<PrGroupConfig>,
    base_url: String,
    client: Client,
}

impl GithubPrsService {
    pub fn new(token: &str, config: &Config, client: Client) -> Result<Self, ValidationError> {
        if token.is_empty() {
            return Err(ValidationError::MissingField { provider: "Github", field: "token" });
        }
        let section = config
            .github_prs
            .as_ref()
            .ok_or(ValidationError::MissingField { provider: "Github", field: "config" })?;
        let organization = require_field(section.organization.as_ref(), "Github", "organization")?;
        let repository = require_field(section.repository.as_ref(), "Github", "repository")?;
        if section.prs.is_empty() {
            return Err(ValidationError::NoTargets { provider: "Github", targets: "prs" });
        }

        Ok(Self {
            token: token.to_string(),
            title: section.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            organization,
            repository,
            groups: section.prs.clone(),
            base_url: GITHUB_API_BASE.to_string(),
            client,
        })
    }

    /// Point the service at a different API host (mock servers, GHE).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_group(&self, group: &PrGroupConfig) -> Result<Vec<PullRequest>> {
        let mut params: Vec<(&str, String)> = vec![
            ("per_page", "100".to_string()),
            ("pulls", "false".to_string()),
        ];
        if let Some(author) = &group.author {
            params.push(("author", author.clone()));
        }
        if let Some(base) = &group.base {
            params.push(("base", base.clone()));
        }
        if let Some(labels) = &group.labels {
            if !labels.is_empty() {
                params.push(("labels", labels.join(",")));
            }
        }
        if let Some(state) = &group.state {
            params.push(("state", state.clone()));
        }

        let url = reqwest::Url::parse_with_params(
            &format!(
                "{}/repos/{}/{}/pulls",
                self.base_url, self.organization, self.repository
            ),
            &params,
        )?;
        fetch_json(&self.client, url.as_str(), &format!("token {}", self.token), Method::Get).await
    }

    /// GitHub search deep-link for a group, composing qualifiers in fixed
    /// order: state, author (bots become `app/` qualifiers), base, labels.
    fn group_search_url(&self, group: &PrGroupConfig) -> String {
        let mut qualifiers: Vec<String> = Vec::new();
        if let Some(state) = &group.state {
            qualifiers.push(format!("is:{state}"));
        }
        if let Some(author) = &group.author {
            let qualifier = match author.strip_suffix("[bot]") {
                Some(app) => format!("author:\"app/{app}\""),
                None => format!("author:\"{author}\""),
            };
            qualifiers.push(qualifier);
        }
        if let Some(base) = &group.base {
            qualifiers.push(format!("base:{base}"));
        }
        if let Some(labels) = &group.labels {
            for label in labels {
                qualifiers.push(format!("label:\"{}\"", label.replace(' ', "+")));
            }
        }
        format!(
            "https://github.com/{}/{}/pulls?q={}",
            self.organization,
            self.repository,
            encode_uri(&qualifiers.join("+"))
        )
    }

    fn group_messages(&self, group: &PrGroupConfig, prs: &[&PullRequest]) -> Vec<String> {
        let link = slack_link(&self.group_search_url(group), &group_label(group));
        match group.result_type.unwrap_or_default() {
            ResultType::Count => vec![format!("{link}: {}", prs.len())],
            ResultType::List => {
                let mut lines = vec![format!("{link}:{}", if prs.is_empty() { " 0" } else { "" })];
                lines.extend(prs.iter().map(|pr| slack_link(&pr.url, &pr.title)));
                lines
            }
        }
    }
}

/// Display label for a group: the explicit title verbatim, otherwise every
/// configured filter field as `key: value`.
fn group_label(group: &PrGroupConfig) -> String {
    if let Some(title) = &group.title {
        return title.clone();
    }
    let mut parts: Vec<String> = Vec::new();
    if let Some(author) = &group.author {
        parts.push(format!("author: {author}"));
    }
    if let Some(base) = &group.base {
        parts.push(format!("base: {base}"));
    }
    if let Some(labels) = &group.labels {
        if !labels.is_empty() {
            parts.push(format!("labels: [{}]", labels.join(", ")));
        }
    }
    if let Some(state) = &group.state {
        parts.push(format!("state: {state}"));
    }
    parts.join(" ")
}

#[async_trait]
impl Service for GithubPrsService {
    async fn get_result(&self) -> Result<SectionResult> {
        let fetched = try_join_all(self.groups.iter().map(|group| async move {
            let prs = self.fetch_group(group).await?;
            Ok::<_, anyhow::Error>((group, prs))
        }))
        .await?;
        debug!("fetched {} PR groups", fetched.len());

        let messages = fetched
            .iter()
            .flat_map(|(group, prs)| {
                let matches_author = |pr: &PullRequest| {
                    group
                        .author
                        .as_deref()
                        .map_or(true, |author| pr.user.login == author)
                };
                let matches_labels = |pr: &PullRequest| match group.labels.as_deref() {
                    Some(labels) if !labels.is_empty() => labels
                        .iter()
                        .all(|label| pr.labels.iter().any(|pr_label| pr_label.name == *label)),
                    _ => true,
                };
                let filters: [&dyn Fn(&PullRequest) -> bool; 2] = [&matches_author, &matches_labels];
                let matching: Vec<&PullRequest> =
                    prs.iter().filter(|pr| passes_all(&filters, pr)).collect();
                self.group_messages(group, &matching)
            })
            .collect();

        Ok(SectionResult { title: self.title.clone(), messages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GithubPrsConfig;

    fn config_with(section: GithubPrsConfig) -> Config {
        Config { github_prs: Some(section), ..Default::default() }
    }

    fn base_section() -> GithubPrsConfig {
        GithubPrsConfig {
            organization: Some("org".to_string()),
            repository: Some("repo".to_string()),
            prs: vec![PrGroupConfig {
                author: Some("author".to_string()),
                base: Some("main".to_string()),
                labels: Some(vec!["label1".to_string(), "label2".to_string()]),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn service() -> GithubPrsService {
        GithubPrsService::new("token", &config_with(base_section()), Client::new()).unwrap()
    }

    fn pr(login: &str, labels: &[&str]) -> PullRequest {
        PullRequest {
            url: "example.com".to_string(),
            title: "This is an awesome feature PR".to_string(),
            user: PrAuthor { login: login.to_string() },
            labels: labels
                .iter()
                .map(|name| PrLabel { name: name.to_string() })
                .collect(),
        }
    }

    #[test]
    fn test_missing_token() {
        let err = GithubPrsService::new("", &Config::default(), Client::new()).unwrap_err();
        assert_eq!(err.to_string(), "Github: token is missing");
    }

    #[test]
    fn test_missing_config() {
        let err = GithubPrsService::new("token", &Config::default(), Client::new()).unwrap_err();
        assert_eq!(err.to_string(), "Github: config is missing");
    }

    #[test]
    fn test_missing_organization() {
        let config = config_with(GithubPrsConfig::default());
        let err = GithubPrsService::new("token", &config, Client::new()).unwrap_err();
        assert_eq!(err.to_string(), "Github: organization is missing");
    }

    #[test]
    fn test_missing_repository() {
        let config = config_with(GithubPrsConfig {
            organization: Some("org".to_string()),
            ..Default::default()
        });
        let err = GithubPrsService::new("token", &config, Client::new()).unwrap_err();
        assert_eq!(err.to_string(), "Github: repository is missing");
    }

    #[test]
    fn test_missing_prs() {
        let config = config_with(GithubPrsConfig {
            organization: Some("org".to_string()),
            repository: Some("repo".to_string()),
            ..Default::default()
        });
        let err = GithubPrsService::new("token", &config, Client::new()).unwrap_err();
        assert_eq!(err.to_string(), "Github: no prs were passed to be checked");
    }

    #[test]
    fn test_group_label_derived_from_fields() {
        let group = PrGroupConfig {
            author: Some("author".to_string()),
            base: Some("main".to_string()),
            labels: Some(vec!["label1".to_string(), "label2".to_string()]),
            ..Default::default()
        };
        assert_eq!(group_label(&group), "author: author base: main labels: [label1, label2]");
    }

    #[test]
    fn test_group_label_explicit_title_wins() {
        let group = PrGroupConfig {
            author: Some("author".to_string()),
            title: Some("This is a title".to_string()),
            ..Default::default()
        };
        assert_eq!(group_label(&group), "This is a title");
    }

    #[test]
    fn test_group_search_url() {
        let group = PrGroupConfig {
            author: Some("author".to_string()),
            base: Some("main".to_string()),
            labels: Some(vec!["label1".to_string(), "label2".to_string()]),
            ..Default::default()
        };
        assert_eq!(
            service().group_search_url(&group),
            "https://github.com/org/repo/pulls?q=author:%22author%22+base:main+label:%22label1%22+label:%22label2%22"
        );
    }

    #[test]
    fn test_group_search_url_rewrites_bot_authors() {
        let group = PrGroupConfig {
            author: Some("renovate[bot]".to_string()),
            state: Some("open".to_string()),
            ..Default::default()
        };
        assert_eq!(
            service().group_search_url(&group),
            "https://github.com/org/repo/pulls?q=is:open+author:%22app/renovate%22"
        );
    }

    #[test]
    fn test_group_search_url_replaces_label_spaces() {
        let group = PrGroupConfig {
            labels: Some(vec!["needs review".to_string()]),
            ..Default::default()
        };
        assert_eq!(
            service().group_search_url(&group),
            "https://github.com/org/repo/pulls?q=label:%22needs+review%22"
        );
    }

    #[test]
    fn test_group_search_url_empty_group() {
        let group = PrGroupConfig::default();
        assert_eq!(
            service().group_search_url(&group),
            "https://github.com/org/repo/pulls?q="
        );
    }

    #[test]
    fn test_group_messages_list_mode() {
        let group = PrGroupConfig {
            author: Some("author".to_string()),
            base: Some("main".to_string()),
            labels: Some(vec!["label1".to_string(), "label2".to_string()]),
            ..Default::default()
        };
        let matching = pr("author", &["label1", "label2"]);

        let messages = service().group_messages(&group, &[&matching]);
        assert_eq!(
            messages,
            vec![
                "<https://github.com/org/repo/pulls?q=author:%22author%22+base:main+label:%22label1%22+label:%22label2%22|author: author base: main labels: [label1, label2]>:",
                "<example.com|This is an awesome feature PR>",
            ]
        );
    }

    #[test]
    fn test_group_messages_list_mode_zero_suffix() {
        let group = PrGroupConfig {
            author: Some("author".to_string()),
            ..Default::default()
        };
        let messages = service().group_messages(&group, &[]);
        assert_eq!(
            messages,
            vec!["<https://github.com/org/repo/pulls?q=author:%22author%22|author: author>: 0"]
        );
    }

    #[test]
    fn test_group_messages_count_mode() {
        let group = PrGroupConfig {
            title: Some("This is a title".to_string()),
            result_type: Some(ResultType::Count),
            ..Default::default()
        };
        let messages = service().group_messages(&group, &[]);
        assert_eq!(
            messages,
            vec!["<https://github.com/org/repo/pulls?q=|This is a title>: 0"]
        );
    }

    #[test]
    fn test_title_override() {
        let mut section = base_section();
        section.title = Some("new title".to_string());
        let service =
            GithubPrsService::new("token", &config_with(section), Client::new()).unwrap();
        assert_eq!(service.title, "new title");
    }
}
