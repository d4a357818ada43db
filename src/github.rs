use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::GithubConfig;
use crate::projects::error::{ProjectError, ProjectResult};

/// Repository metadata as reported by the GitHub API.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRepoMetadata {
    pub name: String,
    pub description: String,
    pub html_url: String,
    pub owner_login: String,
    pub owner_avatar: String,
    pub language: String,
    pub stars: i64,
    pub created_at: Option<String>,
}

#[async_trait]
pub trait RepoFetcher: Send + Sync {
    async fn fetch_repo(&self, owner: &str, repo: &str) -> ProjectResult<RemoteRepoMetadata>;
}

#[derive(Debug, Deserialize)]
struct GithubRepo {
    name: String,
    description: Option<String>,
    html_url: String,
    #[serde(default)]
    stargazers_count: i64,
    language: Option<String>,
    owner: GithubOwner,
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubOwner {
    login: String,
    #[serde(default)]
    avatar_url: String,
}

impl From<GithubRepo> for RemoteRepoMetadata {
    fn from(r: GithubRepo) -> Self {
        Self {
            name: r.name,
            description: r.description.unwrap_or_default(),
            html_url: r.html_url,
            owner_login: r.owner.login,
            owner_avatar: r.owner.avatar_url,
            language: r.language.unwrap_or_default(),
            stars: r.stargazers_count,
            created_at: r.created_at,
        }
    }
}

#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build GitHub HTTP client")?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl RepoFetcher for GithubClient {
    async fn fetch_repo(&self, owner: &str, repo: &str) -> ProjectResult<RemoteRepoMetadata> {
        let url = format!("{}/repos/{}/{}", self.api_url, owner, repo);

        let mut req = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let res = req
            .send()
            .await
            .map_err(|e| ProjectError::RemoteUnreachable(e.to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ProjectError::RemoteUnreachable(e.to_string()))?;

        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "GitHub lookup failed");
            return Err(ProjectError::RemoteLookupFailed {
                status: status.as_u16(),
                body,
            });
        }

        let repo: GithubRepo = serde_json::from_str(&body)
            .map_err(|e| ProjectError::RemoteDecodeFailed(e.to_string()))?;
        debug!(name = %repo.name, owner = %repo.owner.login, stars = repo.stargazers_count, "fetched repo");

        Ok(repo.into())
    }
}
