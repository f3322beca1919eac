use super::errors::ResolveError;
use super::repo_config::RepoCfg;
use async_trait::async_trait;
use log::debug;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Optional token for private repositories and higher rate limits.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Looks up the current tip revision of the tracked branch.
#[async_trait]
pub trait RevisionResolver: Send + Sync {
    async fn resolve_tip(&self, repo: &RepoCfg) -> Result<String, ResolveError>;
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: Option<String>,
}

/// Resolves tips through the GitHub REST API ("get a commit" for a branch).
pub struct GithubResolver {
    client: Client,
    token: Option<String>,
}

impl GithubResolver {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            token: std::env::var(GITHUB_TOKEN_ENV).ok().filter(|t| !t.is_empty()),
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

#[async_trait]
impl RevisionResolver for GithubResolver {
    async fn resolve_tip(&self, repo: &RepoCfg) -> Result<String, ResolveError> {
        let url = repo.latest_commit_url();
        debug!("Resolving tip of '{}' via {url}", repo.branch);

        let mut request = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| ResolveError::Http {
            url: url.clone(),
            source,
        })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
                return Err(ResolveError::UnknownBranch {
                    branch: repo.branch.clone(),
                })
            }
            status => {
                return Err(ResolveError::Status {
                    url,
                    status: status.as_u16(),
                })
            }
        }

        let body = response.text().await.map_err(|source| ResolveError::Http {
            url: url.clone(),
            source,
        })?;
        let commit: CommitResponse = serde_json::from_str(&body)
            .map_err(|e| ResolveError::Malformed(format!("{url}: {e}")))?;

        match commit.sha.map(|sha| sha.trim().to_string()) {
            Some(sha) if !sha.is_empty() => Ok(sha),
            _ => Err(ResolveError::Malformed(format!("{url}: no commit sha in response"))),
        }
    }
}
