use serde::{Deserialize, Serialize};

fn default_owner() -> String { "spire-panel".to_string() }
fn default_repo() -> String { "glide".to_string() }
fn default_branch() -> String { "main".to_string() }
fn default_api_url() -> String { "https://api.github.com".to_string() }

/// The remote repository this daemon tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoCfg {
    /// Repository owner (user or organization)
    #[serde(default = "default_owner")]
    pub owner: String,
    /// Repository name
    #[serde(default = "default_repo")]
    pub repo: String,
    /// Branch to track (default main)
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Base URL of the hosting provider's REST API
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Clone URL override (optional, e.g. an SSH or local path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_url: Option<String>,
}

impl Default for RepoCfg {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            repo: default_repo(),
            branch: default_branch(),
            api_url: default_api_url(),
            clone_url: None,
        }
    }
}

impl RepoCfg {
    pub fn git_url(&self) -> String {
        match &self.clone_url {
            Some(url) => url.clone(),
            None => format!("https://github.com/{}/{}.git", self.owner, self.repo),
        }
    }

    /// Endpoint answering with the latest commit of the tracked branch.
    pub fn latest_commit_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/commits/{}",
            self.api_url.trim_end_matches('/'),
            self.owner,
            self.repo,
            self.branch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn git_url_defaults_to_github() {
        let repo = RepoCfg::default();
        assert_eq!(repo.git_url(), "https://github.com/spire-panel/glide.git");
    }

    #[test]
    fn clone_url_overrides_git_url() {
        let repo = RepoCfg {
            clone_url: Some("git@example.com:me/app.git".to_string()),
            ..RepoCfg::default()
        };
        assert_eq!(repo.git_url(), "git@example.com:me/app.git");
    }

    #[test]
    fn latest_commit_url_tolerates_trailing_slash() {
        let repo = RepoCfg {
            api_url: "http://localhost:9000/".to_string(),
            branch: "release".to_string(),
            ..RepoCfg::default()
        };
        assert_eq!(
            repo.latest_commit_url(),
            "http://localhost:9000/repos/spire-panel/glide/commits/release"
        );
    }
}
