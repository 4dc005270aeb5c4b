use std::time::Duration;

/// Default GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Identity and credentials of the repository holding the documents.
///
/// Fixed for the lifetime of the client.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: String,
    pub token: Option<String>,
    pub api_url: String,
    pub timeout: Duration,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            owner: None,
            repo: None,
            branch: "main".to_string(),
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GitHubConfig {
    /// `(owner, repo)` when both are set and non-empty.
    pub fn repository(&self) -> Option<(&str, &str)> {
        let owner = self.owner.as_deref().filter(|s| !s.is_empty())?;
        let repo = self.repo.as_deref().filter(|s| !s.is_empty())?;
        Some((owner, repo))
    }

    /// `owner/repo`, or `not configured`.
    pub fn repo_slug(&self) -> String {
        match self.repository() {
            Some((owner, repo)) => format!("{}/{}", owner, repo),
            None => "not configured".to_string(),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Repository identity and token are all present.
    pub fn is_configured(&self) -> bool {
        self.repository().is_some() && self.has_token()
    }
}
