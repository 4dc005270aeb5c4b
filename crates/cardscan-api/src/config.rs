use std::time::Duration;

use cardscan_github::{GitHubConfig, DEFAULT_API_URL};
use clap::{Parser, ValueEnum};

/// Where documents are stored.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Files in a GitHub repository
    Github,
    /// Process memory, lost on exit
    Memory,
}

/// Configuration for the cardscan-api server.
#[derive(Parser, Debug, Clone)]
#[command(name = "cardscan-api")]
#[command(about = "HTTP API for card scans and vehicles stored in a GitHub repository")]
pub struct Config {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    /// Port to bind to
    #[arg(long, default_value = "3001", env = "PORT")]
    pub port: u16,

    /// Storage backend
    #[arg(long, value_enum, default_value = "github", env = "STORE_BACKEND")]
    pub backend: Backend,

    /// Owner of the data repository
    #[arg(long, env = "GITHUB_OWNER")]
    pub github_owner: Option<String>,

    /// Name of the data repository
    #[arg(long, env = "GITHUB_REPO")]
    pub github_repo: Option<String>,

    /// Branch holding the data files
    #[arg(long, default_value = "main", env = "GITHUB_BRANCH")]
    pub github_branch: String,

    /// GitHub token with contents write permission
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, default_value = DEFAULT_API_URL, env = "GITHUB_API_URL")]
    pub github_api_url: String,

    /// Timeout for each GitHub request in seconds
    #[arg(long, default_value = "30", env = "REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: u64,
}

/// What `/health` reports about the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatus {
    pub configured: bool,
    pub repo: String,
}

impl Config {
    /// GitHub storage counts as configured only with owner, repo and token
    /// all set; until then the repository is reported as `not configured`.
    pub fn store_status(&self) -> StoreStatus {
        match self.backend {
            Backend::Github => {
                let github = self.github();
                let configured = github.is_configured();
                let repo = if configured {
                    github.repo_slug()
                } else {
                    "not configured".to_string()
                };
                StoreStatus { configured, repo }
            }
            Backend::Memory => StoreStatus {
                configured: true,
                repo: "memory".to_string(),
            },
        }
    }

    /// Settings for the GitHub contents client.
    pub fn github(&self) -> GitHubConfig {
        GitHubConfig {
            owner: self.github_owner.clone(),
            repo: self.github_repo.clone(),
            branch: self.github_branch.clone(),
            token: self.github_token.clone(),
            api_url: self.github_api_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}
