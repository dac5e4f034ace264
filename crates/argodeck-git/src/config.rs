//! Connection settings for the hosted Git backends

use serde::{Deserialize, Serialize};

use crate::errors::GitProviderError;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GITLAB_BASE_URL: &str = "https://gitlab.com";

const ENV_GITHUB_API_URL: &str = "GITHUB_API_URL";
const ENV_GITLAB_BASE_URL: &str = "GITLAB_BASE_URL";
const ENV_GITLAB_INSECURE: &str = "GITLAB_INSECURE";
const ENV_HTTP_TIMEOUT: &str = "ARGODECK_HTTP_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitHostConfig {
    /// GitHub REST API root (GitHub Enterprise uses `https://host/api/v3`)
    pub github_api_url: String,
    /// GitLab instance root, without the `/api/v4` suffix
    pub gitlab_base_url: String,
    /// Skip TLS certificate verification for GitLab (self-signed installs only)
    pub gitlab_insecure: bool,
    pub request_timeout_secs: u64,
    /// How long a resolved default branch is reused before asking again
    pub default_branch_ttl_minutes: i64,
}

impl Default for GitHostConfig {
    fn default() -> Self {
        Self {
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            gitlab_base_url: DEFAULT_GITLAB_BASE_URL.to_string(),
            gitlab_insecure: false,
            request_timeout_secs: 30,
            default_branch_ttl_minutes: 10,
        }
    }
}

impl GitHostConfig {
    /// Build a configuration from the process environment, falling back to defaults
    pub fn from_env() -> Result<Self, GitProviderError> {
        let mut config = Self::default();

        if let Some(url) = non_empty_env(ENV_GITHUB_API_URL) {
            config.github_api_url = url;
        }
        if let Some(url) = non_empty_env(ENV_GITLAB_BASE_URL) {
            config.gitlab_base_url = url;
        }
        if let Some(flag) = non_empty_env(ENV_GITLAB_INSECURE) {
            config.gitlab_insecure = parse_bool(ENV_GITLAB_INSECURE, &flag)?;
        }
        if let Some(secs) = non_empty_env(ENV_HTTP_TIMEOUT) {
            config.request_timeout_secs = secs.parse().map_err(|_| {
                GitProviderError::InvalidConfiguration(format!(
                    "{} must be a number of seconds, got '{}'",
                    ENV_HTTP_TIMEOUT, secs
                ))
            })?;
        }

        config.normalize()
    }

    /// Trim trailing slashes and validate the URLs
    pub fn normalize(mut self) -> Result<Self, GitProviderError> {
        self.github_api_url = self.github_api_url.trim_end_matches('/').to_string();
        self.gitlab_base_url = self.gitlab_base_url.trim_end_matches('/').to_string();

        for (name, value) in [
            ("github_api_url", &self.github_api_url),
            ("gitlab_base_url", &self.gitlab_base_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                GitProviderError::InvalidConfiguration(format!(
                    "{} '{}' is not a valid URL: {}",
                    name, value, e
                ))
            })?;
        }

        if self.request_timeout_secs == 0 {
            return Err(GitProviderError::InvalidConfiguration(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        Ok(self)
    }

    pub fn gitlab_api_url(&self) -> String {
        format!("{}/api/v4", self.gitlab_base_url)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, GitProviderError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(GitProviderError::InvalidConfiguration(format!(
            "{} must be true or false, got '{}'",
            key, value
        ))),
    }
}
