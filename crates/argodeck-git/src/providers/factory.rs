//! Provider selection
//!
//! The only place that matches on a backend name. Everything downstream works
//! against `dyn GitProvider`.

use tracing::debug;

use super::github::GitHubProvider;
use super::gitlab::GitLabProvider;
use super::traits::{Credential, GitProvider, ProviderKind};
use crate::config::GitHostConfig;
use crate::errors::GitProviderError;

/// Factory for creating provider instances
#[derive(Debug, Clone, Default)]
pub struct GitProviderFactory {
    config: GitHostConfig,
}

impl GitProviderFactory {
    pub fn new(config: GitHostConfig) -> Self {
        Self { config }
    }

    /// Build an adapter from the environment's host configuration
    pub fn from_env() -> Result<Self, GitProviderError> {
        Ok(Self::new(GitHostConfig::from_env()?))
    }

    pub fn config(&self) -> &GitHostConfig {
        &self.config
    }

    /// Fails with `UnsupportedProvider` for any name other than github/gitlab
    pub fn create(
        &self,
        access_token: &str,
        provider_name: &str,
    ) -> Result<Box<dyn GitProvider>, GitProviderError> {
        let kind: ProviderKind = provider_name.parse()?;
        self.create_for(&Credential::new(access_token, kind))
    }

    pub fn create_for(
        &self,
        credential: &Credential,
    ) -> Result<Box<dyn GitProvider>, GitProviderError> {
        debug!("Creating {} provider", credential.provider);
        match credential.provider {
            ProviderKind::GitHub => Ok(Box::new(GitHubProvider::new(
                &credential.access_token,
                &self.config,
            )?)),
            ProviderKind::GitLab => Ok(Box::new(GitLabProvider::new(
                &credential.access_token,
                &self.config,
            )?)),
        }
    }
}

/// Adapter for `provider_name`, configured from the environment
pub fn get_provider(
    access_token: &str,
    provider_name: &str,
) -> Result<Box<dyn GitProvider>, GitProviderError> {
    GitProviderFactory::from_env()?.create(access_token, provider_name)
}
