//! Git provider error types

use thiserror::Error;

/// Errors surfaced by the provider adapters
#[derive(Error, Debug)]
pub enum GitProviderError {
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl GitProviderError {
    /// True when the credential was rejected and the caller should re-authenticate
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, GitProviderError::AuthenticationFailed(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GitProviderError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(GitProviderError::AuthenticationFailed("expired".into()).is_auth_failure());
        assert!(!GitProviderError::RateLimitExceeded.is_auth_failure());
        assert!(GitProviderError::NotFound("a.yaml".into()).is_not_found());
        assert!(!GitProviderError::Conflict("sha".into()).is_not_found());
    }

    #[test]
    fn test_display() {
        let err = GitProviderError::UnsupportedProvider("bitbucket".into());
        assert_eq!(err.to_string(), "Unsupported provider: bitbucket");
    }
}
