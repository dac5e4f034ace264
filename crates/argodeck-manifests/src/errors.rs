use argodeck_git::GitProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Git provider error: {0}")]
    Provider(#[from] GitProviderError),

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("Manifest has no metadata.name")]
    MissingName,

    #[error("Manifest path must end with .yaml or .yml: {0}")]
    InvalidPath(String),
}

impl ManifestError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ManifestError::Provider(e) if e.is_auth_failure())
    }
}
