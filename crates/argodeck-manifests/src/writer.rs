use argodeck_git::GitProvider;
use serde_yaml::Value;
use tracing::info;

use crate::errors::ManifestError;
use crate::manifest::is_yaml_path;

/// Commits manifests with conventional messages
pub struct ManifestWriter<'a> {
    provider: &'a dyn GitProvider,
}

impl<'a> ManifestWriter<'a> {
    pub fn new(provider: &'a dyn GitProvider) -> Self {
        Self { provider }
    }

    /// Serialise `document` and commit it at `path`
    ///
    /// `is_new` only picks the commit message. Whether the file already exists is
    /// settled by the provider.
    pub async fn save(
        &self,
        repo: &str,
        path: &str,
        document: &Value,
        is_new: bool,
        branch: Option<&str>,
    ) -> Result<(), ManifestError> {
        if !is_yaml_path(path) {
            return Err(ManifestError::InvalidPath(path.to_string()));
        }
        let name = document
            .get("metadata")
            .and_then(|metadata| metadata.get("name"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or(ManifestError::MissingName)?;

        let content = serde_yaml::to_string(document).map_err(ManifestError::Serialize)?;
        let message = if is_new {
            format!("Create ArgoCD application {}", name)
        } else {
            format!("Update ArgoCD application {}", name)
        };

        self.provider
            .save_file(repo, path, &content, &message, branch)
            .await?;
        info!("{}", message);
        Ok(())
    }

    pub async fn delete(
        &self,
        repo: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<(), ManifestError> {
        let message = format!("Delete application at {}", path);
        self.provider
            .delete_file(repo, path, &message, branch)
            .await?;
        info!("{}", message);
        Ok(())
    }
}
