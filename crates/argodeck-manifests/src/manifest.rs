//! ArgoCD manifest recognition

use argodeck_git::FileEntry;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;

use crate::errors::ManifestError;

const ARGO_API_GROUP: &str = "argoproj.io";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManifestKind {
    Application,
    ApplicationSet,
}

impl ManifestKind {
    /// Kind of an Argo CD document, `None` for anything else
    pub fn of(document: &Value) -> Option<Self> {
        let api_version = document.get("apiVersion").and_then(Value::as_str)?;
        if !api_version.starts_with(ARGO_API_GROUP) {
            return None;
        }
        match document.get("kind").and_then(Value::as_str)? {
            "Application" => Some(ManifestKind::Application),
            "ApplicationSet" => Some(ManifestKind::ApplicationSet),
            _ => None,
        }
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestKind::Application => write!(f, "Application"),
            ManifestKind::ApplicationSet => write!(f, "ApplicationSet"),
        }
    }
}

/// One recognised document and the file it came from
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub path: String,
    pub kind: ManifestKind,
    pub document: Value,
}

impl Manifest {
    pub fn name(&self) -> Option<&str> {
        lookup_str(&self.document, &["metadata", "name"])
    }

    pub fn namespace(&self) -> Option<&str> {
        lookup_str(&self.document, &["metadata", "namespace"])
    }

    pub fn project(&self) -> Option<&str> {
        lookup_str(&self.document, &["spec", "project"])
    }

    pub fn source_repo_url(&self) -> Option<&str> {
        lookup_str(&self.document, &["spec", "source", "repoURL"])
    }

    pub fn destination_namespace(&self) -> Option<&str> {
        lookup_str(&self.document, &["spec", "destination", "namespace"])
    }
}

fn lookup_str<'a>(document: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .try_fold(document, |value, key| value.get(*key))
        .and_then(Value::as_str)
}

pub fn is_yaml_path(path: &str) -> bool {
    path.ends_with(".yaml") || path.ends_with(".yml")
}

/// Files worth downloading during discovery
pub fn is_yaml_candidate(entry: &FileEntry) -> bool {
    entry.is_file() && is_yaml_path(&entry.name)
}

/// Every Argo CD document in a (possibly multi-document) YAML file
///
/// Malformed YAML fails the whole file. Documents of other kinds are ignored.
pub fn parse_manifests(path: &str, text: &str) -> Result<Vec<Manifest>, ManifestError> {
    let mut manifests = Vec::new();

    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document).map_err(|source| ManifestError::Parse {
            path: path.to_string(),
            source,
        })?;

        if let Some(kind) = ManifestKind::of(&value) {
            manifests.push(Manifest {
                path: path.to_string(),
                kind,
                document: value,
            });
        }
    }

    Ok(manifests)
}
