//! Git provider trait definitions
//!
//! This module defines the backend-agnostic interface that the GitHub and
//! GitLab adapters implement, together with the plain data records that cross
//! it. No backend-specific type leaves an adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::GitProviderError;

/// Supported hosted-Git backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    GitHub,
    GitLab,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::GitHub => write!(f, "github"),
            ProviderKind::GitLab => write!(f, "gitlab"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = GitProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "github" => Ok(ProviderKind::GitHub),
            "gitlab" => Ok(ProviderKind::GitLab),
            _ => Err(GitProviderError::UnsupportedProvider(s.to_string())),
        }
    }
}

/// Bearer token plus the backend it was issued by
#[derive(Clone)]
pub struct Credential {
    pub access_token: String,
    pub provider: ProviderKind,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            access_token: access_token.into(),
            provider,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("provider", &self.provider)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    /// `owner/name` on GitHub, the full namespace path on GitLab
    pub full_name: String,
    pub url: String,
    pub default_branch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl FileEntry {
    pub fn file(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: base_name(&path).to_string(),
            path,
            kind: EntryKind::File,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: base_name(&path).to_string(),
            path,
            kind: EntryKind::Dir,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Continuation token for `list_repos`
///
/// The token encoding belongs to the adapter that issued it. The cursor remembers
/// its issuer so it cannot be replayed against a different backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCursor {
    provider: ProviderKind,
    token: String,
}

impl PageCursor {
    pub(crate) fn new(provider: ProviderKind, token: impl Into<String>) -> Self {
        Self {
            provider,
            token: token.into(),
        }
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Returns the raw token if this cursor was issued by `expected`
    pub(crate) fn token_for(&self, expected: ProviderKind) -> Result<&str, GitProviderError> {
        if self.provider != expected {
            return Err(GitProviderError::InvalidCursor(format!(
                "cursor was issued by {} and cannot be used with {}",
                self.provider, expected
            )));
        }
        Ok(&self.token)
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.token)
    }
}

impl FromStr for PageCursor {
    type Err = GitProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, token) = s
            .split_once(':')
            .ok_or_else(|| GitProviderError::InvalidCursor(s.to_string()))?;
        if token.is_empty() {
            return Err(GitProviderError::InvalidCursor(s.to_string()));
        }
        let provider = provider
            .parse::<ProviderKind>()
            .map_err(|_| GitProviderError::InvalidCursor(s.to_string()))?;
        Ok(Self::new(provider, token))
    }
}

impl Serialize for PageCursor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PageCursor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One page of `list_repos`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoPage {
    pub repos: Vec<Repository>,
    /// Present iff more pages exist
    pub next_cursor: Option<PageCursor>,
}

/// Outcome of a read that degrades instead of failing
///
/// Reads are speculative, so a missing item is an expected answer rather than an
/// error. `Failed` still carries the cause: callers must be able to tell "nothing
/// there" apart from "could not ask", for instance to force re-authentication.
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Failed(GitProviderError),
}

impl<T> Lookup<T> {
    /// Collapse into "value or nothing", dropping any failure cause
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound | Lookup::Failed(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn error(&self) -> Option<&GitProviderError> {
        match self {
            Lookup::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        self.error().is_some_and(GitProviderError::is_auth_failure)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Failed(e) => Lookup::Failed(e),
        }
    }

    /// Turn into a `Result`, treating absence as `Ok(None)`
    pub fn into_result(self) -> Result<Option<T>, GitProviderError> {
        match self {
            Lookup::Found(value) => Ok(Some(value)),
            Lookup::NotFound => Ok(None),
            Lookup::Failed(e) => Err(e),
        }
    }

    /// Convert an adapter result, logging whatever gets degraded
    pub(crate) fn degrade(context: &str, result: Result<T, GitProviderError>) -> Self {
        match Lookup::from(result) {
            Lookup::NotFound => {
                tracing::debug!("{}: not found", context);
                Lookup::NotFound
            }
            Lookup::Failed(e) => {
                tracing::warn!("{} failed: {}", context, e);
                Lookup::Failed(e)
            }
            found => found,
        }
    }
}

impl<T: Default> Lookup<T> {
    pub fn unwrap_or_default(self) -> T {
        self.into_option().unwrap_or_default()
    }
}

impl<T> From<Result<T, GitProviderError>> for Lookup<T> {
    fn from(result: Result<T, GitProviderError>) -> Self {
        match result {
            Ok(value) => Lookup::Found(value),
            Err(e) if e.is_not_found() => Lookup::NotFound,
            Err(e) => Lookup::Failed(e),
        }
    }
}

/// Uniform interface over hosted-Git backends
///
/// `repo` is always the `Repository::full_name` returned by `list_repos`. An
/// omitted `branch` means the repository's real default branch.
#[async_trait]
pub trait GitProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Repositories visible to the credential, most recently updated first,
    /// thirty per page. `None` requests the first page.
    async fn list_repos(&self, cursor: Option<&PageCursor>) -> Result<RepoPage, GitProviderError>;

    /// Branch names from a single page of up to 100
    async fn list_branches(&self, repo: &str) -> Lookup<Vec<String>>;

    /// Every blob in the tree, paginated to exhaustion. Entries are always files.
    async fn scan_repo(&self, repo: &str, branch: Option<&str>) -> Lookup<Vec<FileEntry>>;

    /// A blob decoded as UTF-8. Directories are reported as `NotFound`.
    async fn get_file(&self, repo: &str, path: &str, branch: Option<&str>) -> Lookup<String>;

    /// Create or update `path` in one commit, sending the current revision
    /// token when the file already exists
    async fn save_file(
        &self,
        repo: &str,
        path: &str,
        content: &str,
        message: &str,
        branch: Option<&str>,
    ) -> Result<(), GitProviderError>;

    /// Delete `path` in one commit. Deleting a missing file is a no-op.
    async fn delete_file(
        &self,
        repo: &str,
        path: &str,
        message: &str,
        branch: Option<&str>,
    ) -> Result<(), GitProviderError>;

    /// Single-level listing of `path` (the root when `None`), files and dirs
    async fn list_files(&self, repo: &str, path: Option<&str>) -> Lookup<Vec<FileEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("github".parse::<ProviderKind>().unwrap(), ProviderKind::GitHub);
        assert_eq!(" GitLab ".parse::<ProviderKind>().unwrap(), ProviderKind::GitLab);
        assert!(matches!(
            "bitbucket".parse::<ProviderKind>(),
            Err(GitProviderError::UnsupportedProvider(_))
        ));
        assert_eq!(ProviderKind::GitLab.to_string(), "gitlab");
    }

    #[test]
    fn test_credential_debug_redacts_token() {
        let credential = Credential::new("ghp_supersecret", ProviderKind::GitHub);
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("ghp_supersecret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_file_entry_names() {
        let entry = FileEntry::file("apps/prod/app.yaml");
        assert_eq!(entry.name, "app.yaml");
        assert!(entry.is_file());

        let root = FileEntry::dir("apps");
        assert_eq!(root.name, "apps");
        assert_eq!(root.kind, EntryKind::Dir);
    }

    #[test]
    fn test_file_entry_serializes_type_field() {
        let json = serde_json::to_value(FileEntry::dir("charts")).unwrap();
        assert_eq!(json["type"], "dir");
        assert_eq!(json["name"], "charts");
    }

    #[test]
    fn test_cursor_round_trip_and_provider_binding() {
        let cursor = PageCursor::new(ProviderKind::GitLab, "eyJpZCI6IjQyIn0");
        let rendered = cursor.to_string();
        assert_eq!(rendered, "gitlab:eyJpZCI6IjQyIn0");

        let parsed: PageCursor = rendered.parse().unwrap();
        assert_eq!(parsed, cursor);
        assert_eq!(parsed.token_for(ProviderKind::GitLab).unwrap(), "eyJpZCI6IjQyIn0");
        assert!(matches!(
            parsed.token_for(ProviderKind::GitHub),
            Err(GitProviderError::InvalidCursor(_))
        ));
    }

    #[test]
    fn test_cursor_rejects_garbage() {
        assert!("2".parse::<PageCursor>().is_err());
        assert!("github:".parse::<PageCursor>().is_err());
        assert!("gitea:3".parse::<PageCursor>().is_err());
    }

    #[test]
    fn test_lookup_from_result() {
        let found: Lookup<u8> = Ok(1).into();
        assert_eq!(found.into_option(), Some(1));

        let missing: Lookup<u8> = Err(GitProviderError::NotFound("x".into())).into();
        assert!(matches!(missing, Lookup::NotFound));

        let failed: Lookup<Vec<u8>> =
            Err(GitProviderError::AuthenticationFailed("401".into())).into();
        assert!(failed.is_auth_failure());
        assert!(failed.unwrap_or_default().is_empty());
    }
}
