//! Manifest discovery
//!
//! Scans a repository, keeps the YAML candidates and downloads a bounded number
//! of them with bounded concurrency. Downloads finish in any order; results are
//! put back in candidate order by index.

use argodeck_git::{FileEntry, GitProvider, Lookup};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::ManifestError;
use crate::manifest::{is_yaml_candidate, parse_manifests, Manifest};

pub const DEFAULT_FILE_LIMIT: usize = 30;
pub const DEFAULT_CONCURRENCY: usize = 30;

/// A candidate that did not yield manifests, and why
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Discovery {
    pub branches: Vec<String>,
    pub manifests: Vec<Manifest>,
    /// Number of YAML files found by the scan, including those past the limit
    pub candidates: usize,
    pub skipped: Vec<SkippedFile>,
    /// More candidates existed than were downloaded
    pub truncated: bool,
}

pub struct ManifestScanner<'a> {
    provider: &'a dyn GitProvider,
    file_limit: usize,
    concurrency: usize,
}

impl<'a> ManifestScanner<'a> {
    pub fn new(provider: &'a dyn GitProvider) -> Self {
        Self {
            provider,
            file_limit: DEFAULT_FILE_LIMIT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_file_limit(mut self, file_limit: usize) -> Self {
        self.file_limit = file_limit;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Find Argo CD manifests in `repo` on `branch` (the default branch if `None`)
    ///
    /// Only an authentication failure aborts discovery. Any other failure
    /// degrades: an unreachable scan means no manifests, an unreadable or
    /// malformed file is reported in `skipped`.
    pub async fn discover(
        &self,
        repo: &str,
        branch: Option<&str>,
    ) -> Result<Discovery, ManifestError> {
        let (branches, scan) = tokio::join!(
            self.provider.list_branches(repo),
            self.provider.scan_repo(repo, branch)
        );

        let branches = settle(branches, repo, "branch listing")?;
        let files = settle(scan, repo, "scan")?;

        let candidates: Vec<FileEntry> = files.into_iter().filter(is_yaml_candidate).collect();
        let total = candidates.len();
        let truncated = total > self.file_limit;
        if truncated {
            info!(
                "{} has {} YAML files, reading the first {}",
                repo, total, self.file_limit
            );
        }
        let selected = &candidates[..total.min(self.file_limit)];

        let mut results: Vec<Option<Lookup<String>>> =
            (0..selected.len()).map(|_| None).collect();
        let mut fetched = stream::iter(selected.iter().enumerate())
            .map(|(index, entry)| async move {
                (
                    index,
                    self.provider.get_file(repo, &entry.path, branch).await,
                )
            })
            .buffer_unordered(self.concurrency);

        while let Some((index, content)) = fetched.next().await {
            results[index] = Some(content);
        }

        let mut manifests = Vec::new();
        let mut skipped = Vec::new();

        for (entry, result) in selected.iter().zip(results) {
            let reason = match result {
                Some(Lookup::Found(text)) => match parse_manifests(&entry.path, &text) {
                    Ok(found) => {
                        debug!("{}: {} manifests", entry.path, found.len());
                        manifests.extend(found);
                        continue;
                    }
                    Err(e) => {
                        warn!("Skipping {}: {}", entry.path, e);
                        e.to_string()
                    }
                },
                Some(Lookup::Failed(e)) if e.is_auth_failure() => return Err(e.into()),
                Some(Lookup::Failed(e)) => e.to_string(),
                Some(Lookup::NotFound) | None => "file not found".to_string(),
            };
            skipped.push(SkippedFile {
                path: entry.path.clone(),
                reason,
            });
        }

        info!(
            "Discovered {} manifests in {} ({} candidates, {} skipped)",
            manifests.len(),
            repo,
            total,
            skipped.len()
        );

        Ok(Discovery {
            branches,
            manifests,
            candidates: total,
            skipped,
            truncated,
        })
    }
}

/// Empty on degradation, except for rejected credentials
fn settle<T: Default>(lookup: Lookup<T>, repo: &str, what: &str) -> Result<T, ManifestError> {
    match lookup {
        Lookup::Found(value) => Ok(value),
        Lookup::NotFound => Ok(T::default()),
        Lookup::Failed(e) if e.is_auth_failure() => Err(e.into()),
        Lookup::Failed(e) => {
            warn!("{} of {} failed, continuing without it: {}", what, repo, e);
            Ok(T::default())
        }
    }
}
