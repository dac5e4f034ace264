//! GitHub provider implementation
//!
//! Uses the GitHub REST API (github.com, or GitHub Enterprise through a custom
//! API root). Repository listing is page-number based; the page number doubles
//! as the cursor and the `Link` header tells whether another page exists.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use super::traits::{FileEntry, GitProvider, Lookup, PageCursor, ProviderKind, RepoPage, Repository};
use crate::config::GitHostConfig;
use crate::errors::GitProviderError;
use crate::http::{build_client, check_status, decode_base64, encode_path};
use crate::pagination::next_link;

const REPOS_PER_PAGE: u32 = 30;
const BRANCHES_PER_PAGE: u32 = 100;
const API_VERSION: &str = "2022-11-28";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

#[derive(Debug, Deserialize)]
struct GitHubRepo {
    name: String,
    full_name: String,
    html_url: String,
    #[serde(default)]
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct GitHubBranch {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    sha: String,
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    item_type: String,
    sha: String,
}

/// The contents API answers with an array for directories and an object otherwise
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentItem>),
    Single(ContentItem),
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    path: String,
    sha: String,
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct DeleteContentsRequest<'a> {
    message: &'a str,
    sha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

/// GitHub adapter
pub struct GitHubProvider {
    client: Client,
    api_url: String,
    headers: HeaderMap,
}

impl GitHubProvider {
    pub fn new(access_token: &str, config: &GitHostConfig) -> Result<Self, GitProviderError> {
        let client = build_client(config.request_timeout_secs, false)?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", access_token)).map_err(|_| {
            GitProviderError::InvalidConfiguration(
                "access token contains characters not allowed in a header".to_string(),
            )
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        Ok(Self {
            client,
            api_url: config.github_api_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!("GitHub API request: {} {}", method, path);
        self.client
            .request(method, format!("{}{}", self.api_url, path))
            .headers(self.headers.clone())
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<Response, GitProviderError> {
        let response = request.send().await?;
        check_status(response, context).await
    }

    async fn fetch_branches(&self, repo: &str) -> Result<Vec<String>, GitProviderError> {
        let repo_path = repo_path(repo)?;
        let request = self
            .request(Method::GET, &format!("/repos/{}/branches", repo_path))
            .query(&[("per_page", BRANCHES_PER_PAGE)]);
        let response = self.execute(request, "list branches").await?;

        let branches: Vec<GitHubBranch> = response
            .json()
            .await
            .map_err(|e| GitProviderError::Decode(e.to_string()))?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    async fn fetch_tree(
        &self,
        repo_path: &str,
        tree_ref: &str,
        recursive: bool,
    ) -> Result<TreeResponse, GitProviderError> {
        let mut request = self.request(
            Method::GET,
            &format!(
                "/repos/{}/git/trees/{}",
                repo_path,
                urlencoding::encode(tree_ref)
            ),
        );
        if recursive {
            request = request.query(&[("recursive", "1")]);
        }

        let response = self.execute(request, "get tree").await?;
        response
            .json()
            .await
            .map_err(|e| GitProviderError::Decode(e.to_string()))
    }

    /// List every blob under `tree_ref`
    ///
    /// GitHub caps recursive tree responses and flags them `truncated`. Such trees
    /// are walked again one level at a time from the root sha, sequentially.
    async fn scan_tree(
        &self,
        repo: &str,
        branch: Option<&str>,
    ) -> Result<Vec<FileEntry>, GitProviderError> {
        let repo_path = repo_path(repo)?;
        let root = self
            .fetch_tree(&repo_path, branch.unwrap_or("HEAD"), true)
            .await?;

        if !root.truncated {
            return Ok(root
                .tree
                .into_iter()
                .filter(|item| item.item_type == "blob")
                .map(|item| FileEntry::file(item.path))
                .collect());
        }

        info!(
            "Recursive tree for {} is truncated, walking it level by level",
            repo
        );

        let mut files = Vec::new();
        let mut pending = VecDeque::from([(String::new(), root.sha)]);

        while let Some((prefix, sha)) = pending.pop_front() {
            let tree = self.fetch_tree(&repo_path, &sha, false).await?;
            if tree.truncated {
                return Err(GitProviderError::ApiError(format!(
                    "tree {} in {} is truncated even without recursion",
                    sha, repo
                )));
            }

            for item in tree.tree {
                let path = if prefix.is_empty() {
                    item.path
                } else {
                    format!("{}/{}", prefix, item.path)
                };
                match item.item_type.as_str() {
                    "blob" => files.push(FileEntry::file(path)),
                    "tree" => pending.push_back((path, item.sha)),
                    // submodules
                    _ => {}
                }
            }
        }

        debug!("Walked {} blobs in {}", files.len(), repo);
        Ok(files)
    }

    fn contents_path(repo_path: &str, path: &str) -> String {
        let encoded = encode_path(path);
        if encoded.is_empty() {
            format!("/repos/{}/contents", repo_path)
        } else {
            format!("/repos/{}/contents/{}", repo_path, encoded)
        }
    }

    async fn fetch_contents(
        &self,
        repo_path: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<ContentsResponse, GitProviderError> {
        let mut request = self.request(Method::GET, &Self::contents_path(repo_path, path));
        if let Some(reference) = branch {
            request = request.query(&[("ref", reference)]);
        }

        let response = self.execute(request, "get contents").await?;
        response
            .json()
            .await
            .map_err(|e| GitProviderError::Decode(e.to_string()))
    }

    async fn fetch_file_item(
        &self,
        repo_path: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<ContentItem, GitProviderError> {
        match self.fetch_contents(repo_path, path, branch).await? {
            ContentsResponse::Single(item) if item.item_type == "file" => Ok(item),
            _ => Err(GitProviderError::NotFound(format!("{} is not a file", path))),
        }
    }

    /// Blobs over 1 MB come back with `encoding: "none"` and must be fetched raw
    async fn fetch_raw(
        &self,
        repo_path: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<String, GitProviderError> {
        let mut headers = self.headers.clone();
        headers.insert(ACCEPT, HeaderValue::from_static(RAW_MEDIA_TYPE));

        let url = format!("{}{}", self.api_url, Self::contents_path(repo_path, path));
        debug!("GitHub API request: GET {} (raw)", path);
        let mut request = self.client.get(url).headers(headers);
        if let Some(reference) = branch {
            request = request.query(&[("ref", reference)]);
        }

        let response = self.execute(request, "get raw contents").await?;
        response
            .text()
            .await
            .map_err(|e| GitProviderError::Decode(e.to_string()))
    }

    async fn read_file(
        &self,
        repo: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<String, GitProviderError> {
        let repo_path = repo_path(repo)?;
        let item = self.fetch_file_item(&repo_path, path, branch).await?;

        match (item.encoding.as_deref(), item.content) {
            (Some("base64"), Some(content)) => decode_base64(&content),
            _ => {
                debug!("{} has no inline content, fetching it raw", item.path);
                self.fetch_raw(&repo_path, path, branch).await
            }
        }
    }

    async fn current_sha(
        &self,
        repo_path: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<String, GitProviderError> {
        self.fetch_file_item(repo_path, path, branch)
            .await
            .map(|item| item.sha)
    }

    async fn read_directory(
        &self,
        repo: &str,
        path: Option<&str>,
    ) -> Result<Vec<FileEntry>, GitProviderError> {
        let repo_path = repo_path(repo)?;
        match self
            .fetch_contents(&repo_path, path.unwrap_or(""), None)
            .await?
        {
            ContentsResponse::Listing(items) => Ok(items
                .into_iter()
                .map(|item| {
                    if item.item_type == "dir" {
                        FileEntry::dir(item.path)
                    } else {
                        FileEntry::file(item.path)
                    }
                })
                .collect()),
            ContentsResponse::Single(_) => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl GitProvider for GitHubProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitHub
    }

    async fn list_repos(&self, cursor: Option<&PageCursor>) -> Result<RepoPage, GitProviderError> {
        let page = match cursor {
            None => 1,
            Some(cursor) => {
                let token = cursor.token_for(ProviderKind::GitHub)?;
                token
                    .parse::<u32>()
                    .ok()
                    .filter(|page| *page >= 1)
                    .ok_or_else(|| {
                        GitProviderError::InvalidCursor(format!("not a page number: {}", token))
                    })?
            }
        };

        let request = self.request(Method::GET, "/user/repos").query(&[
            ("sort", "updated".to_string()),
            ("per_page", REPOS_PER_PAGE.to_string()),
            ("page", page.to_string()),
        ]);
        let response = self.execute(request, "list repositories").await?;
        let next_page = match next_link(response.headers()) {
            Some(_) => Some(page.checked_add(1).ok_or_else(|| {
                GitProviderError::InvalidCursor(format!("page {} is out of range", page))
            })?),
            None => None,
        };

        let repos: Vec<GitHubRepo> = response
            .json()
            .await
            .map_err(|e| GitProviderError::Decode(e.to_string()))?;
        debug!("Received {} repositories on page {}", repos.len(), page);

        Ok(RepoPage {
            repos: repos
                .into_iter()
                .map(|r| Repository {
                    name: r.name,
                    full_name: r.full_name,
                    url: r.html_url,
                    default_branch: r.default_branch,
                })
                .collect(),
            next_cursor: next_page
                .map(|next| PageCursor::new(ProviderKind::GitHub, next.to_string())),
        })
    }

    async fn list_branches(&self, repo: &str) -> Lookup<Vec<String>> {
        Lookup::degrade("list branches", self.fetch_branches(repo).await)
    }

    async fn scan_repo(&self, repo: &str, branch: Option<&str>) -> Lookup<Vec<FileEntry>> {
        Lookup::degrade("scan repository", self.scan_tree(repo, branch).await)
    }

    async fn get_file(&self, repo: &str, path: &str, branch: Option<&str>) -> Lookup<String> {
        Lookup::degrade("get file", self.read_file(repo, path, branch).await)
    }

    async fn save_file(
        &self,
        repo: &str,
        path: &str,
        content: &str,
        message: &str,
        branch: Option<&str>,
    ) -> Result<(), GitProviderError> {
        let repo_path = repo_path(repo)?;

        let sha = match self.current_sha(&repo_path, path, branch).await {
            Ok(sha) => Some(sha),
            Err(e) if e.is_not_found() => None,
            Err(e) if e.is_auth_failure() => return Err(e),
            Err(e) => {
                warn!(
                    "Could not read current revision of {} in {}, committing without it: {}",
                    path, repo, e
                );
                None
            }
        };
        let is_update = sha.is_some();

        let body = PutContentsRequest {
            message,
            content: STANDARD.encode(content.as_bytes()),
            sha,
            branch,
        };
        let request = self
            .request(Method::PUT, &Self::contents_path(&repo_path, path))
            .json(&body);
        self.execute(request, "commit file").await?;

        info!(
            "{} {} in {}",
            if is_update { "Updated" } else { "Created" },
            path,
            repo
        );
        Ok(())
    }

    async fn delete_file(
        &self,
        repo: &str,
        path: &str,
        message: &str,
        branch: Option<&str>,
    ) -> Result<(), GitProviderError> {
        let repo_path = repo_path(repo)?;

        let sha = match self.current_sha(&repo_path, path, branch).await {
            Ok(sha) => sha,
            Err(e) if e.is_not_found() => {
                info!("{} does not exist in {}, nothing to delete", path, repo);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let body = DeleteContentsRequest {
            message,
            sha,
            branch,
        };
        let request = self
            .request(Method::DELETE, &Self::contents_path(&repo_path, path))
            .json(&body);
        self.execute(request, "delete file").await?;

        info!("Deleted {} in {}", path, repo);
        Ok(())
    }

    async fn list_files(&self, repo: &str, path: Option<&str>) -> Lookup<Vec<FileEntry>> {
        Lookup::degrade("list files", self.read_directory(repo, path).await)
    }
}

/// `owner/name` with each half percent-encoded
fn repo_path(full_name: &str) -> Result<String, GitProviderError> {
    match full_name.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(format!(
                "{}/{}",
                urlencoding::encode(owner),
                urlencoding::encode(name)
            ))
        }
        _ => Err(GitProviderError::NotFound(format!(
            "'{}' is not an owner/name repository",
            full_name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_path() {
        assert_eq!(repo_path("acme/deploy").unwrap(), "acme/deploy");
        assert_eq!(repo_path("acme/my repo").unwrap(), "acme/my%20repo");
        assert!(repo_path("acme").is_err());
        assert!(repo_path("acme/deploy/extra").is_err());
        assert!(repo_path("/deploy").is_err());
    }

    #[test]
    fn test_contents_path() {
        assert_eq!(
            GitHubProvider::contents_path("acme/deploy", ""),
            "/repos/acme/deploy/contents"
        );
        assert_eq!(
            GitHubProvider::contents_path("acme/deploy", "apps/a.yaml"),
            "/repos/acme/deploy/contents/apps/a.yaml"
        );
    }
}
