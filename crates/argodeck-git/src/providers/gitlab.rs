//! GitLab provider implementation
//!
//! Talks to API v4 of gitlab.com or a self-hosted instance. Projects are
//! addressed by their URL-encoded `path_with_namespace`. Both project listing
//! and tree listing use keyset pagination, following the token GitLab puts in
//! the `Link rel="next"` URL.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::traits::{FileEntry, GitProvider, Lookup, PageCursor, ProviderKind, RepoPage, Repository};
use crate::cache::DefaultBranchCache;
use crate::config::GitHostConfig;
use crate::errors::GitProviderError;
use crate::http::{build_client, check_status, decode_base64};
use crate::pagination::{next_link, query_param};

const PROJECTS_PER_PAGE: u32 = 30;
const BRANCHES_PER_PAGE: u32 = 100;
const TREE_PER_PAGE: u32 = 100;

#[derive(Debug, Deserialize)]
struct GitLabProject {
    name: String,
    path_with_namespace: String,
    web_url: String,
    #[serde(default)]
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitLabBranch {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    item_type: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryFile {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
    last_commit_id: String,
}

#[derive(Debug, Serialize)]
struct CommitFileRequest<'a> {
    branch: &'a str,
    commit_message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_commit_id: Option<String>,
}

/// GitLab adapter
pub struct GitLabProvider {
    client: Client,
    api_url: String,
    headers: HeaderMap,
    default_branches: DefaultBranchCache,
}

impl GitLabProvider {
    pub fn new(access_token: &str, config: &GitHostConfig) -> Result<Self, GitProviderError> {
        let client = build_client(config.request_timeout_secs, config.gitlab_insecure)?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", access_token)).map_err(|_| {
            GitProviderError::InvalidConfiguration(
                "access token contains characters not allowed in a header".to_string(),
            )
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self {
            client,
            api_url: config.gitlab_api_url(),
            headers,
            default_branches: DefaultBranchCache::new(config.default_branch_ttl_minutes),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!("GitLab API request: {} {}", method, path);
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

    /// Branch to act on: the requested one, or the project's real default
    async fn resolve_branch(
        &self,
        repo: &str,
        branch: Option<&str>,
    ) -> Result<String, GitProviderError> {
        if let Some(branch) = branch {
            return Ok(branch.to_string());
        }

        let key = repo.to_string();
        if let Some(cached) = self.default_branches.get(&key).await {
            debug!("Using cached default branch {} for {}", cached, repo);
            return Ok(cached);
        }

        let request = self.request(Method::GET, &project_path(repo)?);
        let project: GitLabProject = self
            .execute(request, "get project")
            .await?
            .json()
            .await
            .map_err(|e| GitProviderError::Decode(e.to_string()))?;

        let default_branch = project
            .default_branch
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                GitProviderError::NotFound(format!("{} has no default branch", repo))
            })?;

        self.default_branches
            .set(key, default_branch.clone())
            .await;
        Ok(default_branch)
    }

    /// Run a commit request, dropping a cached default branch the backend no longer accepts
    async fn commit(
        &self,
        repo: &str,
        uses_default: bool,
        request: RequestBuilder,
        context: &str,
    ) -> Result<(), GitProviderError> {
        match self.execute(request, context).await {
            Ok(_) => Ok(()),
            Err(e) => {
                let stale = uses_default
                    && !e.is_auth_failure()
                    && !matches!(e, GitProviderError::Conflict(_));
                if stale {
                    debug!("Forgetting cached default branch for {}", repo);
                    self.default_branches.invalidate(&repo.to_string()).await;
                }
                Err(e)
            }
        }
    }

    async fn fetch_branches(&self, repo: &str) -> Result<Vec<String>, GitProviderError> {
        let request = self
            .request(
                Method::GET,
                &format!("{}/repository/branches", project_path(repo)?),
            )
            .query(&[("per_page", BRANCHES_PER_PAGE)]);
        let branches: Vec<GitLabBranch> = self
            .execute(request, "list branches")
            .await?
            .json()
            .await
            .map_err(|e| GitProviderError::Decode(e.to_string()))?;

        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    /// Collect every page of a tree listing
    ///
    /// Pages are fetched one after another since each token comes from the
    /// previous response. A token GitLab hands out twice would loop forever, so it
    /// fails the listing instead.
    async fn fetch_tree(
        &self,
        repo: &str,
        path: Option<&str>,
        branch: Option<&str>,
        recursive: bool,
    ) -> Result<Vec<TreeItem>, GitProviderError> {
        let tree_path = format!("{}/repository/tree", project_path(repo)?);
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();
        let mut pages = 0usize;

        loop {
            let mut query = vec![
                ("pagination", "keyset".to_string()),
                ("per_page", TREE_PER_PAGE.to_string()),
            ];
            if recursive {
                query.push(("recursive", "true".to_string()));
            }
            if let Some(path) = path.filter(|p| !p.is_empty()) {
                query.push(("path", path.to_string()));
            }
            if let Some(reference) = branch {
                query.push(("ref", reference.to_string()));
            }
            if let Some(token) = &page_token {
                query.push(("page_token", token.clone()));
            }

            let request = self.request(Method::GET, &tree_path).query(&query);
            let response = self.execute(request, "list tree").await?;
            let next_token =
                next_link(response.headers()).and_then(|url| query_param(&url, "page_token"));

            let page: Vec<TreeItem> = response
                .json()
                .await
                .map_err(|e| GitProviderError::Decode(e.to_string()))?;
            pages += 1;
            items.extend(page);

            match next_token {
                Some(token) => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(GitProviderError::ApiError(format!(
                            "tree pagination for {} repeated page token {}",
                            repo, token
                        )));
                    }
                    page_token = Some(token);
                }
                None => break,
            }
        }

        debug!("Fetched {} tree entries for {} in {} pages", items.len(), repo, pages);
        Ok(items)
    }

    fn file_path(repo: &str, path: &str) -> Result<String, GitProviderError> {
        Ok(format!(
            "{}/repository/files/{}",
            project_path(repo)?,
            urlencoding::encode(path.trim_matches('/'))
        ))
    }

    async fn fetch_file(
        &self,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<RepositoryFile, GitProviderError> {
        let request = self
            .request(Method::GET, &Self::file_path(repo, path)?)
            .query(&[("ref", branch)]);
        self.execute(request, "get file")
            .await?
            .json()
            .await
            .map_err(|e| GitProviderError::Decode(e.to_string()))
    }

    async fn read_file(
        &self,
        repo: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<String, GitProviderError> {
        let branch = self.resolve_branch(repo, branch).await?;
        let file = self.fetch_file(repo, path, &branch).await?;

        match file.encoding.as_deref() {
            Some("text") => Ok(file.content),
            _ => decode_base64(&file.content),
        }
    }

    async fn scan_tree(
        &self,
        repo: &str,
        branch: Option<&str>,
    ) -> Result<Vec<FileEntry>, GitProviderError> {
        let items = self.fetch_tree(repo, None, branch, true).await?;
        Ok(items
            .into_iter()
            .filter(|item| item.item_type == "blob")
            .map(|item| FileEntry::file(item.path))
            .collect())
    }

    async fn read_directory(
        &self,
        repo: &str,
        path: Option<&str>,
    ) -> Result<Vec<FileEntry>, GitProviderError> {
        let items = self.fetch_tree(repo, path, None, false).await?;
        Ok(items
            .into_iter()
            .map(|item| {
                if item.item_type == "tree" {
                    FileEntry::dir(item.path)
                } else {
                    FileEntry::file(item.path)
                }
            })
            .collect())
    }
}

#[async_trait]
impl GitProvider for GitLabProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitLab
    }

    async fn list_repos(&self, cursor: Option<&PageCursor>) -> Result<RepoPage, GitProviderError> {
        // A cursor is the full query of the previous `rel="next"` link and is replayed as-is
        let query: Vec<(String, String)> = match cursor {
            Some(cursor) => {
                let token = cursor.token_for(ProviderKind::GitLab)?;
                let pairs: Vec<(String, String)> = url::form_urlencoded::parse(token.as_bytes())
                    .into_owned()
                    .collect();
                if !pairs
                    .iter()
                    .any(|(key, value)| key == "pagination" && value == "keyset")
                {
                    return Err(GitProviderError::InvalidCursor(format!(
                        "not a GitLab keyset cursor: {}",
                        token
                    )));
                }
                pairs
            }
            None => [
                ("membership", "true".to_string()),
                ("order_by", "id".to_string()),
                ("sort", "asc".to_string()),
                ("per_page", PROJECTS_PER_PAGE.to_string()),
                ("pagination", "keyset".to_string()),
            ]
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
        };

        let request = self.request(Method::GET, "/projects").query(&query);
        let response = self.execute(request, "list projects").await?;
        let next_token = next_link(response.headers())
            .and_then(|url| url.query().map(str::to_string))
            .filter(|query| !query.is_empty());

        let projects: Vec<GitLabProject> = response
            .json()
            .await
            .map_err(|e| GitProviderError::Decode(e.to_string()))?;
        debug!("Received {} projects", projects.len());

        let mut repos = Vec::with_capacity(projects.len());
        for project in projects {
            let default_branch = project.default_branch.unwrap_or_default();
            if !default_branch.is_empty() {
                self.default_branches
                    .set(project.path_with_namespace.clone(), default_branch.clone())
                    .await;
            }
            repos.push(Repository {
                name: project.name,
                full_name: project.path_with_namespace,
                url: project.web_url,
                default_branch,
            });
        }

        Ok(RepoPage {
            repos,
            next_cursor: next_token.map(|token| PageCursor::new(ProviderKind::GitLab, token)),
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
        let uses_default = branch.is_none();
        let branch = self.resolve_branch(repo, branch).await?;

        let last_commit_id = match self.fetch_file(repo, path, &branch).await {
            Ok(file) => Some(file.last_commit_id),
            Err(e) if e.is_not_found() => None,
            Err(e) if e.is_auth_failure() => return Err(e),
            Err(e) => {
                warn!(
                    "Could not read current revision of {} in {}, committing as a create: {}",
                    path, repo, e
                );
                None
            }
        };
        let is_update = last_commit_id.is_some();

        let body = CommitFileRequest {
            branch: &branch,
            commit_message: message,
            content: Some(content),
            last_commit_id,
        };
        let method = if is_update { Method::PUT } else { Method::POST };
        let request = self
            .request(method, &Self::file_path(repo, path)?)
            .json(&body);
        self.commit(repo, uses_default, request, "commit file").await?;

        info!(
            "{} {} in {} on {}",
            if is_update { "Updated" } else { "Created" },
            path,
            repo,
            branch
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
        let uses_default = branch.is_none();
        let branch = self.resolve_branch(repo, branch).await?;

        let last_commit_id = match self.fetch_file(repo, path, &branch).await {
            Ok(file) => file.last_commit_id,
            Err(e) if e.is_not_found() => {
                info!("{} does not exist in {}, nothing to delete", path, repo);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let body = CommitFileRequest {
            branch: &branch,
            commit_message: message,
            content: None,
            last_commit_id: Some(last_commit_id),
        };
        let request = self
            .request(Method::DELETE, &Self::file_path(repo, path)?)
            .json(&body);
        self.commit(repo, uses_default, request, "delete file").await?;

        info!("Deleted {} in {} on {}", path, repo, branch);
        Ok(())
    }

    async fn list_files(&self, repo: &str, path: Option<&str>) -> Lookup<Vec<FileEntry>> {
        Lookup::degrade("list files", self.read_directory(repo, path).await)
    }
}

/// `/projects/:id` with the namespace path as the id
fn project_path(full_name: &str) -> Result<String, GitProviderError> {
    let full_name = full_name.trim_matches('/');
    if full_name.is_empty() || !full_name.contains('/') {
        return Err(GitProviderError::NotFound(format!(
            "'{}' is not a namespaced project path",
            full_name
        )));
    }
    Ok(format!("/projects/{}", urlencoding::encode(full_name)))
}
