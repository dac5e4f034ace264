//! Hosted-Git access for Argodeck
//!
//! This crate puts GitHub and GitLab behind one asynchronous interface so that
//! callers can browse repositories, scan trees and commit manifest files without
//! knowing which backend they talk to.
//!
//! # Features
//!
//! - **Uniform adapters**: `GitProvider` is implemented once per backend
//! - **Opaque pagination**: page numbers (GitHub) and keyset tokens (GitLab) both
//!   surface as a `PageCursor`
//! - **Complete scans**: tree listings are followed until exhausted
//! - **Safe writes**: updates and deletes always carry the current revision token
//!
//! # Usage
//!
//! ```ignore
//! use argodeck_git::get_provider;
//!
//! let provider = get_provider(&token, "gitlab")?;
//! let page = provider.list_repos(None).await?;
//!
//! for repo in &page.repos {
//!     let files = provider.scan_repo(&repo.full_name, None).await.unwrap_or_default();
//!     println!("{}: {} files", repo.full_name, files.len());
//! }
//! ```
//!
//! Reads return a `Lookup`, which keeps "not there" apart from "could not ask".
//! Writes return `Result` and never swallow a failure.

pub mod cache;
pub mod config;
pub mod errors;
mod http;
pub mod pagination;
pub mod providers;

// Re-export main types
pub use config::GitHostConfig;
pub use errors::GitProviderError;
pub use providers::{
    get_provider, Credential, EntryKind, FileEntry, GitHubProvider, GitLabProvider, GitProvider,
    GitProviderFactory, Lookup, PageCursor, ProviderKind, RepoPage, Repository,
};
