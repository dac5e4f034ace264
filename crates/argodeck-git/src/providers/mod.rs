//! Git provider implementations
//!
//! This module contains the provider trait definitions, the factory, and the
//! GitHub and GitLab adapters.

pub mod factory;
pub mod github;
pub mod gitlab;
pub mod traits;

// Re-export commonly used types
pub use factory::{get_provider, GitProviderFactory};
pub use github::GitHubProvider;
pub use gitlab::GitLabProvider;
pub use traits::{
    Credential, EntryKind, FileEntry, GitProvider, Lookup, PageCursor, ProviderKind, RepoPage,
    Repository,
};
