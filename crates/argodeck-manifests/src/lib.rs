//! Argo CD manifests on top of `argodeck-git`
//!
//! Finds `Application` and `ApplicationSet` documents in a repository and
//! commits changes to them. Works with any `GitProvider`.

pub mod discovery;
pub mod errors;
pub mod manifest;
pub mod writer;

#[cfg(test)]
mod testing;

pub use discovery::{
    Discovery, ManifestScanner, SkippedFile, DEFAULT_CONCURRENCY, DEFAULT_FILE_LIMIT,
};
pub use errors::ManifestError;
pub use manifest::{is_yaml_candidate, is_yaml_path, parse_manifests, Manifest, ManifestKind};
pub use writer::ManifestWriter;
