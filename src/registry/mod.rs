//! Modrinth registry integration

mod client;
mod types;

pub use client::{build_http_client, RegistryClient};
pub use types::{HashLookup, ProjectFileSet, ProjectFiles, RemoteFile, SearchHit, VersionRecord};

use crate::sync::SyncResult;
use async_trait::async_trait;

/// Identifies the tool on every outgoing request
pub const USER_AGENT: &str = concat!("gorium/", env!("CARGO_PKG_VERSION"));

/// Request/response contract the sync engine relies on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Registry: Send + Sync {
    /// Every published version of a project
    async fn project_versions(&self, project: &str) -> SyncResult<Vec<VersionRecord>>;

    /// Full-text project search
    async fn search(&self, query: &str, limit: u32) -> SyncResult<Vec<SearchHit>>;

    /// Versions the given hashes currently belong to
    async fn version_files(&self, lookup: &HashLookup) -> SyncResult<ProjectFileSet>;

    /// Latest compatible versions of the projects the hashes belong to
    async fn version_files_update(&self, lookup: &HashLookup) -> SyncResult<ProjectFileSet>;
}
