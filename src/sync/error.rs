//! Error taxonomy for the synchronization engine

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while scanning, resolving, reconciling or downloading.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No active profile found, create one with 'gorium profile create'")]
    ConfigMissing,

    #[error("Registry request to {endpoint} failed: {reason}")]
    RegistryUnavailable { endpoint: String, reason: String },

    #[error("Malformed registry response from {endpoint}: {source}")]
    RegistryFormat {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No versions found for '{project}' ({loader}, {game_version})")]
    NoCompatibleVersion {
        project: String,
        game_version: String,
        loader: String,
    },

    #[error("Transfer of {filename} failed: {reason}")]
    Transfer { filename: String, reason: String },

    #[error("IO error at {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot scan mods folder {path:?}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Outcomes that are reported to the user but are not process failures.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            SyncError::ConfigMissing | SyncError::NoCompatibleVersion { .. }
        )
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
