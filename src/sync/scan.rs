//! Content fingerprinting of a mods folder

use super::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha512};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;

const READ_CHUNK: usize = 64 * 1024;

/// Digest used for fingerprints; sent to the registry as `algorithm`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha1,
    #[default]
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fingerprint of one local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHash {
    pub path: PathBuf,
    pub algorithm: HashAlgorithm,
    /// Lowercase hex digest
    pub digest: String,
}

/// Hash every regular file directly inside `dir`.
///
/// Subdirectories are not traversed. A file that cannot be read is skipped;
/// only failing to list `dir` itself is an error. Results are ordered by path.
pub async fn scan_directory(dir: &Path, algorithm: HashAlgorithm) -> SyncResult<Vec<FileHash>> {
    let scan_err = |source| SyncError::Scan {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir).await.map_err(scan_err)?;
    let mut hashes = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(scan_err)? {
        let path = entry.path();

        // Follows symlinks so a linked jar counts as a regular file
        let metadata = match fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        if let Some(hash) = fingerprint(path, algorithm).await {
            hashes.push(hash);
        }
    }

    hashes.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!("Fingerprinted {} file(s) in {:?}", hashes.len(), dir);
    Ok(hashes)
}

/// Hash one file, or log and skip it when it cannot be read
async fn fingerprint(path: PathBuf, algorithm: HashAlgorithm) -> Option<FileHash> {
    match hash_file(&path, algorithm).await {
        Ok(digest) => {
            tracing::trace!("{} {} {:?}", algorithm, digest, path);
            Some(FileHash {
                path,
                algorithm,
                digest,
            })
        }
        Err(e) => {
            tracing::warn!("Skipping unreadable file {:?}: {}", path, e);
            None
        }
    }
}

/// Hex digest of a single file
pub async fn hash_file(path: &Path, algorithm: HashAlgorithm) -> std::io::Result<String> {
    match algorithm {
        HashAlgorithm::Sha1 => digest_file::<Sha1>(path).await,
        HashAlgorithm::Sha512 => digest_file::<Sha512>(path).await,
    }
}

async fn digest_file<D: Digest>(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = D::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
