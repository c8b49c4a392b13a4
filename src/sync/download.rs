//! Bounded-concurrency download executor

use super::error::{SyncError, SyncResult};
use crate::config::DownloadConfig;
use crate::registry::{build_http_client, RemoteFile};
use anyhow::Context;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const BASE_RETRY_DELAY_MS: u64 = 500;
const MAX_RETRY_DELAY_MS: u64 = 8000;

/// Final state of one file
#[derive(Debug)]
pub enum TransferState {
    Complete { bytes: u64 },
    Failed { error: SyncError },
}

/// Outcome of fetching one file of an add-set
#[derive(Debug)]
pub struct FileTransfer {
    pub file: RemoteFile,
    pub state: TransferState,
}

impl FileTransfer {
    pub fn is_complete(&self) -> bool {
        matches!(self.state, TransferState::Complete { .. })
    }
}

/// A single attempt's failure and whether another attempt may help
struct AttemptError {
    reason: String,
    retryable: bool,
}

impl AttemptError {
    fn retry(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            retryable: true,
        }
    }

    fn fatal(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            retryable: false,
        }
    }
}

/// Whether `name` is a bare file name that stays inside the target folder
pub fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Fetches add-sets into a folder, one independent transfer per file
pub struct Downloader {
    client: reqwest::Client,
    concurrency: usize,
    idle_timeout: Duration,
    max_retries: u32,
    progress: Option<ProgressBar>,
}

impl Downloader {
    pub fn new(config: &DownloadConfig) -> anyhow::Result<Self> {
        // No overall timeout: body size is unbounded, stalls are caught per chunk
        let client = build_http_client(None).context("Failed to create HTTP client")?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: &DownloadConfig) -> Self {
        Self {
            client,
            concurrency: config.concurrency.max(1),
            idle_timeout: config.idle_timeout(),
            max_retries: config.max_retries,
            progress: None,
        }
    }

    /// Tick `bar` once per finished file
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    /// Download every file into `target_dir`.
    ///
    /// Transfers run concurrently up to the configured limit. A failing file
    /// never affects its siblings; every input yields exactly one result, in
    /// completion order.
    pub async fn execute(&self, target_dir: &Path, files: Vec<RemoteFile>) -> Vec<FileTransfer> {
        tracing::info!(
            "Downloading {} file(s) to {:?} (concurrency={})",
            files.len(),
            target_dir,
            self.concurrency
        );

        if let Some(bar) = &self.progress {
            bar.set_length(files.len() as u64);
        }

        stream::iter(files)
            .map(|file| async move {
                let state = match self.transfer(target_dir, &file).await {
                    Ok(bytes) => {
                        tracing::info!("Downloaded {} ({} bytes)", file.filename, bytes);
                        TransferState::Complete { bytes }
                    }
                    Err(error) => {
                        tracing::error!("{}", error);
                        TransferState::Failed { error }
                    }
                };
                if let Some(bar) = &self.progress {
                    bar.set_message(file.filename.clone());
                    bar.inc(1);
                }
                FileTransfer { file, state }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }

    /// Fetch one file with retries; the destination only appears on success
    async fn transfer(&self, target_dir: &Path, file: &RemoteFile) -> SyncResult<u64> {
        let failed = |reason: String| SyncError::Transfer {
            filename: file.filename.clone(),
            reason,
        };

        if !is_plain_filename(&file.filename) {
            return Err(failed("filename is not a plain file name".to_string()));
        }

        tokio::fs::create_dir_all(target_dir)
            .await
            .map_err(|e| failed(format!("cannot create {:?}: {}", target_dir, e)))?;

        let dest = target_dir.join(&file.filename);
        let part = target_dir.join(format!(".{}.part", file.filename));

        let mut attempt = 0;
        let result = loop {
            attempt += 1;
            tracing::debug!("GET {} (attempt {})", file.url, attempt);

            match self.fetch_once(&file.url, &part).await {
                Ok(bytes) => break Ok(bytes),
                Err(e) if e.retryable && attempt <= self.max_retries => {
                    let delay = retry_delay(attempt);
                    tracing::warn!(
                        "{}: {} (attempt {}/{}), retrying in {}ms",
                        file.filename,
                        e.reason,
                        attempt,
                        self.max_retries + 1,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => break Err(e),
            }
        };

        match result {
            Ok(bytes) => match tokio::fs::rename(&part, &dest).await {
                Ok(()) => Ok(bytes),
                Err(e) => {
                    discard(&part).await;
                    Err(failed(format!("cannot move into place: {}", e)))
                }
            },
            Err(e) => {
                discard(&part).await;
                Err(failed(e.reason))
            }
        }
    }

    async fn fetch_once(&self, url: &str, part: &Path) -> Result<u64, AttemptError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_builder() {
                AttemptError::fatal(format!("invalid url {}: {}", url, e))
            } else {
                AttemptError::retry(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(AttemptError::retry(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(AttemptError::fatal(format!("HTTP {}", status)));
        }

        let mut out = tokio::fs::File::create(part)
            .await
            .map_err(|e| AttemptError::fatal(format!("cannot create {:?}: {}", part, e)))?;

        let mut written: u64 = 0;
        let mut body = response.bytes_stream();

        loop {
            let chunk = match tokio::time::timeout(self.idle_timeout, body.next()).await {
                Err(_) => {
                    return Err(AttemptError::retry(format!(
                        "stalled for {}s",
                        self.idle_timeout.as_secs()
                    )))
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => return Err(AttemptError::retry(e.to_string())),
                Ok(Some(Ok(chunk))) => chunk,
            };

            out.write_all(&chunk)
                .await
                .map_err(|e| AttemptError::fatal(format!("write failed: {}", e)))?;
            written += chunk.len() as u64;
        }

        out.flush()
            .await
            .map_err(|e| AttemptError::fatal(format!("write failed: {}", e)))?;

        Ok(written)
    }
}

/// Exponential backoff with 85-115% jitter
fn retry_delay(attempt: u32) -> Duration {
    let base = BASE_RETRY_DELAY_MS.saturating_mul(1 << (attempt.saturating_sub(1)).min(16));
    let jitter = rand::random::<f64>() * 0.3 + 0.85;
    Duration::from_millis(((base as f64 * jitter) as u64).min(MAX_RETRY_DELAY_MS))
}

async fn discard(part: &Path) {
    if let Err(e) = tokio::fs::remove_file(part).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Could not remove partial download {:?}: {}", part, e);
        }
    }
}
