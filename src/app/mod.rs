//! Application wiring for CLI commands

mod actions;

pub use actions::parse_selection;

use crate::config::Config;
use crate::profiles::{Profile, ProfileManager};
use crate::registry::RegistryClient;
use crate::sync::{Downloader, FileTransfer, SyncEngine, SyncError, TransferState};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

/// Main application struct that orchestrates all components
pub struct App {
    /// Application configuration
    pub config: Config,

    /// Profile store
    pub profiles: ProfileManager,

    /// Scan/resolve/reconcile/download pipelines
    pub engine: SyncEngine,

    /// Shared with the downloader; ticks once per finished file
    progress: ProgressBar,
}

impl App {
    /// Create a new App instance
    pub async fn new(config: Config) -> Result<Self> {
        config.ensure_dirs().context("Failed to create directories")?;

        let registry = RegistryClient::new(&config.registry)?;

        let progress = ProgressBar::new(0);
        progress.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {wide_msg}")
                .context("Invalid progress template")?
                .progress_chars("=> "),
        );
        let downloader = Downloader::new(&config.download)?.with_progress(progress.clone());

        let engine = SyncEngine::new(Arc::new(registry), downloader, config.hash_algorithm);
        let profiles = ProfileManager::new(config.paths.profiles_file());

        Ok(Self {
            config,
            profiles,
            engine,
            progress,
        })
    }

    /// The active profile, or `ConfigMissing` when there is none
    pub async fn require_profile(&self) -> Result<Profile> {
        match self.profiles.active_profile().await? {
            Some(profile) => {
                tracing::debug!(
                    "Active profile '{}': {:?} ({} {})",
                    profile.name,
                    profile.folder,
                    profile.loader,
                    profile.game_version
                );
                Ok(profile)
            }
            None => Err(SyncError::ConfigMissing.into()),
        }
    }

    /// Print per-file results and return how many failed
    fn report_transfers(&self, transfers: &[FileTransfer]) -> usize {
        self.progress.finish_and_clear();

        let mut failed = 0;
        for transfer in transfers {
            match &transfer.state {
                TransferState::Complete { bytes } => {
                    println!("  + {} ({} bytes)", transfer.file.filename, bytes);
                }
                TransferState::Failed { error } => {
                    failed += 1;
                    println!("  ! {}", error);
                }
            }
        }
        failed
    }
}
