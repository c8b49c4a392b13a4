//! Sync pipelines: add, search/install and upgrade

use super::download::{Downloader, FileTransfer};
use super::error::{SyncError, SyncResult};
use super::reconcile::{reconcile, Reconciliation};
use super::resolve::{hit_matches, installable_files, resolve};
use super::scan::{scan_directory, HashAlgorithm};
use crate::profiles::Profile;
use crate::registry::{HashLookup, ProjectFileSet, Registry, RemoteFile, SearchHit};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// What an upgrade found and did
#[derive(Debug)]
pub enum UpgradeOutcome {
    /// The mods folder holds no files
    NoMods,
    /// Every recognised project is on its latest compatible version
    UpToDate { scanned: usize },
    Applied(UpgradeReport),
}

#[derive(Debug)]
pub struct UpgradeReport {
    pub scanned: usize,
    /// Files deleted before downloading
    pub removed: Vec<String>,
    /// Removals that failed; the files are still on disk
    pub failed_removals: Vec<SyncError>,
    pub transfers: Vec<FileTransfer>,
}

/// Result of installing a set of projects
#[derive(Debug, Default)]
pub struct InstallReport {
    pub transfers: Vec<FileTransfer>,
    /// Projects without a compatible version
    pub unresolved: Vec<SyncError>,
}

/// Runs the sync pipelines for one profile at a time
pub struct SyncEngine {
    registry: Arc<dyn Registry>,
    downloader: Downloader,
    algorithm: HashAlgorithm,
}

impl SyncEngine {
    pub fn new(
        registry: Arc<dyn Registry>,
        downloader: Downloader,
        algorithm: HashAlgorithm,
    ) -> Self {
        Self {
            registry,
            downloader,
            algorithm,
        }
    }

    /// Files to fetch for the newest compatible version of `project`
    pub async fn resolve_project(
        &self,
        profile: &Profile,
        project: &str,
    ) -> SyncResult<Vec<RemoteFile>> {
        let versions = self.registry.project_versions(project).await?;

        let version = resolve(&versions, &profile.game_version, profile.loader).ok_or_else(|| {
            SyncError::NoCompatibleVersion {
                project: project.to_string(),
                game_version: profile.game_version.clone(),
                loader: profile.loader.to_string(),
            }
        })?;

        tracing::info!(
            "Resolved {} to {} ({})",
            project,
            version.version_number,
            version.date_published
        );
        Ok(installable_files(&version.files))
    }

    /// Resolve a single project and download its primary file.
    ///
    /// Only the first installable file is fetched; companion jars of the
    /// same version stay out of the mods folder.
    pub async fn add(&self, profile: &Profile, project: &str) -> SyncResult<Vec<FileTransfer>> {
        let files = self.resolve_project(profile, project).await?;
        let primary: Vec<RemoteFile> = files.into_iter().take(1).collect();
        if primary.is_empty() {
            tracing::warn!("{} has no installable file", project);
        }
        Ok(self.downloader.execute(&profile.folder, primary).await)
    }

    /// Search hits installable on the profile's game version and loader
    pub async fn search(
        &self,
        profile: &Profile,
        query: &str,
        limit: u32,
    ) -> SyncResult<Vec<SearchHit>> {
        let hits = self.registry.search(query, limit).await?;
        let total = hits.len();
        let hits: Vec<_> = hits
            .into_iter()
            .filter(|hit| hit_matches(hit, &profile.game_version, profile.loader))
            .collect();
        tracing::debug!(
            "Search '{}': {} of {} hit(s) compatible",
            query,
            hits.len(),
            total
        );
        Ok(hits)
    }

    /// Resolve every project and download the union of their installable files.
    ///
    /// A project without a compatible version is reported and skipped; the
    /// others are still installed.
    pub async fn install(
        &self,
        profile: &Profile,
        projects: &[String],
    ) -> SyncResult<InstallReport> {
        let mut report = InstallReport::default();
        let mut queued = HashSet::new();
        let mut files = Vec::new();

        for project in projects {
            match self.resolve_project(profile, project).await {
                Ok(resolved) => {
                    for file in resolved {
                        if queued.insert(file.filename.clone()) {
                            files.push(file);
                        }
                    }
                }
                Err(e) if e.is_informational() => {
                    tracing::warn!("{}", e);
                    report.unresolved.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        report.transfers = self.downloader.execute(&profile.folder, files).await;
        Ok(report)
    }

    async fn lookup(&self, profile: &Profile) -> SyncResult<Option<HashLookup>> {
        let hashes = scan_directory(&profile.folder, self.algorithm).await?;
        if hashes.is_empty() {
            return Ok(None);
        }
        Ok(Some(HashLookup::new(
            &hashes,
            self.algorithm,
            profile.loader,
            &profile.game_version,
        )))
    }

    /// What the registry says is installed in the profile's folder
    pub async fn installed(&self, profile: &Profile) -> SyncResult<ProjectFileSet> {
        match self.lookup(profile).await? {
            Some(lookup) => self.registry.version_files(&lookup).await,
            None => Ok(ProjectFileSet::default()),
        }
    }

    /// Compute the upgrade without touching the folder.
    ///
    /// Both lookups must succeed before anything is compared; a malformed
    /// response aborts here.
    pub async fn plan_upgrade(
        &self,
        profile: &Profile,
    ) -> SyncResult<Option<(usize, Reconciliation)>> {
        let Some(lookup) = self.lookup(profile).await? else {
            return Ok(None);
        };
        let scanned = lookup.hashes.len();

        let current = self.registry.version_files(&lookup).await?;
        let latest = self.registry.version_files_update(&lookup).await?;
        tracing::debug!(
            "{} file(s) matched {} project(s), {} with an available version",
            scanned,
            current.len(),
            latest.len()
        );

        Ok(Some((scanned, reconcile(&current, &latest, &profile.folder))))
    }

    /// Full upgrade: remove stale files, then fetch their replacements
    pub async fn upgrade(&self, profile: &Profile) -> SyncResult<UpgradeOutcome> {
        let Some((scanned, plan)) = self.plan_upgrade(profile).await? else {
            return Ok(UpgradeOutcome::NoMods);
        };

        if plan.is_empty() {
            return Ok(UpgradeOutcome::UpToDate { scanned });
        }

        tracing::info!(
            "Upgrade plan: remove {}, add {}",
            plan.remove_files.len(),
            plan.add_files.len()
        );

        let (removed, failed_removals) = remove_files(&profile.folder, &plan.remove_files).await;
        let transfers = self.downloader.execute(&profile.folder, plan.add_files).await;

        Ok(UpgradeOutcome::Applied(UpgradeReport {
            scanned,
            removed,
            failed_removals,
            transfers,
        }))
    }
}

/// Delete stale files. Already-absent files count as removed.
async fn remove_files<'a>(
    folder: &Path,
    names: impl IntoIterator<Item = &'a String>,
) -> (Vec<String>, Vec<SyncError>) {
    let mut removed = Vec::new();
    let mut failed = Vec::new();

    for name in names {
        let path = folder.join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Removed {}", name);
                removed.push(name.clone());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{} already absent", name);
                removed.push(name.clone());
            }
            Err(e) => {
                tracing::error!("Failed to remove {:?}: {}", path, e);
                failed.push(SyncError::fs(path, e));
            }
        }
    }

    (removed, failed)
}
