//! Profile manager

use super::{Loader, Profile, ProfileDocument};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Profile manager handles profile CRUD operations against the JSON store
pub struct ProfileManager {
    path: PathBuf,
}

impl ProfileManager {
    /// Create a new ProfileManager backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the store; a missing file is an empty store
    pub async fn load(&self) -> Result<ProfileDocument> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(ProfileDocument::default());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read profiles from {:?}", self.path))?;

        if content.trim().is_empty() {
            return Ok(ProfileDocument::default());
        }

        serde_json::from_str(&content).context("Failed to parse profiles file")
    }

    /// Write the store
    pub async fn save(&self, doc: &ProfileDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create profiles directory")?;
        }

        let content = serde_json::to_string_pretty(doc).context("Failed to serialize profiles")?;
        fs::write(&self.path, content)
            .await
            .context("Failed to write profiles file")?;

        Ok(())
    }

    /// List all profiles in document order
    pub async fn list_profiles(&self) -> Result<Vec<Profile>> {
        Ok(self.load().await?.profiles)
    }

    /// The currently active profile, if any
    pub async fn active_profile(&self) -> Result<Option<Profile>> {
        Ok(self.load().await?.active().cloned())
    }

    /// Create a new profile and make it active
    pub async fn create_profile(
        &self,
        name: &str,
        folder: &Path,
        game_version: &str,
        loader: Loader,
    ) -> Result<Profile> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Profile name cannot be empty");
        }
        let game_version = game_version.trim();
        if game_version.is_empty() {
            bail!("Game version cannot be empty");
        }

        fs::create_dir_all(folder)
            .await
            .with_context(|| format!("Failed to create mods folder {:?}", folder))?;

        let mut doc = self.load().await?;
        let profile = doc
            .insert(Profile::new(name, folder, game_version, loader))?
            .clone();
        self.save(&doc).await?;

        tracing::info!("Created profile '{}' ({})", profile.name, profile.id);
        Ok(profile)
    }

    /// Delete a profile. Returns the newly active profile when the deleted
    /// one was active and a replacement was promoted.
    pub async fn delete_profile(
        &self,
        name: &str,
        switch_to: Option<&str>,
    ) -> Result<Option<Profile>> {
        let mut doc = self.load().await?;
        let removed = doc.remove(name, switch_to)?;
        self.save(&doc).await?;

        tracing::info!("Deleted profile '{}' ({})", removed.name, removed.id);

        if removed.active {
            Ok(doc.active().cloned())
        } else {
            Ok(None)
        }
    }

    /// Switch to a profile
    pub async fn switch_profile(&self, name: &str) -> Result<Profile> {
        let mut doc = self.load().await?;
        doc.activate(name)?;
        self.save(&doc).await?;

        let profile = doc
            .active()
            .cloned()
            .context("Profile switch left no active profile")?;
        tracing::info!("Switched to profile '{}'", profile.name);
        Ok(profile)
    }
}
