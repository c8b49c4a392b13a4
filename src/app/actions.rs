//! CLI command action handlers

use super::App;
use crate::profiles::Loader;
use crate::sync::UpgradeOutcome;
use anyhow::{bail, Context, Result};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Parse a whitespace-separated list of 1-based result numbers.
///
/// Returns 0-based indices in input order without duplicates.
pub fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>> {
    let mut picked = Vec::new();
    for token in input.split_whitespace() {
        let number: usize = token
            .parse()
            .with_context(|| format!("'{}' is not a result number", token))?;
        if number == 0 || number > count {
            bail!("Result number {} is out of range (1-{})", number, count);
        }
        if !picked.contains(&(number - 1)) {
            picked.push(number - 1);
        }
    }
    Ok(picked)
}

impl App {
    // ========== Sync Commands ==========

    pub async fn cmd_add(&self, project: &str) -> Result<()> {
        let profile = self.require_profile().await?;

        println!(
            "Adding {} to '{}' ({} {})",
            project, profile.name, profile.loader, profile.game_version
        );
        let transfers = self.engine.add(&profile, project).await?;

        let failed = self.report_transfers(&transfers);
        if failed > 0 {
            bail!("{} of {} download(s) failed", failed, transfers.len());
        }
        println!("Installed {} file(s) into {}", transfers.len(), profile.folder.display());
        Ok(())
    }

    pub async fn cmd_upgrade(&self) -> Result<()> {
        let profile = self.require_profile().await?;

        println!("Checking {} for updates...", profile.folder.display());
        match self.engine.upgrade(&profile).await? {
            UpgradeOutcome::NoMods => {
                println!("No mods found in {}", profile.folder.display());
            }
            UpgradeOutcome::UpToDate { scanned } => {
                println!("No updates found ({} file(s) checked)", scanned);
            }
            UpgradeOutcome::Applied(report) => {
                for name in &report.removed {
                    println!("  - {}", name);
                }
                for error in &report.failed_removals {
                    println!("  ! {}", error);
                }
                let failed = self.report_transfers(&report.transfers);

                let problems = failed + report.failed_removals.len();
                if problems > 0 {
                    bail!("Upgrade finished with {} problem(s)", problems);
                }
                println!(
                    "Upgraded: {} removed, {} downloaded",
                    report.removed.len(),
                    report.transfers.len()
                );
            }
        }
        Ok(())
    }

    pub async fn cmd_search(&self, query: &str, select: Option<&str>) -> Result<()> {
        let profile = self.require_profile().await?;

        let hits = self
            .engine
            .search(&profile, query, self.config.registry.search_limit)
            .await?;

        if hits.is_empty() {
            println!(
                "No results for '{}' on {} {}",
                query, profile.loader, profile.game_version
            );
            return Ok(());
        }

        println!("Results for '{}':", query);
        println!("{:-<60}", "");
        for (i, hit) in hits.iter().enumerate() {
            println!("{:>3}. {} ({})", i + 1, hit.title, hit.project_id);
            if let Some(description) = &hit.description {
                println!("     {}", description);
            }
        }

        let input = match select {
            Some(s) => s.to_string(),
            None => {
                println!("Enter result numbers to install (e.g. \"1 3\"), or nothing to skip:");
                let mut line = String::new();
                BufReader::new(tokio::io::stdin())
                    .read_line(&mut line)
                    .await
                    .context("Failed to read selection")?;
                line
            }
        };

        let picked = parse_selection(&input, hits.len())?;
        if picked.is_empty() {
            println!("Nothing selected.");
            return Ok(());
        }

        let projects: Vec<String> = picked
            .iter()
            .map(|&i| hits[i].project_id.clone())
            .collect();
        let report = self.engine.install(&profile, &projects).await?;

        for error in &report.unresolved {
            println!("  {}", error);
        }
        let failed = self.report_transfers(&report.transfers);
        if failed > 0 {
            bail!("{} of {} download(s) failed", failed, report.transfers.len());
        }
        Ok(())
    }

    pub async fn cmd_list(&self) -> Result<()> {
        let profile = self.require_profile().await?;

        let installed = self.engine.installed(&profile).await?;
        if installed.is_empty() {
            println!("No mods found in {}", profile.folder.display());
            return Ok(());
        }

        println!("Mods in '{}' ({}):", profile.name, profile.folder.display());
        println!("{:-<60}", "");
        for (project_id, entry) in installed.iter() {
            let name = entry.name.as_deref().unwrap_or(project_id.as_str());
            match &entry.version_number {
                Some(version) => println!("  {} {} ({})", name, version, project_id),
                None => println!("  {} ({})", name, project_id),
            }
        }
        Ok(())
    }

    // ========== Profile Commands ==========

    pub async fn cmd_profile_list(&self) -> Result<()> {
        let profiles = self.profiles.list_profiles().await?;

        if profiles.is_empty() {
            println!("No profiles. Create one with 'gorium profile create'.");
            return Ok(());
        }

        println!("Profiles:");
        for profile in &profiles {
            let marker = if profile.active { " [active]" } else { "" };
            println!(
                "  {}{}\n    {} {} at {}",
                profile.name,
                marker,
                profile.loader,
                profile.game_version,
                profile.folder.display()
            );
        }
        Ok(())
    }

    pub async fn cmd_profile_create(
        &self,
        name: &str,
        folder: &Path,
        game_version: &str,
        loader: &str,
    ) -> Result<()> {
        let loader = Loader::from_cli(loader)?;
        let profile = self
            .profiles
            .create_profile(name, folder, game_version, loader)
            .await?;
        println!(
            "Created profile '{}' ({} {}) and made it active",
            profile.name, profile.loader, profile.game_version
        );
        Ok(())
    }

    pub async fn cmd_profile_delete(&self, name: &str, switch_to: Option<&str>) -> Result<()> {
        let promoted = self.profiles.delete_profile(name, switch_to).await?;
        println!("Deleted profile '{}'", name);
        if let Some(profile) = promoted {
            println!("Active profile is now '{}'", profile.name);
        }
        Ok(())
    }

    pub async fn cmd_profile_switch(&self, name: &str) -> Result<()> {
        let profile = self.profiles.switch_profile(name).await?;
        println!("Switched to profile: {}", profile.name);
        Ok(())
    }
}
