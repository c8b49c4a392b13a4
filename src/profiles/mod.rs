//! Profile management for mod folders
//!
//! A profile pins one mods folder to a game version and a loader. The whole
//! set is stored as a single JSON document; at most one profile is active.

mod manager;

pub use manager::*;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Mod loader a profile (and a remote artifact) targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Quilt,
    Fabric,
    NeoForge,
    Forge,
}

impl Loader {
    pub fn as_str(&self) -> &'static str {
        match self {
            Loader::Quilt => "quilt",
            Loader::Fabric => "fabric",
            Loader::NeoForge => "neoforge",
            Loader::Forge => "forge",
        }
    }

    pub fn all() -> &'static [Loader] {
        &[Loader::Quilt, Loader::Fabric, Loader::NeoForge, Loader::Forge]
    }

    /// Loader tags whose artifacts run on this loader.
    ///
    /// Quilt loads Fabric mods and NeoForge loads Forge mods; the table is
    /// fixed and not configurable.
    pub fn compatible(&self) -> &'static [Loader] {
        match self {
            Loader::Quilt => &[Loader::Quilt, Loader::Fabric],
            Loader::NeoForge => &[Loader::NeoForge, Loader::Forge],
            Loader::Fabric => &[Loader::Fabric],
            Loader::Forge => &[Loader::Forge],
        }
    }

    /// Whether a registry loader tag is acceptable for this loader
    pub fn accepts(&self, tag: &str) -> bool {
        self.compatible().iter().any(|l| l.as_str() == tag)
    }

    /// Compatibility set as registry tags
    pub fn compatible_tags(&self) -> Vec<String> {
        self.compatible()
            .iter()
            .map(|l| l.as_str().to_string())
            .collect()
    }

    pub fn from_cli(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quilt" => Ok(Loader::Quilt),
            "fabric" => Ok(Loader::Fabric),
            "neoforge" | "neo-forge" => Ok(Loader::NeoForge),
            "forge" => Ok(Loader::Forge),
            other => bail!(
                "Invalid loader '{}'. Valid values: quilt, fabric, neoforge, forge",
                other
            ),
        }
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sync context: a folder, the game version and the loader it targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Stable identifier, never changes after creation
    pub id: Uuid,

    /// Display name, unique within the store
    pub name: String,

    /// Only one profile carries this flag at a time
    #[serde(default)]
    pub active: bool,

    /// Mods folder this profile keeps in sync
    pub folder: PathBuf,

    /// Target game version, e.g. "1.20.1"
    pub game_version: String,

    pub loader: Loader,
}

impl Profile {
    pub fn new(
        name: impl Into<String>,
        folder: impl Into<PathBuf>,
        game_version: impl Into<String>,
        loader: Loader,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            active: false,
            folder: folder.into(),
            game_version: game_version.into(),
            loader,
        }
    }
}

/// Persisted layout of the profile store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDocument {
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl ProfileDocument {
    pub fn active(&self) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.active)
    }

    pub fn find(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Append a profile and make it the active one
    pub fn insert(&mut self, mut profile: Profile) -> Result<&Profile> {
        if self.find(&profile.name).is_some() {
            bail!("Profile '{}' already exists", profile.name);
        }
        for p in &mut self.profiles {
            p.active = false;
        }
        profile.active = true;
        self.profiles.push(profile);
        Ok(&self.profiles[self.profiles.len() - 1])
    }

    /// Mark the named profile active and clear the flag everywhere else
    pub fn activate(&mut self, name: &str) -> Result<()> {
        if self.find(name).is_none() {
            bail!("Profile '{}' not found", name);
        }
        for p in &mut self.profiles {
            p.active = p.name == name;
        }
        Ok(())
    }

    /// Remove a profile.
    ///
    /// When the removed profile was active and others remain, `switch_to`
    /// (or the first remaining profile) becomes active. Returns the removed
    /// profile.
    pub fn remove(&mut self, name: &str, switch_to: Option<&str>) -> Result<Profile> {
        let index = self
            .profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| anyhow::anyhow!("Profile '{}' not found", name))?;

        if let Some(target) = switch_to {
            if target == name {
                bail!("Cannot switch to the profile being deleted");
            }
            if self.find(target).is_none() {
                bail!("Profile '{}' not found", target);
            }
        }

        let removed = self.profiles.remove(index);

        if removed.active && !self.profiles.is_empty() {
            match switch_to {
                Some(target) => self.activate(target)?,
                None => self.profiles[0].active = true,
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(names: &[&str]) -> ProfileDocument {
        let mut doc = ProfileDocument::default();
        for name in names {
            doc.insert(Profile::new(*name, "/tmp/mods", "1.20.1", Loader::Fabric))
                .unwrap();
        }
        doc
    }

    fn active_count(doc: &ProfileDocument) -> usize {
        doc.profiles.iter().filter(|p| p.active).count()
    }

    #[test]
    fn compatibility_table_is_closed() {
        assert_eq!(Loader::Quilt.compatible(), &[Loader::Quilt, Loader::Fabric]);
        assert_eq!(
            Loader::NeoForge.compatible(),
            &[Loader::NeoForge, Loader::Forge]
        );
        assert_eq!(Loader::Fabric.compatible(), &[Loader::Fabric]);
        assert_eq!(Loader::Forge.compatible(), &[Loader::Forge]);

        assert!(Loader::Quilt.accepts("fabric"));
        assert!(!Loader::Fabric.accepts("quilt"));
        assert!(Loader::NeoForge.accepts("forge"));
        assert!(!Loader::Forge.accepts("neoforge"));
    }

    #[test]
    fn loader_parses_cli_values() {
        assert_eq!(Loader::from_cli("Quilt").unwrap(), Loader::Quilt);
        assert_eq!(Loader::from_cli("neoforge").unwrap(), Loader::NeoForge);
        assert!(Loader::from_cli("liteloader").is_err());
    }

    #[test]
    fn loader_serializes_lowercase() {
        let json = serde_json::to_string(&Loader::NeoForge).unwrap();
        assert_eq!(json, "\"neoforge\"");
    }

    #[test]
    fn newest_profile_becomes_active() {
        let doc = doc_with(&["a", "b", "c"]);
        assert_eq!(active_count(&doc), 1);
        assert_eq!(doc.active().unwrap().name, "c");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut doc = doc_with(&["a"]);
        let dup = Profile::new("a", "/tmp", "1.21", Loader::Forge);
        assert!(doc.insert(dup).is_err());
    }

    #[test]
    fn activate_moves_the_flag() {
        let mut doc = doc_with(&["a", "b"]);
        doc.activate("a").unwrap();
        assert_eq!(doc.active().unwrap().name, "a");
        assert_eq!(active_count(&doc), 1);
        assert!(doc.activate("missing").is_err());
    }

    #[test]
    fn deleting_active_profile_promotes_a_replacement() {
        let mut doc = doc_with(&["a", "b", "c"]);
        doc.remove("c", None).unwrap();
        assert_eq!(doc.active().unwrap().name, "a");
        assert_eq!(active_count(&doc), 1);
    }

    #[test]
    fn deleting_active_profile_honours_switch_target() {
        let mut doc = doc_with(&["a", "b", "c"]);
        doc.remove("c", Some("b")).unwrap();
        assert_eq!(doc.active().unwrap().name, "b");
        assert_eq!(active_count(&doc), 1);
    }

    #[test]
    fn deleting_inactive_profile_keeps_active_one() {
        let mut doc = doc_with(&["a", "b"]);
        doc.remove("a", None).unwrap();
        assert_eq!(doc.active().unwrap().name, "b");
    }

    #[test]
    fn deleting_last_profile_leaves_no_active() {
        let mut doc = doc_with(&["a"]);
        doc.remove("a", None).unwrap();
        assert!(doc.active().is_none());
        assert!(doc.profiles.is_empty());
    }

    #[test]
    fn profile_ids_survive_activation_changes() {
        let mut doc = doc_with(&["a", "b"]);
        let id = doc.find("a").unwrap().id;
        doc.activate("a").unwrap();
        doc.activate("b").unwrap();
        assert_eq!(doc.find("a").unwrap().id, id);
    }
}
