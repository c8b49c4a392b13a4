//! Version resolution for a game version and loader

use crate::profiles::Loader;
use crate::registry::{RemoteFile, SearchHit, VersionRecord};

/// Files carrying this token in their name are source archives and are
/// never installed.
pub const SOURCES_TOKEN: &str = "sources";

/// Whether a version targets `game_version` on a loader compatible with `loader`
pub fn is_compatible(version: &VersionRecord, game_version: &str, loader: Loader) -> bool {
    version.game_versions.iter().any(|v| v == game_version)
        && version.loaders.iter().any(|tag| loader.accepts(tag))
}

/// Pick the most recently published compatible version.
///
/// Ordering is by `date_published` only; version numbers are free-form and
/// never compared. On equal timestamps the earliest candidate wins.
pub fn resolve<'a>(
    candidates: &'a [VersionRecord],
    game_version: &str,
    loader: Loader,
) -> Option<&'a VersionRecord> {
    let mut best: Option<&VersionRecord> = None;
    for version in candidates
        .iter()
        .filter(|v| is_compatible(v, game_version, loader))
    {
        match best {
            Some(current) if version.date_published <= current.date_published => {}
            _ => best = Some(version),
        }
    }
    best
}

/// Whether a search hit is a mod installable on this game version and loader
pub fn hit_matches(hit: &SearchHit, game_version: &str, loader: Loader) -> bool {
    hit.project_type == "mod"
        && hit.versions.iter().any(|v| v == game_version)
        && hit.categories.iter().any(|c| loader.accepts(c))
}

pub fn is_sources_archive(filename: &str) -> bool {
    filename.contains(SOURCES_TOKEN)
}

/// Files of a version that should land in the mods folder
pub fn installable_files(files: &[RemoteFile]) -> Vec<RemoteFile> {
    files
        .iter()
        .filter(|f| !is_sources_archive(&f.filename))
        .cloned()
        .collect()
}
