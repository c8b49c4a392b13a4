//! Wire types for the registry API

use crate::profiles::Loader;
use crate::sync::{FileHash, HashAlgorithm};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A downloadable file attached to a version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteFile {
    pub url: String,
    pub filename: String,
}

impl RemoteFile {
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
        }
    }
}

/// One published version of a project (`GET project/{id}/version`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub game_versions: Vec<String>,
    #[serde(default)]
    pub version_number: String,
    pub loaders: Vec<String>,
    pub files: Vec<RemoteFile>,
    pub date_published: DateTime<Utc>,
}

/// Version of a project as returned by the hash lookup endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFiles {
    pub project_id: String,
    pub files: Vec<RemoteFile>,
    pub date_published: DateTime<Utc>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version_number: Option<String>,
}

/// Hash lookup results keyed by project id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectFileSet {
    projects: BTreeMap<String, ProjectFiles>,
}

impl ProjectFileSet {
    /// Index what is installed now.
    ///
    /// Two local files can resolve to the same project (a stale duplicate);
    /// their files are merged and the older publish date is kept so the
    /// project still counts as outdated.
    pub fn installed(records: impl IntoIterator<Item = ProjectFiles>) -> Self {
        let mut projects: BTreeMap<String, ProjectFiles> = BTreeMap::new();
        for record in records {
            match projects.get_mut(&record.project_id) {
                Some(existing) => {
                    for file in record.files {
                        if !existing.files.iter().any(|f| f.filename == file.filename) {
                            existing.files.push(file);
                        }
                    }
                    if record.date_published < existing.date_published {
                        existing.date_published = record.date_published;
                        existing.name = record.name;
                        existing.version_number = record.version_number;
                    }
                }
                None => {
                    projects.insert(record.project_id.clone(), record);
                }
            }
        }
        Self { projects }
    }

    /// Index the newest available versions, keeping the most recent record
    /// per project.
    pub fn latest(records: impl IntoIterator<Item = ProjectFiles>) -> Self {
        let mut projects: BTreeMap<String, ProjectFiles> = BTreeMap::new();
        for record in records {
            let newer = projects
                .get(&record.project_id)
                .map_or(true, |existing| record.date_published > existing.date_published);
            if newer {
                projects.insert(record.project_id.clone(), record);
            }
        }
        Self { projects }
    }

    pub fn get(&self, project_id: &str) -> Option<&ProjectFiles> {
        self.projects.get(project_id)
    }

    /// Entries in project id order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProjectFiles)> {
        self.projects.iter()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

/// Search hit (`GET search`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub project_type: String,
    #[serde(default)]
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SearchResponse {
    pub hits: Vec<SearchHit>,
}

/// Body of `POST version_files` and `POST version_files/update`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashLookup {
    pub hashes: Vec<String>,
    pub algorithm: HashAlgorithm,
    pub loaders: Vec<String>,
    pub game_versions: Vec<String>,
}

impl HashLookup {
    /// Lookup for `hashes`, accepting every loader compatible with `loader`
    pub fn new(
        hashes: &[FileHash],
        algorithm: HashAlgorithm,
        loader: Loader,
        game_version: &str,
    ) -> Self {
        Self {
            hashes: hashes.iter().map(|h| h.digest.clone()).collect(),
            algorithm,
            loaders: loader.compatible_tags(),
            game_versions: vec![game_version.to_string()],
        }
    }
}
