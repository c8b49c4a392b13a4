//! Diff of installed registry state against the latest compatible state

use super::download::is_plain_filename;
use super::resolve::installable_files;
use crate::registry::{ProjectFileSet, RemoteFile};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// What an upgrade has to do to the mods folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Stale files to delete before downloading
    pub remove_files: BTreeSet<String>,
    /// Replacement files to fetch, unique by filename
    pub add_files: Vec<RemoteFile>,
}

impl Reconciliation {
    /// Nothing to fetch means nothing to do: removals never happen alone
    pub fn is_empty(&self) -> bool {
        self.add_files.is_empty()
    }
}

/// Reconcile against the files actually present in `folder`
pub fn reconcile(
    current: &ProjectFileSet,
    latest: &ProjectFileSet,
    folder: &Path,
) -> Reconciliation {
    reconcile_with(current, latest, |name| folder.join(name).is_file())
}

/// Reconcile with an injected existence check for filenames in the mods folder.
///
/// - a project with the same publish date on both sides is up to date
/// - every other project in `latest` contributes its installable files
/// - a project present on both sides with a different date contributes its
///   installed files (those that exist) to the remove-set
/// - a filename present on both sides is left alone
/// - without anything to add, nothing is removed
pub fn reconcile_with(
    current: &ProjectFileSet,
    latest: &ProjectFileSet,
    exists: impl Fn(&str) -> bool,
) -> Reconciliation {
    let mut add_files = Vec::new();
    let mut queued = HashSet::new();
    let mut remove_files = BTreeSet::new();

    for (project_id, newest) in latest.iter() {
        let installed = current.get(project_id);

        if let Some(installed) = installed {
            if installed.date_published == newest.date_published {
                continue;
            }
        }

        for file in installable_files(&newest.files) {
            if queued.insert(file.filename.clone()) {
                add_files.push(file);
            }
        }

        if let Some(installed) = installed {
            for file in &installed.files {
                if !is_plain_filename(&file.filename) {
                    tracing::warn!(
                        "Refusing to remove suspicious filename '{}' of {}",
                        file.filename,
                        project_id
                    );
                    continue;
                }
                if exists(&file.filename) {
                    remove_files.insert(file.filename.clone());
                }
            }
        }
    }

    // Re-adding an identical filename would delete and refetch the same file
    add_files.retain(|f| {
        if remove_files.remove(&f.filename) {
            tracing::debug!("{} is already in place, skipping", f.filename);
            false
        } else {
            true
        }
    });

    if add_files.is_empty() {
        remove_files.clear();
    }

    Reconciliation {
        remove_files,
        add_files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProjectFiles;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn files(names: &[&str]) -> Vec<RemoteFile> {
        names
            .iter()
            .map(|n| RemoteFile::new(format!("https://x/{}", n), *n))
            .collect()
    }

    fn entry(project: &str, date: &str, names: &[&str]) -> ProjectFiles {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        ProjectFiles {
            project_id: project.to_string(),
            files: files(names),
            date_published: Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap()),
            name: None,
            version_number: None,
        }
    }

    fn everything_exists(_: &str) -> bool {
        true
    }

    fn assert_invariants(result: &Reconciliation) {
        if result.add_files.is_empty() {
            assert!(result.remove_files.is_empty(), "removal without replacement");
        }
        for file in &result.add_files {
            assert!(
                !result.remove_files.contains(&file.filename),
                "{} both removed and added",
                file.filename
            );
        }
    }

    #[test]
    fn outdated_project_is_swapped() {
        let current = ProjectFileSet::installed(vec![entry("p1", "2024-01-01", &["a-1.jar"])]);
        let latest = ProjectFileSet::latest(vec![entry("p1", "2024-02-01", &["a-2.jar"])]);

        let result = reconcile_with(&current, &latest, everything_exists);

        assert_eq!(
            result.remove_files,
            BTreeSet::from(["a-1.jar".to_string()])
        );
        assert_eq!(
            result.add_files,
            vec![RemoteFile::new("https://x/a-2.jar", "a-2.jar")]
        );
    }

    #[test]
    fn identical_sets_are_a_no_op() {
        let records = vec![
            entry("p1", "2024-01-01", &["a-1.jar"]),
            entry("p2", "2024-01-05", &["b-1.jar"]),
        ];
        let current = ProjectFileSet::installed(records.clone());
        let latest = ProjectFileSet::latest(records);

        let result = reconcile_with(&current, &latest, everything_exists);
        assert_eq!(result, Reconciliation::default());
        assert!(result.is_empty());
    }

    #[test]
    fn only_changed_projects_are_touched() {
        let current = ProjectFileSet::installed(vec![
            entry("p1", "2024-01-01", &["a-1.jar"]),
            entry("p2", "2024-01-01", &["b-1.jar"]),
        ]);
        let latest = ProjectFileSet::latest(vec![
            entry("p1", "2024-01-01", &["a-1.jar"]),
            entry("p2", "2024-03-01", &["b-3.jar"]),
        ]);

        let result = reconcile_with(&current, &latest, everything_exists);
        assert_eq!(result.remove_files, BTreeSet::from(["b-1.jar".to_string()]));
        assert_eq!(result.add_files, files(&["b-3.jar"]));
    }

    #[test]
    fn sources_archives_are_never_added() {
        let current = ProjectFileSet::installed(vec![entry("p1", "2024-01-01", &["a-1.jar"])]);
        let latest = ProjectFileSet::latest(vec![entry(
            "p1",
            "2024-02-01",
            &["a-2.jar", "a-2-sources.jar"],
        )]);

        let result = reconcile_with(&current, &latest, everything_exists);
        assert_eq!(result.add_files, files(&["a-2.jar"]));
    }

    #[test]
    fn nothing_is_removed_when_nothing_can_be_added() {
        // The only newer file is a sources archive
        let current = ProjectFileSet::installed(vec![entry("p1", "2024-01-01", &["a-1.jar"])]);
        let latest =
            ProjectFileSet::latest(vec![entry("p1", "2024-02-01", &["a-2-sources.jar"])]);

        let result = reconcile_with(&current, &latest, everything_exists);
        assert!(result.add_files.is_empty());
        assert!(result.remove_files.is_empty());
    }

    #[test]
    fn absent_files_are_not_scheduled_for_removal() {
        let current = ProjectFileSet::installed(vec![entry(
            "p1",
            "2024-01-01",
            &["a-1.jar", "a-1-extra.jar"],
        )]);
        let latest = ProjectFileSet::latest(vec![entry("p1", "2024-02-01", &["a-2.jar"])]);

        let result = reconcile_with(&current, &latest, |name| name == "a-1.jar");
        assert_eq!(result.remove_files, BTreeSet::from(["a-1.jar".to_string()]));
    }

    #[test]
    fn same_filename_on_both_sides_is_left_in_place() {
        let current = ProjectFileSet::installed(vec![entry("p1", "2024-01-01", &["a.jar"])]);
        let latest = ProjectFileSet::latest(vec![entry("p1", "2024-02-01", &["a.jar"])]);

        let result = reconcile_with(&current, &latest, everything_exists);
        assert_eq!(result, Reconciliation::default());
    }

    #[test]
    fn shared_filename_is_kept_while_other_files_swap() {
        let current = ProjectFileSet::installed(vec![entry(
            "p1",
            "2024-01-01",
            &["core.jar", "addon-1.jar"],
        )]);
        let latest = ProjectFileSet::latest(vec![entry(
            "p1",
            "2024-02-01",
            &["core.jar", "addon-2.jar"],
        )]);

        let result = reconcile_with(&current, &latest, everything_exists);
        assert_eq!(result.remove_files, BTreeSet::from(["addon-1.jar".to_string()]));
        assert_eq!(result.add_files, files(&["addon-2.jar"]));
    }

    #[test]
    fn duplicate_filenames_across_projects_are_fetched_once() {
        let current = ProjectFileSet::installed(vec![
            entry("p1", "2024-01-01", &["a-1.jar"]),
            entry("p2", "2024-01-01", &["b-1.jar"]),
        ]);
        let latest = ProjectFileSet::latest(vec![
            entry("p1", "2024-02-01", &["shared.jar"]),
            entry("p2", "2024-02-01", &["shared.jar"]),
        ]);

        let result = reconcile_with(&current, &latest, everything_exists);
        assert_eq!(result.add_files, files(&["shared.jar"]));
    }

    #[test]
    fn path_like_filenames_are_never_removed() {
        let current =
            ProjectFileSet::installed(vec![entry("p1", "2024-01-01", &["../escape.jar"])]);
        let latest = ProjectFileSet::latest(vec![entry("p1", "2024-02-01", &["a-2.jar"])]);

        let result = reconcile_with(&current, &latest, everything_exists);
        assert!(result.remove_files.is_empty());
        assert_eq!(result.add_files, files(&["a-2.jar"]));
    }

    #[test]
    fn invariants_hold_across_mixed_scenarios() {
        let dates = ["2024-01-01", "2024-02-01"];
        let names: [&[&str]; 4] = [&["a.jar"], &["b.jar"], &["a.jar", "b.jar"], &["c-sources.jar"]];

        for current_date in dates {
            for latest_date in dates {
                for current_files in names {
                    for latest_files in names {
                        let current = ProjectFileSet::installed(vec![entry(
                            "p",
                            current_date,
                            current_files,
                        )]);
                        let latest =
                            ProjectFileSet::latest(vec![entry("p", latest_date, latest_files)]);
                        let result = reconcile_with(&current, &latest, everything_exists);
                        assert_invariants(&result);

                        if current_date == latest_date {
                            assert_eq!(result, Reconciliation::default());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn folder_existence_is_checked_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a-1.jar"), b"old").unwrap();

        let current = ProjectFileSet::installed(vec![entry(
            "p1",
            "2024-01-01",
            &["a-1.jar", "gone.jar"],
        )]);
        let latest = ProjectFileSet::latest(vec![entry("p1", "2024-02-01", &["a-2.jar"])]);

        let result = reconcile(&current, &latest, dir.path());
        assert_eq!(result.remove_files, BTreeSet::from(["a-1.jar".to_string()]));
    }
}
