//! Slice aggregation over result folders
//!
//! A results root holds one folder per repository. A repository folder either
//! contains result files directly (one row for the whole repository) or one
//! sub-folder per dated slice, typically named after the snapshot window
//! (`2020-01_to_2020-05`), in which case each sub-folder becomes its own row.
//! Folders whose files hold no recognised smell yield no row.

use crate::dataset::DatasetLayout;
use crate::extract::{self, is_supported};
use crate::smells::SmellCounts;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One unit of aggregation: a whole repository, or one slice of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliceRow {
    pub repository: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    pub counts: SmellCounts,
}

impl SliceRow {
    pub fn is_sliced(&self) -> bool {
        self.slice_index.is_some()
    }
}

/// Sorted immediate entries of a directory, split into (sub-directories, files)
fn list_entries(folder: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut directories = Vec::new();
    let mut files = Vec::new();

    let entries = fs::read_dir(folder)
        .with_context(|| format!("Failed to read directory: {}", folder.display()))?;
    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to read entry in: {}", folder.display()))?;
        let path = entry.path();
        if path.is_dir() {
            directories.push(path);
        } else if path.is_file() {
            files.push(path);
        }
    }

    directories.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok((directories, files))
}

/// Qualifying result files directly inside `folder`, sorted by name
pub fn result_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let (_, files) = list_entries(folder)?;
    Ok(files.into_iter().filter(|path| is_supported(path)).collect())
}

/// Sum the counts of every qualifying file directly inside `folder`.
///
/// Returns `None` when the folder holds no qualifying file, or when its files
/// hold no recognised smell.
pub fn sum_folder(folder: &Path) -> Result<Option<SmellCounts>> {
    let files = result_files(folder)?;
    if files.is_empty() {
        debug!("No result files in {}", folder.display());
        return Ok(None);
    }

    let mut total = SmellCounts::new();
    for file in &files {
        let extraction = extract::extract(file);
        total += &extraction.counts;
    }

    if total.is_empty() {
        debug!("No recognised smells in {}", folder.display());
        return Ok(None);
    }
    Ok(Some(total))
}

/// Aggregate one repository folder into rows, choosing the mode from its shape.
///
/// With sub-directories present the folder is treated as sliced (see
/// [`aggregate_slices`]); otherwise its own files make up a single row.
pub fn aggregate(folder: &Path, repository: &str) -> Result<Vec<SliceRow>> {
    let (directories, _) = list_entries(folder)?;
    if directories.is_empty() {
        aggregate_repository(folder, repository)
    } else {
        aggregate_slices(folder, repository)
    }
}

/// One row for the files directly inside `folder`; sub-folders are ignored
pub fn aggregate_repository(folder: &Path, repository: &str) -> Result<Vec<SliceRow>> {
    Ok(sum_folder(folder)?
        .map(|counts| SliceRow {
            repository: repository.to_string(),
            slice_index: None,
            period: None,
            counts,
        })
        .into_iter()
        .collect())
}

/// One row per sub-folder of `folder`.
///
/// Sub-folders are visited in lexicographic order; each one that yields counts
/// gets a dense 1-based slice index and its name as the period label. Files
/// directly inside `folder` are ignored.
pub fn aggregate_slices(folder: &Path, repository: &str) -> Result<Vec<SliceRow>> {
    let (directories, _) = list_entries(folder)?;

    let mut rows = Vec::new();
    for directory in directories {
        let Some(counts) = sum_folder(&directory)? else {
            continue;
        };
        let period = directory
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        rows.push(SliceRow {
            repository: repository.to_string(),
            slice_index: Some(rows.len() as u32 + 1),
            period: Some(period),
            counts,
        });
    }
    Ok(rows)
}

/// Repository key for a result folder name
pub fn repository_key(folder_name: &str) -> String {
    folder_name.replace('\\', "/")
}

/// Aggregate every repository folder below a results root into rows shaped
/// for `layout`
pub fn aggregate_results(results_root: &Path, layout: DatasetLayout) -> Result<Vec<SliceRow>> {
    let (repositories, _) = list_entries(results_root)?;
    info!(
        "Aggregating {} repository folders under {} ({} layout)",
        repositories.len(),
        results_root.display(),
        layout
    );

    let mut rows = Vec::new();
    for folder in repositories {
        let name = folder
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let key = repository_key(&name);
        let (directories, files) = list_entries(&folder)?;
        let repo_rows = match layout {
            DatasetLayout::PerRepository => {
                if !directories.is_empty() {
                    debug!("{}: ignoring {} sub-folder(s)", key, directories.len());
                }
                aggregate_repository(&folder, &key)?
            }
            DatasetLayout::PerSlice => {
                if directories.is_empty() && files.iter().any(|path| is_supported(path)) {
                    warn!("{}: no slice folders, skipping its top-level result files", key);
                }
                aggregate_slices(&folder, &key)?
            }
        };
        debug!("{}: {} row(s)", key, repo_rows.len());
        rows.extend(repo_rows);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smells::SmellCategory;
    use tempfile::TempDir;

    #[test]
    fn test_repository_key_normalizes_backslashes() {
        assert_eq!(repository_key("owner\\repo"), "owner/repo");
        assert_eq!(repository_key("owner_repo"), "owner_repo");
    }

    #[test]
    fn test_folder_without_result_files_yields_no_row() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("README.md"), "nothing here").unwrap();

        let rows = aggregate(dir.path(), "acme/empty").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_zero_count_files_yield_no_row() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.csv"), "type\nXYZ\n").unwrap();
        fs::write(dir.path().join("b.csv"), "name\nfoo\n").unwrap();

        assert!(sum_folder(dir.path()).unwrap().is_none());
        assert!(aggregate(dir.path(), "acme/clean").unwrap().is_empty());
    }

    #[test]
    fn test_per_repository_results_ignore_sub_folders() {
        let dir = TempDir::new().unwrap();
        let widget = dir.path().join("acme_widget");
        fs::create_dir_all(widget.join("extra")).unwrap();
        fs::write(widget.join("a.csv"), "type\nCG\n").unwrap();
        fs::write(widget.join("extra/b.csv"), "type\nCG\nNC\n").unwrap();
        fs::create_dir_all(dir.path().join("beta_tool")).unwrap();
        fs::write(dir.path().join("beta_tool/a.csv"), "type\nIM\n").unwrap();

        let rows = aggregate_results(dir.path(), DatasetLayout::PerRepository).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| !row.is_sliced()));
        assert_eq!(rows[0].repository, "acme_widget");
        assert_eq!(rows[0].counts.get(SmellCategory::CG), 1);
        assert_eq!(rows[0].counts.get(SmellCategory::NC), 0);
        assert_eq!(rows[1].counts.get(SmellCategory::IM), 1);
    }

    #[test]
    fn test_per_slice_results_skip_flat_repositories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("flat_repo")).unwrap();
        fs::write(dir.path().join("flat_repo/a.csv"), "type\nCG\n").unwrap();
        let slice = dir.path().join("sliced_repo/2020-01_to_2020-05");
        fs::create_dir_all(&slice).unwrap();
        fs::write(slice.join("a.csv"), "type\nLC\n").unwrap();

        let rows = aggregate_results(dir.path(), DatasetLayout::PerSlice).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].repository, "sliced_repo");
        assert_eq!(rows[0].slice_index, Some(1));
    }

    #[test]
    fn test_slice_indices_skip_empty_subdirectories() {
        let dir = TempDir::new().unwrap();
        for name in ["2020-01_to_2020-05", "2020-05_to_2020-09", "2020-09_to_2021-01"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("2020-01_to_2020-05/r.csv"), "type\nCG\n").unwrap();
        fs::write(dir.path().join("2020-09_to_2021-01/r.csv"), "type\nLC\n").unwrap();

        let rows = aggregate(dir.path(), "acme/widget").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].slice_index, Some(1));
        assert_eq!(rows[0].period.as_deref(), Some("2020-01_to_2020-05"));
        assert_eq!(rows[0].counts.get(SmellCategory::CG), 1);
        assert_eq!(rows[1].slice_index, Some(2));
        assert_eq!(rows[1].period.as_deref(), Some("2020-09_to_2021-01"));
        assert_eq!(rows[1].counts.get(SmellCategory::LC), 1);
    }
}
