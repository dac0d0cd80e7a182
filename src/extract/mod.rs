//! Smell count extraction from detector result files
//!
//! A result file is either a delimited-text table or a spreadsheet workbook in
//! which each row describes one detected smell, with at least a `type` column.
//! Extraction is best-effort: nothing here returns an error to the caller.
//! Every problem is captured as an [`ExtractIssue`] next to whatever counts
//! could still be recovered, so a broken file simply contributes zero.

mod delimited;
mod workbook;

use crate::smells::SmellCounts;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extensions recognised as result files (lower-case, without dot)
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["csv", "xlsx", "xls", "xlsm", "xlsb"];

/// Header name of the column carrying the smell category
pub const TYPE_COLUMN: &str = "type";

/// A recoverable problem met while reading one result file
#[derive(Debug, Error)]
pub enum ExtractIssue {
    #[error("unsupported file extension: {path}")]
    UnsupportedExtension { path: PathBuf },

    #[error("failed to read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("column 'type' not found in {path}")]
    MissingTypeColumn { path: PathBuf },

    #[error("sheet '{sheet}' in {path} has no 'type' header, skipped")]
    SheetWithoutType { path: PathBuf, sheet: String },

    #[error("sheet '{sheet}' in {path} could not be read: {message}")]
    UnreadableSheet {
        path: PathBuf,
        sheet: String,
        message: String,
    },

    #[error("malformed record {line} in {path}: {message}")]
    MalformedRecord {
        path: PathBuf,
        line: u64,
        message: String,
    },
}

/// Outcome of extracting one file
#[derive(Debug, Default)]
pub struct Extraction {
    pub counts: SmellCounts,
    pub issues: Vec<ExtractIssue>,
}

impl Extraction {
    fn failed(issue: ExtractIssue) -> Self {
        Self {
            counts: SmellCounts::new(),
            issues: vec![issue],
        }
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Input shape of a result file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Delimited,
    Workbook,
}

impl FileKind {
    /// Classify a path by its (case-insensitive) extension
    pub fn of(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(FileKind::Delimited),
            "xlsx" | "xls" | "xlsm" | "xlsb" => Some(FileKind::Workbook),
            _ => None,
        }
    }
}

/// Whether a path names a result file this module can read
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| extension.eq_ignore_ascii_case(supported))
        })
}

/// Whether a header cell names the `type` column.
///
/// Matching is case-insensitive for every input format and ignores
/// surrounding whitespace and a leading byte-order mark.
pub(crate) fn is_type_header(cell: &str) -> bool {
    cell.trim_start_matches('\u{feff}')
        .trim()
        .eq_ignore_ascii_case(TYPE_COLUMN)
}

/// Count smell categories in a single result file
pub fn extract(path: &Path) -> Extraction {
    let extraction = match FileKind::of(path) {
        Some(FileKind::Delimited) => delimited::extract(path),
        Some(FileKind::Workbook) => workbook::extract(path),
        None => Extraction::failed(ExtractIssue::UnsupportedExtension {
            path: path.to_path_buf(),
        }),
    };

    for issue in &extraction.issues {
        match issue {
            ExtractIssue::SheetWithoutType { .. } => debug!("{}", issue),
            _ => warn!("{}", issue),
        }
    }
    debug!(
        "Extracted {} smell occurrences from {}",
        extraction.counts.total(),
        path.display()
    );

    extraction
}
