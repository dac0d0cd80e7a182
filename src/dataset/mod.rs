//! Canonical smell-count dataset with keyed upserts
//!
//! The dataset is a workbook with one sheet named `dataset`. Its header is the
//! key column(s) followed by the eight smell categories in canonical order.
//! [`Dataset`] is the single accumulator for a batch: it is opened (or
//! created), receives any number of [`Dataset::upsert`] calls and is written
//! to disk once by [`Dataset::save`]. Nothing is persisted before that.

pub mod workbook;

use crate::aggregate::SliceRow;
use crate::smells::{SmellCategory, SmellCounts};
use log::{debug, info};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use workbook::{CellValue, Sheet, Workbook};

pub use workbook::MAX_COLUMN_WIDTH;

/// Name of the sheet holding the dataset
pub const DATASET_SHEET: &str = "dataset";

const REPO_HEADER: &str = "Repo";
const SLICE_HEADER: &str = "Slice ID";
const PERIOD_HEADER: &str = "Period";

/// Errors raised while loading, merging or writing a dataset
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read workbook {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("failed to write workbook {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("sheet '{sheet}' does not use the {layout} layout (header: {header})")]
    HeaderMismatch {
        sheet: String,
        layout: DatasetLayout,
        header: String,
    },

    #[error("row for '{repository}' does not fit the {layout} layout")]
    LayoutMismatch {
        repository: String,
        layout: DatasetLayout,
    },
}

/// How rows are keyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DatasetLayout {
    /// One row per repository, keyed by `Repo`
    PerRepository,
    /// One row per repository slice, keyed by (`Repo`, `Slice ID`)
    PerSlice,
}

impl DatasetLayout {
    /// Key and label columns preceding the counts
    pub fn key_headers(self) -> &'static [&'static str] {
        match self {
            DatasetLayout::PerRepository => &[REPO_HEADER],
            DatasetLayout::PerSlice => &[REPO_HEADER, SLICE_HEADER, PERIOD_HEADER],
        }
    }

    /// Full header row
    pub fn header(self) -> Vec<&'static str> {
        self.key_headers()
            .iter()
            .copied()
            .chain(SmellCategory::header_labels())
            .collect()
    }

    /// 0-based column holding a category's count
    pub fn count_column(self, category: SmellCategory) -> usize {
        self.key_headers().len() + category.position()
    }

    fn accepts(self, row: &SliceRow) -> bool {
        match self {
            DatasetLayout::PerRepository => row.slice_index.is_none(),
            DatasetLayout::PerSlice => row.slice_index.is_some(),
        }
    }

    /// Whether an existing header row is exactly this layout's header.
    ///
    /// Names compare case-insensitively; trailing blank cells are ignored.
    fn matches_header(self, header: &[String]) -> bool {
        let used = header
            .iter()
            .rposition(|name| !name.is_empty())
            .map_or(0, |last| last + 1);
        let expected = self.header();
        used == expected.len()
            && header
                .iter()
                .zip(expected)
                .all(|(found, wanted)| found.eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for DatasetLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetLayout::PerRepository => f.write_str("per-repository"),
            DatasetLayout::PerSlice => f.write_str("per-slice"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RowKey {
    repository: String,
    slice: Option<u32>,
}

impl RowKey {
    fn of(row: &SliceRow) -> Self {
        Self {
            repository: row.repository.clone(),
            slice: row.slice_index,
        }
    }
}

/// Outcome of one upsert batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub processed: usize,
    pub updated: usize,
    pub added: usize,
}

impl fmt::Display for UpsertSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed: {}, Updated: {}, Added: {}",
            self.processed, self.updated, self.added
        )
    }
}

/// The dataset workbook held in memory for one batch
#[derive(Debug)]
pub struct Dataset {
    path: PathBuf,
    layout: DatasetLayout,
    workbook: Workbook,
    sheet: usize,
    index: HashMap<RowKey, usize>,
}

impl Dataset {
    /// Load the dataset at `path`, or start a new one if the file is absent
    pub fn open_or_create(path: &Path, layout: DatasetLayout) -> Result<Self, DatasetError> {
        let mut workbook = if path.exists() {
            info!("Loading dataset from: {}", path.display());
            Workbook::open(path)?
        } else {
            info!("Creating new dataset: {}", path.display());
            Workbook::new()
        };

        let sheet = match workbook.find_sheet(DATASET_SHEET) {
            Some(index) => index,
            None => {
                debug!("Adding '{}' sheet", DATASET_SHEET);
                workbook.add_sheet(Sheet::with_header(DATASET_SHEET, layout.header()))
            }
        };

        let data = workbook.sheet_mut(sheet);
        if data.row_count() == 0 {
            let name = data.name().to_string();
            *data = Sheet::with_header(name, layout.header());
        } else if !layout.matches_header(&data.header()) {
            return Err(DatasetError::HeaderMismatch {
                sheet: data.name().to_string(),
                layout,
                header: data.header().join(", "),
            });
        }
        data.set_bold_header(true);

        let index = build_index(data, layout);
        debug!("Indexed {} existing dataset rows", index.len());

        Ok(Self {
            path: path.to_path_buf(),
            layout,
            workbook,
            sheet,
            index,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> DatasetLayout {
        self.layout
    }

    /// Number of keyed rows
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The dataset sheet
    pub fn sheet(&self) -> &Sheet {
        self.workbook.sheet(self.sheet)
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    /// Stored counts for a key, if present
    pub fn counts(&self, repository: &str, slice: Option<u32>) -> Option<SmellCounts> {
        let key = RowKey {
            repository: repository.to_string(),
            slice,
        };
        let row = *self.index.get(&key)?;
        let sheet = self.sheet();
        let mut counts = SmellCounts::new();
        for category in SmellCategory::ALL {
            let value = sheet.cell(row, self.layout.count_column(category)).as_u64();
            counts.set(category, value.unwrap_or(0));
        }
        Some(counts)
    }

    /// Merge a batch of rows into the dataset by key.
    ///
    /// Existing keys get their count cells overwritten in place; new keys are
    /// appended. Column widths are recomputed once the batch is merged.
    pub fn upsert(&mut self, rows: &[SliceRow]) -> Result<UpsertSummary, DatasetError> {
        if let Some(row) = rows.iter().find(|row| !self.layout.accepts(row)) {
            return Err(DatasetError::LayoutMismatch {
                repository: row.repository.clone(),
                layout: self.layout,
            });
        }

        let layout = self.layout;
        let sheet = self.workbook.sheet_mut(self.sheet);
        let mut summary = UpsertSummary::default();

        for row in rows {
            summary.processed += 1;
            let key = RowKey::of(row);
            match self.index.get(&key) {
                Some(&existing) => {
                    for (category, count) in row.counts.iter() {
                        sheet.set_cell(existing, layout.count_column(category), count.into());
                    }
                    summary.updated += 1;
                    debug!("Updated {}", describe(row));
                }
                None => {
                    let appended = sheet.append_row(new_row(row, layout));
                    self.index.insert(key, appended);
                    summary.added += 1;
                    debug!("Added {}", describe(row));
                }
            }
        }

        sheet.autofit_columns();
        Ok(summary)
    }

    /// Write the workbook to its path
    pub fn save(&self) -> Result<(), DatasetError> {
        self.workbook.save(&self.path)?;
        info!("Dataset saved to: {}", self.path.display());
        Ok(())
    }
}

/// Map existing keys to row numbers; later duplicates win
fn build_index(sheet: &Sheet, layout: DatasetLayout) -> HashMap<RowKey, usize> {
    let mut index = HashMap::new();
    for row in 1..sheet.row_count() {
        let Some(repository) = sheet.cell(row, 0).as_key() else {
            continue;
        };
        let slice = match layout {
            DatasetLayout::PerRepository => None,
            DatasetLayout::PerSlice => match sheet.cell(row, 1).as_u64() {
                Some(slice) => u32::try_from(slice).ok(),
                None => continue,
            },
        };
        index.insert(RowKey { repository, slice }, row);
    }
    index
}

fn new_row(row: &SliceRow, layout: DatasetLayout) -> Vec<CellValue> {
    let mut cells = vec![CellValue::text(row.repository.as_str())];
    if layout == DatasetLayout::PerSlice {
        cells.push(row.slice_index.map(|i| CellValue::from(i as u64)).unwrap_or_default());
        cells.push(row.period.clone().map(CellValue::Text).unwrap_or_default());
    }
    cells.extend(row.counts.iter().map(|(_, count)| CellValue::from(count)));
    cells
}

fn describe(row: &SliceRow) -> String {
    match row.slice_index {
        Some(slice) => format!("{} (slice {})", row.repository, slice),
        None => row.repository.clone(),
    }
}
