//! Report generation and formatting

use crate::aggregate::result_files;
use crate::dataset::workbook::{CellValue, Sheet, Workbook};
use crate::dataset::DatasetError;
use crate::extract;
use crate::smells::{SmellCategory, SmellCounts};
use anyhow::Result;
use log::debug;
use prettytable::{format, Cell, Row, Table};
use std::path::{Path, PathBuf};

/// Sheet written by the per-file report
pub const REPORT_SHEET: &str = "results";

/// Default file name of the per-file report
pub const DEFAULT_REPORT_NAME: &str = "results.xlsx";

/// Format a compact table with headers and rows using prettytable-rs clean format
pub fn format_compact_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);

    table.add_row(Row::new(headers.iter().map(|header| Cell::new(header)).collect()));
    for row in rows {
        table.add_row(Row::new(row.iter().map(|cell| Cell::new(cell)).collect()));
    }

    let mut result = String::new();
    for line in table.to_string().lines() {
        result.push_str("  ");
        result.push_str(line);
        result.push('\n');
    }
    result
}

/// Table of named count rows followed by a `TOTAL` row
pub fn counts_table(first_header: &str, rows: &[(String, SmellCounts)]) -> String {
    let mut headers = vec![first_header];
    headers.extend(SmellCategory::header_labels().map(|label| -> &str { label }));

    let mut total = SmellCounts::new();
    let mut body: Vec<Vec<String>> = rows
        .iter()
        .map(|(name, counts)| {
            total += counts;
            count_cells(name, counts)
        })
        .collect();
    if !body.is_empty() {
        body.push(count_cells("TOTAL", &total));
    }

    format_compact_table(&headers, &body)
}

fn count_cells(name: &str, counts: &SmellCounts) -> Vec<String> {
    std::iter::once(name.to_string())
        .chain(counts.iter().map(|(_, n)| n.to_string()))
        .collect()
}

/// Per-file smell counts of one folder
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub folder: PathBuf,
    /// (script name, counts) for every file with at least one smell
    pub files: Vec<(String, SmellCounts)>,
}

impl FileReport {
    pub fn total(&self) -> SmellCounts {
        let mut total = SmellCounts::new();
        for (_, counts) in &self.files {
            total += counts;
        }
        total
    }

    pub fn table(&self) -> String {
        counts_table("Script", &self.files)
    }

    /// Workbook with a single bold-headed `results` sheet, columns auto-sized
    pub fn to_workbook(&self) -> Workbook {
        let mut header = vec!["Script"];
        header.extend(SmellCategory::header_labels());

        let mut sheet = Sheet::with_header(REPORT_SHEET, header);
        for (script, counts) in &self.files {
            let mut cells = vec![CellValue::text(script.as_str())];
            cells.extend(counts.iter().map(|(_, n)| CellValue::from(n)));
            sheet.append_row(cells);
        }
        sheet.autofit_columns();

        let mut workbook = Workbook::new();
        workbook.add_sheet(sheet);
        workbook
    }

    pub fn save(&self, path: &Path) -> Result<(), DatasetError> {
        self.to_workbook().save(path)
    }
}

/// Script a result file describes: the file name without a `.csv` suffix,
/// with `_` mapped back to the `\` path separator it replaced
pub fn script_name(file_name: &str) -> String {
    let stem = match file_name.len().checked_sub(4) {
        Some(cut)
            if file_name.is_char_boundary(cut) && file_name[cut..].eq_ignore_ascii_case(".csv") =>
        {
            &file_name[..cut]
        }
        _ => file_name,
    };
    stem.replace('_', "\\")
}

/// Count smells per file directly inside `folder`.
///
/// Files without any recognised smell are left out; `None` means there was
/// nothing to report.
pub fn count_folder(folder: &Path) -> Result<Option<FileReport>> {
    let files = result_files(folder)?;
    debug!(
        "Files in {}: {:?}",
        folder.display(),
        files
            .iter()
            .filter_map(|f| f.file_name())
            .collect::<Vec<_>>()
    );

    let mut report = FileReport {
        folder: folder.to_path_buf(),
        files: Vec::new(),
    };
    for file in &files {
        let extraction = extract::extract(file);
        if extraction.counts.is_empty() {
            debug!("No smells in {}", file.display());
            continue;
        }
        let name = file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        report.files.push((script_name(&name), extraction.counts));
    }

    if report.files.is_empty() {
        return Ok(None);
    }
    Ok(Some(report))
}
