//! Spreadsheet workbook result files (xlsx, xls, xlsm, xlsb)

use super::{is_type_header, ExtractIssue, Extraction};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;

pub(super) fn extract(path: &Path) -> Extraction {
    let mut extraction = Extraction::default();

    let mut workbook = match open_workbook_auto(path) {
        Ok(workbook) => workbook,
        Err(e) => {
            extraction.issues.push(ExtractIssue::Unreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
            return extraction;
        }
    };

    for sheet in workbook.sheet_names() {
        let range = match workbook.worksheet_range(&sheet) {
            Ok(range) => range,
            Err(e) => {
                extraction.issues.push(ExtractIssue::UnreadableSheet {
                    path: path.to_path_buf(),
                    sheet,
                    message: e.to_string(),
                });
                continue;
            }
        };

        if !count_sheet(&range, &mut extraction) {
            extraction.issues.push(ExtractIssue::SheetWithoutType {
                path: path.to_path_buf(),
                sheet,
            });
        }
    }

    extraction
}

/// Count one sheet; returns false when it has no `type` header.
///
/// The header is the sheet's first row. calamine trims leading blank rows from
/// the used range, so a range starting below row 0 has a blank header.
fn count_sheet(range: &Range<Data>, extraction: &mut Extraction) -> bool {
    if range.start().map_or(true, |(row, _)| row != 0) {
        return false;
    }
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return false;
    };
    let Some(type_index) = header.iter().position(|cell| match cell {
        Data::String(name) => is_type_header(name),
        _ => false,
    }) else {
        return false;
    };

    for row in rows {
        if let Some(value) = row.get(type_index).and_then(cell_text) {
            extraction.counts.record_label(&value);
        }
    }
    true
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
