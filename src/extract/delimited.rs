//! Delimited-text (CSV) result files

use super::{is_type_header, ExtractIssue, Extraction};
use csv::ReaderBuilder;
use std::path::Path;

pub(super) fn extract(path: &Path) -> Extraction {
    let mut extraction = Extraction::default();

    let mut reader = match ReaderBuilder::new().flexible(true).from_path(path) {
        Ok(reader) => reader,
        Err(e) => {
            extraction.issues.push(ExtractIssue::Unreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
            return extraction;
        }
    };

    let type_index = match reader.headers() {
        Ok(headers) => headers.iter().position(is_type_header),
        Err(e) => {
            extraction.issues.push(ExtractIssue::Unreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
            return extraction;
        }
    };

    let Some(type_index) = type_index else {
        extraction.issues.push(ExtractIssue::MissingTypeColumn {
            path: path.to_path_buf(),
        });
        return extraction;
    };

    for record in reader.records() {
        match record {
            Ok(record) => {
                if let Some(value) = record.get(type_index) {
                    extraction.counts.record_label(value);
                }
            }
            Err(e) => {
                // An I/O failure ends the stream; keep what was already counted.
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                extraction.issues.push(ExtractIssue::MalformedRecord {
                    path: path.to_path_buf(),
                    line,
                    message: e.to_string(),
                });
                if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                    break;
                }
            }
        }
    }

    extraction
}
