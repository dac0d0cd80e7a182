//! Output formatting and display module

pub mod reports;
pub mod summary;

pub use reports::{count_folder, counts_table, format_compact_table, FileReport, REPORT_SHEET};
pub use summary::{format_row_preview, format_walk_summary};
