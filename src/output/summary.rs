//! End-of-run summaries

use super::reports::format_compact_table;
use crate::aggregate::SliceRow;
use crate::slicer::WalkSummary;
use crate::smells::SmellCategory;
use colored::Colorize;

/// Human-readable summary of a slicing run
pub fn format_walk_summary(summary: &WalkSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} {}\n",
        "Repository:".bold(),
        summary.repository
    ));
    out.push_str(&format!(
        "  Created: {}  Range: {} - {}\n",
        summary.creation_date.date_naive(),
        summary.effective_start.date_naive(),
        summary.end.date_naive()
    ));
    out.push_str(&format!("  Output: {}\n", summary.output_root.display()));

    let rows: Vec<Vec<String>> = summary
        .snapshots
        .iter()
        .map(|snapshot| {
            vec![
                snapshot.index.to_string(),
                snapshot.window.label.clone(),
                snapshot.short_revision().to_string(),
                snapshot.event_count.to_string(),
            ]
        })
        .collect();
    out.push_str(&format_compact_table(&["#", "Period", "Revision", "Commits"], &rows));

    out.push_str(&format!(
        "{} snapshot(s) created, {} window(s) without commits, {} failed\n",
        summary.created(),
        summary.skipped.len(),
        summary.failed.len()
    ));
    for label in &summary.failed {
        out.push_str(&format!("  {} {}\n", "✗".red(), label));
    }
    out
}

/// Table of aggregated rows as they will be written to the dataset
pub fn format_row_preview(rows: &[SliceRow]) -> String {
    let sliced = rows.iter().any(SliceRow::is_sliced);

    let mut headers = vec!["Repo"];
    if sliced {
        headers.extend(["Slice ID", "Period"]);
    }
    headers.extend(SmellCategory::header_labels());

    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let mut cells = vec![row.repository.clone()];
            if sliced {
                cells.push(row.slice_index.map(|i| i.to_string()).unwrap_or_default());
                cells.push(row.period.clone().unwrap_or_default());
            }
            cells.extend(row.counts.iter().map(|(_, n)| n.to_string()));
            cells
        })
        .collect();

    format_compact_table(&headers, &body)
}
