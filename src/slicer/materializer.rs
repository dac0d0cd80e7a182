//! Turning a time window into an on-disk snapshot

use super::hosting::{CommitEvent, HostingApi};
use super::interval::TimeWindow;
use super::RepositoryReference;
use crate::git::{self, Checkout, CheckoutError};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A checkout representing one window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Dense 1-based position among materialized snapshots
    pub index: usize,
    pub window: TimeWindow,
    pub revision: String,
    pub directory: PathBuf,
    /// Number of commits the API listed for the window
    pub event_count: usize,
}

impl Snapshot {
    pub fn short_revision(&self) -> &str {
        self.revision.get(..7).unwrap_or(&self.revision)
    }
}

/// Result of materializing one window
#[derive(Debug)]
pub enum MaterializeOutcome {
    Materialized(Snapshot),
    /// No commits in the window (or the commit query failed)
    Skipped,
    Failed(CheckoutError),
}

/// Pick the revision representing a window.
///
/// The commits endpoint is expected to list the most recent commit first.
/// When every event carries a date that expectation is checked, and the most
/// recent event wins if the API order disagrees.
pub fn select_revision(events: &[CommitEvent]) -> Option<&CommitEvent> {
    let first = events.first()?;

    let dated: Option<Vec<_>> = events.iter().map(|e| e.timestamp().map(|t| (t, e))).collect();
    if let Some(dated) = dated {
        if let (Some(first_date), Some((latest_date, latest))) =
            (first.timestamp(), dated.iter().max_by_key(|(t, _)| *t))
        {
            if first_date < *latest_date {
                warn!(
                    "Commit list is not most-recent-first: {} ({}) is older than {} ({}); using the latter",
                    first.short_sha(),
                    first_date,
                    latest.short_sha(),
                    latest_date
                );
                return Some(latest);
            }
        }
    }

    Some(first)
}

/// Resolves windows to revisions and checks them out
pub struct SnapshotMaterializer<'a, A, C> {
    api: &'a A,
    checkout: &'a C,
}

impl<'a, A: HostingApi, C: Checkout> SnapshotMaterializer<'a, A, C> {
    pub fn new(api: &'a A, checkout: &'a C) -> Self {
        Self { api, checkout }
    }

    /// Materialize `window` under `output_root` as snapshot number `index`
    pub async fn materialize(
        &self,
        repo: &RepositoryReference,
        window: &TimeWindow,
        output_root: &Path,
        index: usize,
    ) -> MaterializeOutcome {
        let events = match self.api.commits_between(repo, window.start, window.end).await {
            Ok(events) => events,
            Err(e) => {
                warn!(
                    "Commit query failed for {} - {}: {}",
                    window.start.date_naive(),
                    window.end.date_naive(),
                    e
                );
                Vec::new()
            }
        };

        let Some(selected) = select_revision(&events) else {
            info!(
                "No commits between {} and {}, skipped",
                window.label_start, window.label_end
            );
            return MaterializeOutcome::Skipped;
        };
        let revision = selected.sha.clone();
        debug!(
            "Window {} resolved to {} ({} commits)",
            window.label,
            revision,
            events.len()
        );

        let directory = output_root.join(&window.label);
        let result = git::remove_existing(&directory)
            .and_then(|_| self.checkout.checkout(&repo.url, &revision, &directory));

        match result {
            Ok(()) => MaterializeOutcome::Materialized(Snapshot {
                index,
                window: window.clone(),
                revision,
                directory,
                event_count: events.len(),
            }),
            Err(e) => {
                error!("Snapshot {} failed: {}", window.label, e);
                MaterializeOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(json: &str) -> Vec<CommitEvent> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_select_first_when_undated() {
        let list = events(r#"[{"sha": "first"}, {"sha": "second"}]"#);
        assert_eq!(select_revision(&list).unwrap().sha, "first");
        assert!(select_revision(&[]).is_none());
    }

    #[test]
    fn test_select_first_when_order_is_most_recent_first() {
        let list = events(
            r#"[
                {"sha": "new", "commit": {"committer": {"date": "2021-03-01T00:00:00Z"}}},
                {"sha": "old", "commit": {"committer": {"date": "2021-01-01T00:00:00Z"}}}
            ]"#,
        );
        assert_eq!(select_revision(&list).unwrap().sha, "new");
    }

    #[test]
    fn test_select_latest_when_order_is_reversed() {
        let list = events(
            r#"[
                {"sha": "old", "commit": {"committer": {"date": "2021-01-01T00:00:00Z"}}},
                {"sha": "mid", "commit": {"committer": {"date": "2021-02-01T00:00:00Z"}}},
                {"sha": "new", "commit": {"committer": {"date": "2021-03-01T00:00:00Z"}}}
            ]"#,
        );
        assert_eq!(select_revision(&list).unwrap().sha, "new");
    }

    #[test]
    fn test_partially_dated_list_trusts_api_order() {
        let list = events(
            r#"[
                {"sha": "old", "commit": {"committer": {"date": "2021-01-01T00:00:00Z"}}},
                {"sha": "undated"}
            ]"#,
        );
        assert_eq!(select_revision(&list).unwrap().sha, "old");
    }
}
