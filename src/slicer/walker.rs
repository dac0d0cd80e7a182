//! Orchestration of a full slicing run

use super::hosting::HostingApi;
use super::interval::IntervalPlanner;
use super::materializer::{MaterializeOutcome, Snapshot, SnapshotMaterializer};
use super::{RepositoryReference, SliceError};
use crate::git::Checkout;
use chrono::{DateTime, TimeZone, Utc};
use colored::Colorize;
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;

/// Creation date assumed when the hosting API cannot provide one
pub fn fallback_creation_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2008, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// What a slicing run produced
#[derive(Debug, Clone, Serialize)]
pub struct WalkSummary {
    pub repository: RepositoryReference,
    pub creation_date: DateTime<Utc>,
    pub effective_start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub output_root: PathBuf,
    pub snapshots: Vec<Snapshot>,
    /// Labels of windows without commits
    pub skipped: Vec<String>,
    /// Labels of windows whose checkout failed
    pub failed: Vec<String>,
}

impl WalkSummary {
    pub fn created(&self) -> usize {
        self.snapshots.len()
    }
}

/// Walks a repository's history window by window
pub struct RepoHistoryWalker<A, C> {
    api: A,
    checkout: C,
    output_dir: PathBuf,
    planner: IntervalPlanner,
}

impl<A: HostingApi, C: Checkout> RepoHistoryWalker<A, C> {
    pub fn new(api: A, checkout: C, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            checkout,
            output_dir: output_dir.into(),
            planner: IntervalPlanner::default(),
        }
    }

    pub fn with_planner(mut self, planner: IntervalPlanner) -> Self {
        self.planner = planner;
        self
    }

    /// Slice `repo_url` from `start` (or its creation date) up to `end`
    pub async fn run(
        &self,
        repo_url: &str,
        start: Option<DateTime<Utc>>,
        end: DateTime<Utc>,
    ) -> Result<WalkSummary, SliceError> {
        let repository = RepositoryReference::parse(repo_url)?;

        let creation_date = match self.api.created_at(&repository).await {
            Ok(date) => date,
            Err(e) => {
                let fallback = fallback_creation_date();
                warn!(
                    "Could not fetch creation date of {}: {}. Using {}",
                    repository,
                    e,
                    fallback.date_naive()
                );
                fallback
            }
        };

        let effective_start = match start {
            Some(requested) if requested < creation_date => {
                warn!(
                    "Start date {} precedes repository creation ({}); starting at creation",
                    requested.date_naive(),
                    creation_date.date_naive()
                );
                creation_date
            }
            Some(requested) => requested,
            None => creation_date,
        };

        let output_root = self.output_dir.join(repository.snapshot_root_name());
        std::fs::create_dir_all(&output_root).map_err(|source| SliceError::OutputDirectory {
            path: output_root.clone(),
            source,
        })?;

        info!(
            "Slicing {} from {} to {} into {}",
            repository,
            effective_start.date_naive(),
            end.date_naive(),
            output_root.display()
        );

        let materializer = SnapshotMaterializer::new(&self.api, &self.checkout);
        let mut summary = WalkSummary {
            repository: repository.clone(),
            creation_date,
            effective_start,
            end,
            output_root: output_root.clone(),
            snapshots: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        };

        for window in self.planner.plan(effective_start, end) {
            let index = summary.snapshots.len() + 1;
            match materializer
                .materialize(&repository, &window, &output_root, index)
                .await
            {
                MaterializeOutcome::Materialized(snapshot) => {
                    println!(
                        "{} Snapshot {}: {}",
                        "✓".green(),
                        snapshot.index,
                        snapshot.directory.display()
                    );
                    println!("   Period: {} - {}", window.label_start, window.label_end);
                    println!("   Last commit: {}", snapshot.short_revision());
                    println!("   Commits in period: {}", snapshot.event_count);
                    summary.snapshots.push(snapshot);
                }
                MaterializeOutcome::Skipped => {
                    println!(
                        "{} No commits between {} and {}, skipped",
                        "-".dimmed(),
                        window.label_start,
                        window.label_end
                    );
                    summary.skipped.push(window.label);
                }
                MaterializeOutcome::Failed(e) => {
                    println!("{} Snapshot {} failed: {}", "✗".red(), window.label, e);
                    summary.failed.push(window.label);
                }
            }
        }

        info!(
            "{}: {} snapshots, {} skipped, {} failed",
            repository,
            summary.created(),
            summary.skipped.len(),
            summary.failed.len()
        );
        Ok(summary)
    }
}
