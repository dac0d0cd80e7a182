//! Temporal repository slicing
//!
//! A repository's lifetime is cut into fixed-length windows; each window with
//! at least one commit is materialized as a full checkout of its most recent
//! commit, in a directory named after the window.

pub mod hosting;
pub mod interval;
pub mod materializer;
pub mod walker;

pub use hosting::{CommitEvent, GitHubClient, HostingApi, HostingError};
pub use interval::{IntervalPlanner, TimeWindow};
pub use materializer::{MaterializeOutcome, Snapshot, SnapshotMaterializer};
pub use walker::{RepoHistoryWalker, WalkSummary};

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a slicing run before any work is done
#[derive(Debug, Error)]
pub enum SliceError {
    #[error("Invalid repository URL '{0}'. Expected format: https://github.com/owner/repo")]
    InvalidRepositoryUrl(String),

    #[error("Failed to create output directory {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Owner/name pair of a hosted repository plus the URL it was given as
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryReference {
    pub owner: String,
    pub name: String,
    pub url: String,
}

impl RepositoryReference {
    /// Derive owner and name from the last two path segments of `url`
    pub fn parse(url: &str) -> Result<Self, SliceError> {
        let trimmed = url.trim().trim_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() < 2 {
            return Err(SliceError::InvalidRepositoryUrl(url.to_string()));
        }

        let owner = segments[segments.len() - 2];
        let name = segments[segments.len() - 1];
        let name = name.strip_suffix(".git").unwrap_or(name);
        if name.is_empty() {
            return Err(SliceError::InvalidRepositoryUrl(url.to_string()));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            url: url.trim().trim_end_matches('/').to_string(),
        })
    }

    /// Directory that collects every snapshot of this repository
    pub fn snapshot_root_name(&self) -> String {
        format!("snapshots_{}_{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
