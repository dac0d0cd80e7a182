//! Application execution of the subcommands

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info};
use std::path::{Path, PathBuf};
use crate::cli::{self, Command};
use crate::dataset::{Dataset, DatasetLayout, UpsertSummary};
use crate::git::FullClone;
use crate::slicer::{GitHubClient, IntervalPlanner, RepoHistoryWalker, WalkSummary};
use crate::{aggregate, config, output};

/// Dispatch the parsed subcommand
pub async fn run_command(args: &cli::Args, config: &config::ConfigManager) -> Result<()> {
    match &args.command {
        Command::Slice {
            url,
            token,
            start_date,
            end_date,
            output_dir,
            interval_days,
        } => {
            let request = SliceRequest {
                url: url.clone(),
                token: token.clone(),
                start_date: start_date.clone(),
                end_date: end_date.clone(),
                output_dir: output_dir.clone(),
                interval_days: *interval_days,
            };
            let summary = run_slice(&request, config).await?;
            println!();
            print!("{}", output::format_walk_summary(&summary));
            Ok(())
        }
        Command::Update {
            dataset,
            results,
            sliced,
        } => {
            let results_dir = results.clone().unwrap_or_else(|| config.get_results_dir());
            let layout = if *sliced {
                DatasetLayout::PerSlice
            } else {
                DatasetLayout::PerRepository
            };
            let summary = run_update(dataset, &results_dir, layout)?;
            println!("{}", summary);
            Ok(())
        }
        Command::Count { folder, output } => {
            run_count(folder, output)?;
            Ok(())
        }
    }
}

/// Inputs of a slicing run as given on the command line
#[derive(Debug, Clone, Default)]
pub struct SliceRequest {
    pub url: String,
    pub token: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub interval_days: Option<i64>,
}

/// Slice a repository into dated snapshots
pub async fn run_slice(request: &SliceRequest, config: &config::ConfigManager) -> Result<WalkSummary> {
    let settings = config.get_slicer_settings()?;

    let (start, end) = cli::date_parser::parse_date_range(
        request.start_date.as_deref(),
        request.end_date.as_deref(),
    )?;
    let end = end.unwrap_or_else(Utc::now);

    let token = request.token.clone().or(settings.token);
    let client = GitHubClient::new(&settings.api_url, token, settings.timeout)
        .context("Failed to create hosting API client")?;

    let output_dir = match request.output_dir.clone().or(settings.output_dir) {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let planner = IntervalPlanner::new(request.interval_days.unwrap_or(settings.interval_days));
    debug!("Window step: {} days", planner.step().num_days());

    let walker = RepoHistoryWalker::new(client, FullClone, output_dir).with_planner(planner);
    let summary = walker
        .run(&request.url, start, end)
        .await
        .with_context(|| format!("Slicing {} failed", request.url))?;
    Ok(summary)
}

/// Aggregate every repository folder under `results_dir` into the dataset
pub fn run_update(dataset_path: &Path, results_dir: &Path, layout: DatasetLayout) -> Result<UpsertSummary> {
    if !results_dir.is_dir() {
        return Err(anyhow::anyhow!(
            "Results directory does not exist: {}",
            results_dir.display()
        ));
    }

    let rows = aggregate::aggregate_results(results_dir, layout)?;
    info!("Aggregated {} row(s) from {}", rows.len(), results_dir.display());
    debug!("Rows:\n{}", output::format_row_preview(&rows));

    let mut dataset = Dataset::open_or_create(dataset_path, layout)
        .with_context(|| format!("Failed to open dataset {}", dataset_path.display()))?;
    let summary = dataset.upsert(&rows)?;
    dataset
        .save()
        .with_context(|| format!("Failed to save dataset {}", dataset_path.display()))?;

    info!("Dataset {} saved ({} rows)", dataset_path.display(), dataset.len());
    Ok(summary)
}

/// Per-file report for one folder; returns the written workbook path
pub fn run_count(folder: &Path, report_name: &str) -> Result<Option<PathBuf>> {
    if !folder.is_dir() {
        return Err(anyhow::anyhow!("Folder does not exist: {}", folder.display()));
    }

    let Some(report) = output::count_folder(folder)? else {
        println!("No valid data found in {}", folder.display());
        return Ok(None);
    };

    print!("{}", report.table());

    let path = folder.join(report_name);
    report
        .save(&path)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    println!("Results saved to {}", path.display());
    Ok(Some(path))
}
