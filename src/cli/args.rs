use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::path::PathBuf;

use super::date_parser::validate_date_range;
use crate::slicer::interval::MIN_INTERVAL_DAYS;

/// Temporal slicing of repositories and code-smell dataset maintenance
#[derive(Parser, Debug)]
#[command(name = "smellslice")]
#[command(about = "Slice repository history into dated snapshots and maintain a code-smell dataset")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output (debug level logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Debug output (trace level logging)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    pub log_format: String,

    /// Log file path for file output
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_file_level: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Configuration section name
    #[arg(long, value_name = "SECTION", global = true)]
    pub config_name: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Materialize one checkout per time window of a repository's history
    Slice {
        /// Repository URL, e.g. https://github.com/owner/repo
        #[arg(value_name = "URL")]
        url: String,

        /// API token (overrides configuration)
        #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Start date (defaults to the repository creation date)
        #[arg(long, value_name = "DATE")]
        start_date: Option<String>,

        /// End date (defaults to now)
        #[arg(long, value_name = "DATE")]
        end_date: Option<String>,

        /// Directory receiving the snapshot folder (defaults to the current directory)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Window length in days (at least 31)
        #[arg(long, value_name = "DAYS")]
        interval_days: Option<i64>,
    },

    /// Aggregate result folders and upsert them into the dataset workbook
    Update {
        /// Dataset workbook path
        #[arg(long, value_name = "PATH")]
        dataset: PathBuf,

        /// Results root holding one folder per repository
        #[arg(long, value_name = "DIR")]
        results: Option<PathBuf>,

        /// Use the per-slice layout (Repo, Slice ID, Period, ...)
        #[arg(long)]
        sliced: bool,
    },

    /// Count smells per file in a folder and write a report workbook
    Count {
        /// Folder holding result files
        #[arg(value_name = "FOLDER")]
        folder: PathBuf,

        /// Report file name written inside the folder
        #[arg(long, value_name = "NAME", default_value = "results.xlsx")]
        output: String,
    },
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    debug!("Parsing command line arguments");
    let args = Args::parse();
    debug!("Parsed CLI arguments: {:?}", args);
    args
}

/// Validate CLI argument combinations
pub fn validate_args(args: &Args) -> Result<()> {
    debug!("Validating CLI argument combinations");

    let log_flags_count = [args.verbose, args.quiet, args.debug]
        .iter()
        .filter(|&&flag| flag)
        .count();

    if log_flags_count > 1 {
        return Err(anyhow::anyhow!(
            "Conflicting log level flags: only one of --verbose, --quiet, or --debug may be specified"
        ));
    }

    match args.log_format.to_lowercase().as_str() {
        "text" | "json" => {}
        _ => {
            return Err(anyhow::anyhow!(
                "Invalid log format '{}'. Valid options: text, json",
                args.log_format
            ))
        }
    }

    if let Some(ref level) = args.log_file_level {
        match level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(anyhow::anyhow!(
                    "Invalid log file level '{}'. Valid levels: error, warn, info, debug, trace",
                    level
                ))
            }
        }
    }

    if args.log_file_level.is_some() && args.log_file.is_none() {
        return Err(anyhow::anyhow!(
            "--log-file-level requires --log-file to be specified"
        ));
    }

    match &args.command {
        Command::Slice {
            start_date,
            end_date,
            interval_days,
            ..
        } => {
            validate_date_range(start_date.as_deref(), end_date.as_deref())?;
            if matches!(interval_days, Some(days) if *days < MIN_INTERVAL_DAYS) {
                return Err(anyhow::anyhow!(
                    "--interval-days must be at least {}",
                    MIN_INTERVAL_DAYS
                ));
            }
        }
        Command::Count { output, .. } => {
            if output.trim().is_empty() {
                return Err(anyhow::anyhow!("--output must not be empty"));
            }
        }
        Command::Update { .. } => {}
    }

    info!("CLI arguments validated successfully");
    Ok(())
}
