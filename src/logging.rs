// Logging module for smellslice
//
// A small `log::Log` implementation:
// - Text lines (`YYYY-MM-DD HH:MM:SS [LEVEL] message`) or JSON lines
// - Console (stderr), file, or both, with independent levels
// - HTTP and TLS crates are capped at WARN unless tracing is requested
//
// Example usage:
// ```
// let config = LogConfig {
//     console_level: LevelFilter::Info,
//     file_level: Some(LevelFilter::Debug),
//     format: LogFormat::Json,
//     destination: LogDestination::Both(PathBuf::from("smellslice.log")),
// };
// init_logger(config)?;
// log::info!("Slicing started");
// ```

use log::{Level, LevelFilter, Metadata};
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use anyhow::{Context, Result};

/// Dependency targets whose chatter is capped below trace
const NOISY_TARGETS: [&str; 5] = ["hyper", "reqwest", "rustls", "h2", "want"];

/// Log output format options
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}. Valid options: text, json", s)),
        }
    }
}

/// Log destination options
#[derive(Debug, Clone, PartialEq)]
pub enum LogDestination {
    Console,
    File(PathBuf),
    Both(PathBuf),
}

impl LogDestination {
    fn file_path(&self) -> Option<&Path> {
        match self {
            LogDestination::Console => None,
            LogDestination::File(path) | LogDestination::Both(path) => Some(path),
        }
    }

    fn includes_console(&self) -> bool {
        !matches!(self, LogDestination::File(_))
    }
}

/// JSON log entry structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub console_level: LevelFilter,
    pub file_level: Option<LevelFilter>,
    pub format: LogFormat,
    pub destination: LogDestination,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::Info,
            file_level: None,
            format: LogFormat::Text,
            destination: LogDestination::Console,
        }
    }
}

impl LogConfig {
    /// Most verbose level any destination accepts
    pub fn max_level(&self) -> LevelFilter {
        match self.file_level {
            Some(file_level) => file_level.max(self.console_level),
            None => self.console_level,
        }
    }
}

/// Logger writing formatted records to stderr and/or an append-only file
pub struct SmellsliceLogger {
    config: LogConfig,
    file: Option<Mutex<File>>,
}

impl SmellsliceLogger {
    /// Create the logger, opening the log file up front when one is configured
    pub fn new(config: LogConfig) -> Result<Self> {
        let file = match config.destination.file_path() {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open log file: {}", path.display()))?;
                Some(Mutex::new(file))
            }
            None => None,
        };
        Ok(Self { config, file })
    }

    fn format_timestamp() -> String {
        let now: DateTime<Local> = Local::now();
        now.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn format_text_message(&self, level: Level, message: &str) -> String {
        format!("{} [{}] {}", Self::format_timestamp(), level.as_str(), message)
    }

    fn format_json_message(&self, level: Level, target: &str, message: &str) -> Result<String> {
        let entry = JsonLogEntry {
            timestamp: Self::format_timestamp(),
            level: level.as_str().to_string(),
            message: message.to_string(),
            target: (!target.is_empty()).then(|| target.to_string()),
        };

        serde_json::to_string(&entry)
            .context("Failed to serialize log entry to JSON")
    }

    fn is_noisy(&self, metadata: &Metadata) -> bool {
        let crate_name = metadata.target().split("::").next().unwrap_or_default();
        NOISY_TARGETS.contains(&crate_name)
            && metadata.level() > Level::Warn
            && self.config.max_level() < LevelFilter::Trace
    }

    fn should_log_to_console(&self, level: Level) -> bool {
        self.config.destination.includes_console() && level <= self.config.console_level
    }

    fn should_log_to_file(&self, level: Level) -> bool {
        self.file.is_some() && self.config.file_level.is_some_and(|file_level| level <= file_level)
    }

    fn write_to_file(&self, formatted_message: &str) -> io::Result<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        let mut file = file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        writeln!(file, "{}", formatted_message)
    }
}

impl log::Log for SmellsliceLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        !self.is_noisy(metadata)
            && (self.should_log_to_console(metadata.level()) || self.should_log_to_file(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let message = record.args().to_string();
        let level = record.level();

        let formatted_message = match self.config.format {
            LogFormat::Text => self.format_text_message(level, &message),
            LogFormat::Json => self
                .format_json_message(level, record.target(), &message)
                .unwrap_or_else(|_| self.format_text_message(level, &message)),
        };

        if self.should_log_to_console(level) {
            let _ = writeln!(io::stderr(), "{}", formatted_message);
        }
        if self.should_log_to_file(level) {
            if let Err(e) = self.write_to_file(&formatted_message) {
                eprintln!("File logging error: {}", e);
            }
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

/// Initialize the logging system with the given configuration
pub fn init_logger(config: LogConfig) -> Result<()> {
    let max_level = config.max_level();
    let logger = SmellsliceLogger::new(config)?;

    log::set_boxed_logger(Box::new(logger))
        .context("Failed to set global logger")?;
    log::set_max_level(max_level);

    Ok(())
}

/// Convert string to LevelFilter
pub fn parse_log_level(level_str: &str) -> Result<LevelFilter> {
    match level_str.trim().to_lowercase().as_str() {
        "error" => Ok(LevelFilter::Error),
        "warn" | "warning" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        "off" => Ok(LevelFilter::Off),
        _ => Err(anyhow::anyhow!(
            "Invalid log level: {}. Valid levels: error, warn, info, debug, trace, off",
            level_str
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;
    use tempfile::TempDir;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(parse_log_level("error").unwrap(), LevelFilter::Error);
        assert_eq!(parse_log_level("Warning").unwrap(), LevelFilter::Warn);
        assert_eq!(parse_log_level(" debug ").unwrap(), LevelFilter::Debug);
        assert_eq!(parse_log_level("off").unwrap(), LevelFilter::Off);
        assert!(parse_log_level("loud").is_err());
    }

    #[test]
    fn test_max_level_takes_most_verbose() {
        let config = LogConfig {
            console_level: LevelFilter::Warn,
            file_level: Some(LevelFilter::Debug),
            ..LogConfig::default()
        };
        assert_eq!(config.max_level(), LevelFilter::Debug);
        assert_eq!(LogConfig::default().max_level(), LevelFilter::Info);
    }

    #[test]
    fn test_timestamp_format() {
        let timestamp = SmellsliceLogger::format_timestamp();
        assert_eq!(timestamp.len(), 19);
        assert_eq!(timestamp.chars().nth(4), Some('-'));
        assert_eq!(timestamp.chars().nth(10), Some(' '));
        assert_eq!(timestamp.chars().nth(13), Some(':'));
    }

    #[test]
    fn test_text_and_json_formatting() {
        let logger = SmellsliceLogger::new(LogConfig::default()).unwrap();

        let text = logger.format_text_message(Level::Warn, "window skipped");
        assert!(text.ends_with("[WARN] window skipped"));

        let json = logger
            .format_json_message(Level::Info, "smellslice::slicer", "started")
            .unwrap();
        let entry: JsonLogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry.level, "INFO");
        assert_eq!(entry.message, "started");
        assert_eq!(entry.target.as_deref(), Some("smellslice::slicer"));
    }

    #[test]
    fn test_noisy_dependencies_are_filtered() {
        let logger = SmellsliceLogger::new(LogConfig {
            console_level: LevelFilter::Debug,
            ..LogConfig::default()
        })
        .unwrap();

        let chatty = Metadata::builder().level(Level::Debug).target("hyper::proto").build();
        let own = Metadata::builder().level(Level::Debug).target("smellslice::git").build();
        let warning = Metadata::builder().level(Level::Warn).target("reqwest::connect").build();
        assert!(!logger.enabled(&chatty));
        assert!(logger.enabled(&own));
        assert!(logger.enabled(&warning));
    }

    #[test]
    fn test_file_destination_writes_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.log");
        let logger = SmellsliceLogger::new(LogConfig {
            console_level: LevelFilter::Error,
            file_level: Some(LevelFilter::Info),
            format: LogFormat::Text,
            destination: LogDestination::File(path.clone()),
        })
        .unwrap();

        logger.log(
            &log::Record::builder()
                .level(Level::Info)
                .target("smellslice")
                .args(format_args!("snapshot created"))
                .build(),
        );
        logger.log(
            &log::Record::builder()
                .level(Level::Debug)
                .target("smellslice")
                .args(format_args!("too detailed"))
                .build(),
        );
        logger.flush();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[INFO] snapshot created"));
        assert!(!content.contains("too detailed"));
    }

    #[test]
    fn test_global_logger_installs_once() {
        let config = LogConfig {
            console_level: LevelFilter::Warn,
            ..LogConfig::default()
        };
        assert!(init_logger(config.clone()).is_ok());
        assert_eq!(log::max_level(), LevelFilter::Warn);
        assert!(init_logger(config).is_err());
    }

    #[test]
    fn test_unwritable_log_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig {
            destination: LogDestination::Both(dir.path().join("missing/dir/run.log")),
            file_level: Some(LevelFilter::Info),
            ..LogConfig::default()
        };
        assert!(SmellsliceLogger::new(config).is_err());
    }
}
