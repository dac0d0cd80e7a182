use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Context, Result};
use toml::Value;
use log::{debug, info};
use crate::slicer::hosting::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use crate::slicer::interval::{DEFAULT_INTERVAL_DAYS, MIN_INTERVAL_DAYS};

/// Configuration storage - section_name -> key -> value
pub type Configuration = HashMap<String, HashMap<String, String>>;

/// Default results root, relative to the working directory
pub const DEFAULT_RESULTS_DIR: &str = "../results";

/// Settings for the `slice` command drawn from the `[slicer]` section
#[derive(Debug, Clone, PartialEq)]
pub struct SlicerSettings {
    pub api_url: String,
    pub token: Option<String>,
    pub interval_days: i64,
    pub timeout: Duration,
    pub output_dir: Option<PathBuf>,
}

impl Default for SlicerSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            interval_days: DEFAULT_INTERVAL_DAYS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            output_dir: None,
        }
    }
}

/// Configuration manager
pub struct ConfigManager {
    config: Configuration,
    config_file_path: Option<PathBuf>,
    selected_section: Option<String>,
}

impl ConfigManager {
    /// Create a new ConfigManager from a Configuration (primarily for testing)
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config,
            config_file_path: None,
            selected_section: None,
        }
    }

    /// Load configuration using discovery hierarchy
    pub fn load() -> Result<Self> {
        debug!("Starting configuration discovery");

        for path in discover_config_files() {
            debug!("Attempting to load config from: {}", path.display());
            if path.exists() {
                info!("Loading configuration from: {}", path.display());
                return Self::load_from_file(path);
            }
        }

        info!("No configuration file found, using empty configuration");
        Ok(Self::from_config(Configuration::new()))
    }

    /// Load configuration from explicit file path
    pub fn load_from_file(path: PathBuf) -> Result<Self> {
        debug!("Loading configuration from file: {}", path.display());

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = parse_toml_config(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Successfully loaded configuration from: {}", path.display());
        Ok(Self {
            config,
            config_file_path: Some(path),
            selected_section: None,
        })
    }

    pub fn config_file_path(&self) -> Option<&PathBuf> {
        self.config_file_path.as_ref()
    }

    /// Get value from configuration with section fallback
    pub fn get_value(&self, section: &str, key: &str) -> Option<&String> {
        // Priority: selected_section -> specified section -> base
        if let Some(selected) = &self.selected_section {
            if let Some(value) = self.config.get(selected).and_then(|s| s.get(key)) {
                return Some(value);
            }
        }

        if let Some(value) = self.config.get(section).and_then(|s| s.get(key)) {
            return Some(value);
        }

        self.config.get("base").and_then(|s| s.get(key))
    }

    /// Value of a top-level scalar key (outside any table)
    pub fn get_value_root(&self, key: &str) -> Option<&String> {
        self.config
            .get(key)
            .and_then(|s| s.get("value"))
            .or_else(|| self.get_value("base", key))
    }

    /// Select configuration section for --config-name
    pub fn select_section(&mut self, section: String) {
        debug!("Selecting configuration section: {}", section);
        self.selected_section = Some(section);
    }

    /// Get boolean value with type conversion
    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        match self.get_value(section, key) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(anyhow::anyhow!("Invalid boolean value for {}.{}: {}", section, key, value)),
            },
            None => Ok(None),
        }
    }

    /// Get unsigned integer value with type conversion
    pub fn get_u64(&self, section: &str, key: &str) -> Result<Option<u64>> {
        self.get_value(section, key)
            .map(|value| {
                value
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("Invalid {}.{} value in config: {}", section, key, value))
            })
            .transpose()
    }

    /// Get log level value with type conversion
    pub fn get_log_level(&self, section: &str, key: &str) -> Result<Option<log::LevelFilter>> {
        match self.get_value(section, key) {
            Some(value) => Ok(Some(crate::logging::parse_log_level(value)?)),
            None => Ok(None),
        }
    }

    /// Get path value with type conversion
    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_value(section, key).map(PathBuf::from)
    }

    /// Settings for the slicer from the `[slicer]` section
    pub fn get_slicer_settings(&self) -> Result<SlicerSettings> {
        let mut settings = SlicerSettings::default();

        if let Some(api_url) = self.get_value("slicer", "api-url") {
            settings.api_url = api_url.clone();
        }

        settings.token = self
            .get_value("slicer", "token")
            .filter(|token| !token.trim().is_empty())
            .cloned();

        if let Some(days) = self.get_u64("slicer", "interval-days")? {
            if days < MIN_INTERVAL_DAYS as u64 {
                return Err(anyhow::anyhow!(
                    "slicer.interval-days must be at least {}, got {}",
                    MIN_INTERVAL_DAYS,
                    days
                ));
            }
            settings.interval_days = i64::try_from(days)
                .with_context(|| format!("slicer.interval-days is too large: {}", days))?;
        }

        if let Some(secs) = self.get_u64("slicer", "timeout-secs")? {
            settings.timeout = Duration::from_secs(secs);
        }

        settings.output_dir = self.get_path("slicer", "output-dir");

        debug!("Slicer settings: api={} interval={}d timeout={:?}",
            settings.api_url, settings.interval_days, settings.timeout);
        Ok(settings)
    }

    /// Results root from `[dataset] results-dir`, falling back to `../results`
    pub fn get_results_dir(&self) -> PathBuf {
        self.get_path("dataset", "results-dir")
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR))
    }
}

/// Discover configuration files in order of precedence
fn discover_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Environment variable $SMELLSLICE_CONFIG
    if let Ok(env_path) = env::var("SMELLSLICE_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    // 2. XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("smellslice").join("config.toml"));
    }

    // 3. Home directory
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".smellslice.toml"));
    }

    // 4. Project local
    paths.push(PathBuf::from("./.smellslice.toml"));

    debug!("Config discovery paths: {:?}", paths);
    paths
}

/// Parse TOML content to string-based configuration
fn parse_toml_config(content: &str) -> Result<Configuration> {
    let toml_value: Value = content.parse()
        .context("Failed to parse TOML content")?;

    let mut config = Configuration::new();

    if let Value::Table(table) = toml_value {
        flatten_toml_table(&table, String::new(), &mut config);
    }

    debug!("Parsed configuration: {:?}", config.keys().collect::<Vec<_>>());
    Ok(config)
}

/// Recursively flatten TOML tables into section.subsection format
fn flatten_toml_table(table: &toml::Table, prefix: String, config: &mut Configuration) {
    for (key, value) in table {
        let section_name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Table(subtable) => {
                if subtable.values().all(|v| !matches!(v, Value::Table(_))) {
                    let section_map = subtable
                        .iter()
                        .map(|(subkey, subvalue)| (subkey.clone(), toml_value_to_string(subvalue)))
                        .collect();
                    config.insert(section_name, section_map);
                } else {
                    flatten_toml_table(subtable, section_name, config);
                }
            }
            _ => {
                // Top-level scalar such as `log-format = "json"`
                let mut section_map = HashMap::new();
                section_map.insert("value".to_string(), toml_value_to_string(value));
                config.insert(section_name, section_map);
            }
        }
    }
}

/// Convert TOML Value to string representation
fn toml_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Array(_) | Value::Table(_) | Value::Datetime(_) => value.to_string(),
    }
}
