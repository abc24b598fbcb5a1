use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::constants::{DEFAULT_BUCKET, DEFAULT_CONFIG_FILE, DEFAULT_OUTPUT_DIR, DEFAULT_STORAGE_ENDPOINT};
use crate::error::{IngestError, Result};

/// Runtime settings, built once at startup and passed to whatever needs them.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bucket: String,
    pub output_dir: PathBuf,
    /// Maximum number of objects to list; `None` lists everything.
    pub max_results: Option<usize>,
    /// Size of the worker pool for fetching and validating.
    pub workers: usize,
    pub storage_endpoint: String,
    /// Serve Prometheus metrics on this port when set.
    pub metrics_port: Option<u16>,
}

/// Shape of the optional TOML config file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    pub bucket: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub max_results: Option<usize>,
    pub workers: Option<usize>,
    pub storage_endpoint: Option<String>,
    pub metrics_port: Option<u16>,
}

/// Values given on the command line. Each one that is set replaces the
/// configured value.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub bucket: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub max_results: Option<usize>,
    pub workers: Option<usize>,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_results: None,
            workers: default_workers(),
            storage_endpoint: DEFAULT_STORAGE_ENDPOINT.to_string(),
            metrics_port: None,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| IngestError::Config(format!("Invalid value '{}' for {}: {}", value, key, e)))
}

impl Settings {
    /// Defaults, then the config file, then environment variables (after
    /// loading `.env`).
    ///
    /// An explicitly given `config_path` must exist; the default file is
    /// optional.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut settings = Settings::default();
        match config_path {
            Some(path) => settings.apply_file(Self::read_file(path)?),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings.apply_file(Self::read_file(default_path)?);
                }
            }
        }
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.check()?;
        Ok(settings)
    }

    fn read_file(path: &Path) -> Result<FileSettings> {
        let content = fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::parse_file(&content)
    }

    pub fn parse_file(content: &str) -> Result<FileSettings> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_file(&mut self, file: FileSettings) {
        if let Some(bucket) = file.bucket {
            self.bucket = bucket;
        }
        if let Some(output_dir) = file.output_dir {
            self.output_dir = output_dir;
        }
        if file.max_results.is_some() {
            self.max_results = file.max_results;
        }
        if let Some(workers) = file.workers {
            self.workers = workers;
        }
        if let Some(endpoint) = file.storage_endpoint {
            self.storage_endpoint = endpoint;
        }
        if file.metrics_port.is_some() {
            self.metrics_port = file.metrics_port;
        }
    }

    /// Override from environment variables, looked up through `lookup`.
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bucket) = get("BUCKET") {
            self.bucket = bucket;
        }
        if let Some(dir) = get("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(max) = get("MAX_RESULTS") {
            self.max_results = Some(parse_env("MAX_RESULTS", &max)?);
        }
        if let Some(workers) = get("WORKERS") {
            self.workers = parse_env("WORKERS", &workers)?;
        }
        if let Some(endpoint) = get("STORAGE_ENDPOINT") {
            self.storage_endpoint = endpoint;
        }
        if let Some(port) = get("METRICS_PORT") {
            self.metrics_port = Some(parse_env("METRICS_PORT", &port)?);
        }
        Ok(())
    }

    /// Apply command-line values last, then re-check the result.
    pub fn apply_overrides(&mut self, overrides: Overrides) -> Result<()> {
        if let Some(bucket) = overrides.bucket {
            self.bucket = bucket;
        }
        if let Some(output_dir) = overrides.output_dir {
            self.output_dir = output_dir;
        }
        if overrides.max_results.is_some() {
            self.max_results = overrides.max_results;
        }
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        self.check()
    }

    pub fn check(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(IngestError::Config("bucket must not be empty".to_string()));
        }
        if self.workers == 0 {
            return Err(IngestError::Config("workers must be at least 1".to_string()));
        }
        Ok(())
    }
}
