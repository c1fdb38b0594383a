//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use biblion_store::Store;
use serde::Deserialize;

/// Run configuration, passed explicitly to the catalog and planner.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub sources: SourcesConfig,
    pub store: StoreConfig,
    pub populate: PopulateConfig,
}

/// One optional path per corpus. An absent path makes that source's
/// tables unavailable.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SourcesConfig {
    pub crossref: Option<PathBuf>,
    pub orcid: Option<PathBuf>,
    pub dblp: Option<PathBuf>,
    pub ror: Option<PathBuf>,
    pub doaj: Option<PathBuf>,
    pub journal_titles: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    /// DuckDB memory limit, e.g. `"8GB"`
    pub memory_limit: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./biblion.duckdb"),
            memory_limit: None,
        }
    }
}

impl StoreConfig {
    pub fn open(&self) -> Result<Store> {
        let store = Store::open(&self.path)
            .with_context(|| format!("Failed to open store: {}", self.path.display()))?;
        if let Some(limit) = &self.memory_limit {
            store
                .set_memory_limit(limit)
                .with_context(|| format!("Invalid memory limit: {limit}"))?;
        }
        Ok(store)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PopulateConfig {
    /// Rows per committed transaction
    pub batch_size: usize,
    /// Concurrent population jobs
    pub workers: usize,
}

impl Default for PopulateConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            batch_size: 10_000,
            workers: cpus.min(4),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./biblion.toml (current directory)
    /// 2. ~/.config/biblion/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("biblion.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "biblion") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
