use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::{DEFAULT_CATEGORIES, RowPolicy};
#[cfg(feature = "sheets")]
use crate::storage::SheetsBackend;
use crate::storage::{AnyBackend, CsvFileBackend, MemoryBackend, SqliteBackend};

use super::{StoreOptions, WriteStrategy};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub ui: UiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    #[default]
    Csv,
    Sqlite,
    Sheets,
}

impl BackendKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Some(BackendKind::Memory),
            "csv" => Some(BackendKind::Csv),
            "sqlite" => Some(BackendKind::Sqlite),
            "sheets" => Some(BackendKind::Sheets),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    /// File path for csv/sqlite, spreadsheet id for sheets
    #[serde(default = "default_location")]
    pub location: String,

    /// Bearer token for sheets
    #[serde(default)]
    pub credentials: String,

    #[serde(default = "default_sheet")]
    pub sheet: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyName {
    #[default]
    Overwrite,
    Append,
    Optimistic,
}

impl StrategyName {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "overwrite" => Some(StrategyName::Overwrite),
            "append" => Some(StrategyName::Append),
            "optimistic" => Some(StrategyName::Optimistic),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub write_strategy: StrategyName,

    /// Only used by the optimistic strategy
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub row_policy: RowPolicy,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_location() -> String {
    "ledger.csv".to_string()
}

fn default_sheet() -> String {
    "Sheet1".to_string()
}

fn default_api_base() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

fn default_currency() -> String {
    "VND".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            location: default_location(),
            credentials: String::new(),
            sheet: default_sheet(),
            api_base: default_api_base(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            write_strategy: StrategyName::default(),
            max_attempts: default_max_attempts(),
            row_policy: RowPolicy::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            currency: default_currency(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load the config file. A missing file means all defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file {}", path.display()));
            }
        };
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

impl StoreConfig {
    pub fn options(&self) -> StoreOptions {
        let write_strategy = match self.write_strategy {
            StrategyName::Overwrite => WriteStrategy::Overwrite,
            StrategyName::Append => WriteStrategy::Append,
            StrategyName::Optimistic => WriteStrategy::Optimistic {
                max_attempts: self.max_attempts,
            },
        };
        StoreOptions {
            write_strategy,
            row_policy: self.row_policy,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

impl BackendConfig {
    /// Open the configured backend. Location and credentials are handed to
    /// the backend as they are.
    pub async fn open(&self) -> Result<AnyBackend> {
        match self.kind {
            BackendKind::Memory => Ok(AnyBackend::Memory(MemoryBackend::new())),
            BackendKind::Csv => Ok(AnyBackend::Csv(CsvFileBackend::new(&self.location))),
            BackendKind::Sqlite => Ok(AnyBackend::Sqlite(
                SqliteBackend::open(&self.location).await?,
            )),
            #[cfg(feature = "sheets")]
            BackendKind::Sheets => Ok(AnyBackend::Sheets(
                SheetsBackend::new(
                    &self.api_base,
                    &self.location,
                    &self.sheet,
                    &self.credentials,
                )
                .context("Failed to set up the spreadsheet client")?,
            )),
            #[cfg(not(feature = "sheets"))]
            BackendKind::Sheets => anyhow::bail!("this build has no spreadsheet support (feature `sheets`)"),
        }
    }
}
