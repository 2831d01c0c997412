//! Configuration management
//!
//! This module handles loading and managing configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::{DEFAULT_INTERVAL, NATURAL_BOUND};

/// Dataset configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Root of the `{SYMBOL}/{interval}/*.zip` dumps
    pub dataset_path: PathBuf,
    pub crypto_symbols: Vec<String>,
    pub main_features: Vec<String>,
    /// `%Y-%m-%d %H:%M:%S`, or `-1` for the first available bar
    pub start_date: String,
    /// `%Y-%m-%d %H:%M:%S`, or `-1` for the last available bar
    pub end_date: String,
    pub window_size: usize,
    pub interval: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/binance-data/data/spot/monthly/klines"),
            crypto_symbols: [
                "ADAUSDT", "ALGOUSDT", "ARBUSDT", "AVAXUSDT", "BNBUSDT", "BTCUSDT", "DOGEUSDT",
                "ETHUSDT", "FILUSDT", "LTCUSDT", "MATICUSDT", "SOLUSDT", "XLMUSDT",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            main_features: vec!["Mean".to_string()],
            start_date: NATURAL_BOUND.to_string(),
            end_date: NATURAL_BOUND.to_string(),
            window_size: 10,
            interval: DEFAULT_INTERVAL.to_string(),
        }
    }
}

/// Forecast bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of steps after the start timestamp
    pub periods: usize,
    pub interval: String,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            periods: 10,
            interval: DEFAULT_INTERVAL.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub forecast: ForecastConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {:?}", path.as_ref()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load configuration from file or use default
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create default configuration file
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        Config::default().save(path)
    }
}
