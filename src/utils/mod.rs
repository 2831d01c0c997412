//! Utility module
//!
//! This module provides:
//! - Configuration management
//! - Logging setup

mod config;
mod logging;

pub use config::{Config, DatasetConfig, ForecastConfig, LoggingConfig};
pub use logging::setup_logging;
