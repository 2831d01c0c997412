//! # Binance Dataset
//!
//! Builds supervised-learning datasets from Binance kline dumps.
//!
//! ## Modules
//!
//! - `data`: Archive loading, date filtering, look-back windows and profit records
//! - `forecast`: Input series and trend post-processing for an external forecaster
//! - `utils`: Configuration and logging
//!
//! ## Example
//!
//! ```no_run
//! use binance_dataset::{BinanceDataset, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/default.toml")?;
//!     let dataset = BinanceDataset::new(&config.dataset)?;
//!
//!     let (windows, profits) = dataset.get_dataset();
//!     println!("{} windows, {} profit records", windows.len(), profits.len());
//!     Ok(())
//! }
//! ```

pub mod data;
pub mod forecast;
pub mod utils;

// Re-export main types for convenience
pub use data::{
    create_dataset, Bar, BinanceDataset, DatasetError, DatasetResult, DateBound, Feature,
    KlineArchiveStore, ProfitRecord, Window,
};
pub use forecast::{ForecastPoint, ForecastSeries, Trend};
pub use utils::{setup_logging, Config, DatasetConfig};
