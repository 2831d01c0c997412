//! Data module for loading kline dumps and building windowed datasets
//!
//! This module provides:
//! - OHLCV bar and feature column types
//! - Archive storage in the `{root}/{SYMBOL}/{interval}/*.zip` layout
//! - Parsing of saved klines JSON payloads
//! - Look-back window construction and dataset assembly

mod bar;
mod dataset;
mod error;
mod klines;
mod storage;
mod window;

pub use bar::{feature_matrix, open_time_to_datetime, Bar, Feature};
pub use dataset::{filter_by_date, BinanceDataset, DateBound, DATE_FORMAT, NATURAL_BOUND};
pub use error::{DatasetError, DatasetResult};
pub use klines::parse_klines;
pub use storage::{parse_bars, KlineArchiveStore, DEFAULT_INTERVAL};
pub use window::{create_dataset, profit_target_column, ProfitRecord, Window};
