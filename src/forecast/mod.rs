//! Bridge to an external forecasting engine
//!
//! The engine itself is not part of this crate. This module prepares its
//! input, a two-column (ds, y) series, and post-processes its output:
//! point forecasts with lower/upper bounds, turned into trend directions.

mod output;
mod series;

pub use output::{load_forecast_csv, trend_directions, ForecastPoint, Trend};
pub use series::{future_timestamps, parse_interval, ForecastSeries};
