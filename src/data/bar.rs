//! OHLCV bar and feature column definitions
//!
//! A [`Bar`] is a single kline read from a dump. [`Feature`] names the numeric
//! columns that can be selected into a feature matrix.

use chrono::{DateTime, TimeZone, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{DatasetError, DatasetResult};

/// Open times at or above this value are epoch microseconds rather than milliseconds
const MICROS_THRESHOLD: i64 = 100_000_000_000_000;

/// Single OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Open time (UTC)
    pub timestamp: DateTime<Utc>,
    /// Lowest price
    pub low: f64,
    /// Highest price
    pub high: f64,
    /// Opening price
    pub open: f64,
    /// Closing price
    pub close: f64,
    /// Base asset volume
    pub volume: f64,
}

impl Bar {
    /// Create a new bar
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            low,
            high,
            open,
            close,
            volume,
        }
    }

    /// Midpoint of the bar's range: (low + high) / 2
    pub fn mean(&self) -> f64 {
        (self.low + self.high) / 2.0
    }

    /// Value of the given feature column for this bar
    pub fn feature(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Low => self.low,
            Feature::High => self.high,
            Feature::Open => self.open,
            Feature::Close => self.close,
            Feature::Volume => self.volume,
            Feature::Mean => self.mean(),
        }
    }

    /// Whether every required column holds a finite value
    pub fn is_complete(&self) -> bool {
        [self.low, self.high, self.open, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Convert a kline open time to a UTC timestamp.
///
/// Dumps store epoch milliseconds; newer spot dumps use microseconds.
pub fn open_time_to_datetime(open_time: i64) -> Option<DateTime<Utc>> {
    if open_time.unsigned_abs() >= MICROS_THRESHOLD.unsigned_abs() {
        Utc.timestamp_micros(open_time).single()
    } else {
        Utc.timestamp_millis_opt(open_time).single()
    }
}

/// Numeric column that can be selected into a feature matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Feature {
    Low,
    High,
    Open,
    Close,
    Volume,
    Mean,
}

impl Feature {
    /// All features in canonical column order
    pub const ALL: [Feature; 6] = [
        Feature::Low,
        Feature::High,
        Feature::Open,
        Feature::Close,
        Feature::Volume,
        Feature::Mean,
    ];

    /// Canonical column name
    pub fn name(&self) -> &'static str {
        match self {
            Feature::Low => "Low",
            Feature::High => "High",
            Feature::Open => "Open",
            Feature::Close => "Close",
            Feature::Volume => "Volume",
            Feature::Mean => "Mean",
        }
    }

    /// Resolve a caller-supplied list of feature names.
    ///
    /// The result is deduplicated and in canonical order. An empty list
    /// selects `Mean`, which is always derivable.
    pub fn select<S: AsRef<str>>(names: &[S]) -> DatasetResult<Vec<Feature>> {
        let mut selected = names
            .iter()
            .map(|name| name.as_ref().parse::<Feature>())
            .collect::<DatasetResult<Vec<_>>>()?;

        if selected.is_empty() {
            selected.push(Feature::Mean);
        }

        selected.sort();
        selected.dedup();
        Ok(selected)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DatasetError::UnknownFeature(s.to_string()))
    }
}

/// Build a (bars x features) matrix from the selected columns
pub fn feature_matrix(bars: &[Bar], features: &[Feature]) -> Array2<f64> {
    Array2::from_shape_fn((bars.len(), features.len()), |(i, j)| {
        bars[i].feature(features[j])
    })
}
