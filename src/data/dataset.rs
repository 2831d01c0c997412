//! Windowed dataset assembly
//!
//! Loads the configured symbols from the archive store, restricts them to a
//! date range and the requested feature columns, then slices the result into
//! look-back windows with paired profit records.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use ndarray::{Array1, Array3};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use super::bar::{feature_matrix, Bar, Feature};
use super::error::{DatasetError, DatasetResult};
use super::storage::KlineArchiveStore;
use super::window::{create_dataset, ProfitRecord, Window};
use crate::utils::DatasetConfig;

/// Marker for "use the series' own first/last timestamp"
pub const NATURAL_BOUND: &str = "-1";

/// Date format accepted for explicit bounds
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Start or end of the requested date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    /// First or last timestamp of the loaded series
    Natural,
    /// Explicit timestamp
    At(DateTime<Utc>),
}

impl DateBound {
    fn resolve(self, natural: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            DateBound::Natural => natural,
            DateBound::At(ts) => ts,
        }
    }
}

impl FromStr for DateBound {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == NATURAL_BOUND {
            return Ok(DateBound::Natural);
        }

        let naive = NaiveDateTime::parse_from_str(s, DATE_FORMAT)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .ok_or_else(|| DatasetError::InvalidDate(s.to_string()))?;

        Ok(DateBound::At(Utc.from_utc_datetime(&naive)))
    }
}

impl fmt::Display for DateBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateBound::Natural => f.write_str(NATURAL_BOUND),
            DateBound::At(ts) => write!(f, "{}", ts.format(DATE_FORMAT)),
        }
    }
}

/// Look-back windows and profit records built from kline dumps
#[derive(Debug, Clone)]
pub struct BinanceDataset {
    windows: Vec<Window>,
    profit_records: Vec<ProfitRecord>,
    feature_names: Vec<String>,
    window_size: usize,
}

impl BinanceDataset {
    /// Build the dataset described by `config` from the archive store
    pub fn new(config: &DatasetConfig) -> DatasetResult<Self> {
        let store = KlineArchiveStore::new(&config.dataset_path, &config.interval);
        let bars = store.load_symbols(&config.crypto_symbols)?;
        info!(
            "Loaded {} bars for {} symbols from {}",
            bars.len(),
            config.crypto_symbols.len(),
            config.dataset_path.display()
        );

        Self::from_bars(
            &bars,
            &config.main_features,
            config.start_date.parse()?,
            config.end_date.parse()?,
            config.window_size,
        )
    }

    /// Build the dataset from bars already in memory
    pub fn from_bars<S: AsRef<str>>(
        bars: &[Bar],
        main_features: &[S],
        start: DateBound,
        end: DateBound,
        window_size: usize,
    ) -> DatasetResult<Self> {
        let features = Feature::select(main_features)?;
        let selected = filter_by_date(bars, start, end)?;

        let matrix = feature_matrix(&selected, &features);
        let timestamps: Vec<DateTime<Utc>> = selected.iter().map(|b| b.timestamp).collect();
        let feature_names: Vec<String> = features.iter().map(|f| f.name().to_string()).collect();

        let (windows, profit_records) =
            create_dataset(matrix.view(), &timestamps, window_size, &feature_names);

        info!(
            "Built {} windows of size {} over {} rows ({})",
            windows.len(),
            window_size,
            selected.len(),
            feature_names.join(", ")
        );

        Ok(Self {
            windows,
            profit_records,
            feature_names,
            window_size,
        })
    }

    /// Windows and their profit records
    pub fn get_dataset(&self) -> (&[Window], &[ProfitRecord]) {
        (&self.windows, &self.profit_records)
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn profit_records(&self) -> &[ProfitRecord] {
        &self.profit_records
    }

    /// Feature column names in matrix order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Number of windows
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Check if no windows were produced
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Stack windows into a (samples, window_size, num_features) tensor
    pub fn to_array3(&self) -> Array3<f64> {
        let num_features = self.feature_names.len();
        let mut tensor = Array3::zeros((self.windows.len(), self.window_size, num_features));

        for (mut sample, window) in tensor.outer_iter_mut().zip(&self.windows) {
            sample.assign(&window.values);
        }

        tensor
    }

    /// Exit prices of the profit records
    pub fn profit_targets(&self) -> Array1<f64> {
        self.profit_records.iter().map(|r| r.exit_price).collect()
    }
}

/// Keep bars whose timestamp lies within the inclusive range.
///
/// Natural bounds resolve to the first and last bar in series order.
pub fn filter_by_date(bars: &[Bar], start: DateBound, end: DateBound) -> DatasetResult<Vec<Bar>> {
    let (first, last) = match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => (first.timestamp, last.timestamp),
        _ => {
            return Err(DatasetError::EmptyRange {
                start: start.to_string(),
                end: end.to_string(),
            })
        }
    };

    let start_ts = start.resolve(first);
    let end_ts = end.resolve(last);

    let selected: Vec<Bar> = bars
        .iter()
        .filter(|b| b.timestamp >= start_ts && b.timestamp <= end_ts)
        .cloned()
        .collect();

    if selected.is_empty() {
        return Err(DatasetError::EmptyRange {
            start: start_ts.format(DATE_FORMAT).to_string(),
            end: end_ts.format(DATE_FORMAT).to_string(),
        });
    }

    Ok(selected)
}
