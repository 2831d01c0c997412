//! Look-back windows and profit records
//!
//! [`create_dataset`] slides a fixed-size window one row at a time over a
//! feature matrix. Each window is paired with a [`ProfitRecord`] built from
//! the row immediately after it:
//!
//! - `Window[i]` holds rows `i .. i + look_back`
//! - `ProfitRecord[i].timestamp` is `timestamps[i + look_back]`
//! - entry price is the target column at `i + look_back - 1`, exit price the
//!   target column at `i + look_back`
//!
//! The target column is `Mean` when selected, otherwise `Close`, otherwise the
//! first feature.

use chrono::{DateTime, Utc};
use ndarray::{s, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Fixed-length slice of the feature matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Timestamp of the last row in the window
    pub end_timestamp: DateTime<Utc>,
    /// Window values: (look_back, num_features)
    pub values: Array2<f64>,
}

impl Window {
    /// Number of rows in the window
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    /// Check if the window has no rows
    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }
}

/// Forward-looking price movement for one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitRecord {
    /// Timestamp of the row following the window
    pub timestamp: DateTime<Utc>,
    /// Target value on the last row of the window
    pub entry_price: f64,
    /// Target value on the row following the window
    pub exit_price: f64,
}

impl ProfitRecord {
    /// Absolute price change from entry to exit
    pub fn profit(&self) -> f64 {
        self.exit_price - self.entry_price
    }

    /// Percentage change from entry to exit
    pub fn return_pct(&self) -> f64 {
        if self.entry_price != 0.0 {
            self.profit() / self.entry_price * 100.0
        } else {
            0.0
        }
    }
}

/// Index of the column used for profit records
pub fn profit_target_column<S: AsRef<str>>(features: &[S]) -> usize {
    ["Mean", "Close"]
        .iter()
        .find_map(|target| features.iter().position(|f| f.as_ref() == *target))
        .unwrap_or(0)
}

/// Slice a feature matrix into look-back windows with paired profit records.
///
/// Inputs shorter than `look_back + 1` rows, or a zero `look_back`, give empty
/// outputs.
///
/// # Panics
///
/// Panics if `timestamps` is not parallel to the rows of `data`.
pub fn create_dataset<S: AsRef<str>>(
    data: ArrayView2<f64>,
    timestamps: &[DateTime<Utc>],
    look_back: usize,
    features: &[S],
) -> (Vec<Window>, Vec<ProfitRecord>) {
    assert_eq!(
        data.nrows(),
        timestamps.len(),
        "timestamps must be parallel to data rows"
    );

    if look_back == 0 {
        warn!("Window size 0 produces no windows");
        return (vec![], vec![]);
    }

    let n_rows = data.nrows();
    if n_rows <= look_back {
        return (vec![], vec![]);
    }

    let target = profit_target_column(features);
    let n_windows = n_rows - look_back;
    let mut windows = Vec::with_capacity(n_windows);
    let mut profits = Vec::with_capacity(n_windows);

    for start in 0..n_windows {
        let end = start + look_back;

        windows.push(Window {
            end_timestamp: timestamps[end - 1],
            values: data.slice(s![start..end, ..]).to_owned(),
        });

        profits.push(ProfitRecord {
            timestamp: timestamps[end],
            entry_price: data[[end - 1, target]],
            exit_price: data[[end, target]],
        });
    }

    (windows, profits)
}
