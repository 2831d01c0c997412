//! Forecast output and trend directions

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::data::DATE_FORMAT;

/// One forecast point with its uncertainty interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub ds: DateTime<Utc>,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

impl ForecastPoint {
    /// Width of the uncertainty interval
    pub fn interval_width(&self) -> f64 {
        self.yhat_upper - self.yhat_lower
    }
}

/// Row layout of a forecast CSV
#[derive(Debug, Deserialize)]
struct ForecastRow {
    ds: String,
    yhat: f64,
    yhat_lower: f64,
    yhat_upper: f64,
}

/// Load forecast points from a CSV with `ds,yhat,yhat_lower,yhat_upper` columns
pub fn load_forecast_csv<P: AsRef<Path>>(path: P) -> Result<Vec<ForecastPoint>> {
    let mut reader = csv::Reader::from_path(&path)
        .with_context(|| format!("Failed to open file: {:?}", path.as_ref()))?;

    let mut points = Vec::new();
    for result in reader.deserialize() {
        let row: ForecastRow = result.context("Failed to parse forecast row")?;
        let naive = NaiveDateTime::parse_from_str(row.ds.trim(), DATE_FORMAT)
            .with_context(|| format!("Invalid forecast timestamp: {}", row.ds))?;

        points.push(ForecastPoint {
            ds: Utc.from_utc_datetime(&naive),
            yhat: row.yhat,
            yhat_lower: row.yhat_lower,
            yhat_upper: row.yhat_upper,
        });
    }

    Ok(points)
}

/// Direction of a forecast step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    pub fn arrow(&self) -> char {
        match self {
            Trend::Up => '↑',
            Trend::Down => '↓',
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Up => f.write_str("up"),
            Trend::Down => f.write_str("down"),
        }
    }
}

/// Trend per forecast point from the step-to-step change in `yhat`.
///
/// Non-negative changes are `Up`. The first point has no previous value and
/// is reported as `Down`.
pub fn trend_directions(points: &[ForecastPoint]) -> Vec<Trend> {
    let mut trends = Vec::with_capacity(points.len());
    let mut previous: Option<f64> = None;

    for point in points {
        let trend = match previous {
            Some(prev) if point.yhat - prev >= 0.0 => Trend::Up,
            _ => Trend::Down,
        };
        trends.push(trend);
        previous = Some(point.yhat);
    }

    trends
}
