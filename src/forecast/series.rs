//! Forecast input series and future timestamp grid

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::data::{Bar, DATE_FORMAT};

/// Two-column (ds, y) series with y = bar mean
#[derive(Debug, Clone, Default)]
pub struct ForecastSeries {
    pub points: Vec<(DateTime<Utc>, f64)>,
}

impl ForecastSeries {
    /// Build the series from bars, skipping non-finite means
    pub fn from_bars(bars: &[Bar]) -> Self {
        let points = bars
            .iter()
            .map(|b| (b.timestamp, b.mean()))
            .filter(|(_, y)| y.is_finite())
            .collect();

        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Timestamp of the last observation
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|(ds, _)| *ds)
    }

    /// Save as CSV with a `ds,y` header
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create file: {:?}", path.as_ref()))?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "ds,y")?;
        for (ds, y) in &self.points {
            writeln!(writer, "{},{}", ds.format(DATE_FORMAT), y)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Parse an interval such as `30m`, `4h`, `1d` or `1w`
pub fn parse_interval(interval: &str) -> Result<Duration> {
    let interval = interval.trim();
    let split = interval
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| anyhow!("Interval '{}' has no unit", interval))?;
    let (count, unit) = interval.split_at(split);

    let count: i64 = count
        .parse()
        .with_context(|| format!("Interval '{}' has no count", interval))?;
    if count <= 0 {
        bail!("Interval '{}' must be positive", interval);
    }

    let duration = match unit {
        "m" => Duration::try_minutes(count),
        "h" => Duration::try_hours(count),
        "d" => Duration::try_days(count),
        "w" => Duration::try_weeks(count),
        _ => bail!("Unsupported interval unit '{}'", unit),
    };

    duration.ok_or_else(|| anyhow!("Interval '{}' is out of range", interval))
}

/// Timestamps to forecast: `start` plus `periods` further steps.
///
/// Fails if any step falls outside the representable date range.
pub fn future_timestamps(
    start: DateTime<Utc>,
    periods: usize,
    step: Duration,
) -> Result<Vec<DateTime<Utc>>> {
    (0..=periods)
        .map(|i| {
            let offset = i32::try_from(i)
                .ok()
                .and_then(|n| step.checked_mul(n))
                .ok_or_else(|| anyhow!("Forecast step {} overflows", i))?;
            start
                .checked_add_signed(offset)
                .ok_or_else(|| anyhow!("Forecast step {} is past the supported date range", i))
        })
        .collect()
}
