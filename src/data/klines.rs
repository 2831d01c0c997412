//! Saved REST kline payloads
//!
//! The klines endpoint returns an array of 12-element arrays:
//! open time, open, high, low, close, volume, close time, quote volume,
//! trade count, taker buy base volume, taker buy quote volume, ignore.
//! Only the first six fields are used.

use serde_json::Value;

use super::bar::{open_time_to_datetime, Bar};
use super::error::{DatasetError, DatasetResult};

const SOURCE_NAME: &str = "klines";

/// Parse a klines JSON payload into bars
pub fn parse_klines(json: &str) -> DatasetResult<Vec<Bar>> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(json)?;

    rows.iter()
        .enumerate()
        .map(|(index, row)| parse_row(row, index as u64))
        .collect()
}

fn parse_row(row: &[Value], index: u64) -> DatasetResult<Bar> {
    if row.len() < 6 {
        return Err(DatasetError::malformed(
            SOURCE_NAME,
            index,
            format!("expected at least 6 fields, got {}", row.len()),
        ));
    }

    let open_time = match &row[0] {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        DatasetError::malformed(SOURCE_NAME, index, "open time is not an integer")
    })?;

    let timestamp = open_time_to_datetime(open_time).ok_or_else(|| {
        let message = format!("open time out of range: {}", open_time);
        DatasetError::malformed(SOURCE_NAME, index, message)
    })?;

    let number = |i: usize| -> DatasetResult<f64> {
        let value = match &row[i] {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        };
        value.ok_or_else(|| {
            DatasetError::malformed(SOURCE_NAME, index, format!("field {} is not numeric", i))
        })
    };

    Ok(Bar::new(
        timestamp,
        number(1)?,
        number(2)?,
        number(3)?,
        number(4)?,
        number(5)?,
    ))
}
