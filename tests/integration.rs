//! Integration tests for dataset assembly from archive dumps

use binance_dataset::data::DEFAULT_INTERVAL;
use binance_dataset::{
    Bar, BinanceDataset, DatasetConfig, DatasetError, DateBound, KlineArchiveStore,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::path::Path;
use tempfile::tempdir;

fn start_of(month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).unwrap()
}

/// Bars every 30 minutes where low = v - 1, high = v + 1, so mean = v
fn ramp(start: DateTime<Utc>, first: usize, n: usize) -> Vec<Bar> {
    (first..first + n)
        .map(|v| {
            let v = v as f64;
            let ts = start + Duration::minutes(30 * (v as i64 - first as i64));
            Bar::new(ts, v, v + 1.0, v - 1.0, v + 0.5, 100.0 + v)
        })
        .collect()
}

fn config(root: &Path, symbols: &[&str], window_size: usize) -> DatasetConfig {
    DatasetConfig {
        dataset_path: root.to_path_buf(),
        crypto_symbols: symbols.iter().map(|s| s.to_string()).collect(),
        main_features: vec!["Mean".to_string()],
        start_date: "-1".to_string(),
        end_date: "-1".to_string(),
        window_size,
        interval: DEFAULT_INTERVAL.to_string(),
    }
}

#[test]
fn test_hundred_row_series() {
    let dir = tempdir().unwrap();
    let store = KlineArchiveStore::new(dir.path(), DEFAULT_INTERVAL);
    store
        .write_archive("BTCUSDT", "BTCUSDT-30m-2024-01", &ramp(start_of(1), 0, 100))
        .unwrap();

    let dataset = BinanceDataset::new(&config(dir.path(), &["BTCUSDT"], 10)).unwrap();
    let (windows, profits) = dataset.get_dataset();

    assert_eq!(windows.len(), 90);
    assert_eq!(profits.len(), 90);

    let first: Vec<f64> = windows[0].values.iter().copied().collect();
    let last: Vec<f64> = windows[89].values.iter().copied().collect();
    assert_eq!(first, (0..10).map(|v| v as f64).collect::<Vec<_>>());
    assert_eq!(last, (89..99).map(|v| v as f64).collect::<Vec<_>>());

    assert_eq!(profits[0].timestamp, start_of(1) + Duration::minutes(30 * 10));
    assert_eq!(profits[89].exit_price, 99.0);
}

#[test]
fn test_archives_concatenate_in_name_order() {
    let dir = tempdir().unwrap();
    let store = KlineArchiveStore::new(dir.path(), DEFAULT_INTERVAL);

    // February written first; January must still come first
    store
        .write_archive("BTCUSDT", "BTCUSDT-30m-2024-02", &ramp(start_of(2), 20, 20))
        .unwrap();
    store
        .write_archive("BTCUSDT", "BTCUSDT-30m-2024-01", &ramp(start_of(1), 0, 20))
        .unwrap();

    let bars = store.load_symbols(&["BTCUSDT"]).unwrap();
    assert_eq!(bars.len(), 40);
    assert_eq!(bars[0].timestamp, start_of(1));
    assert_eq!(bars[20].timestamp, start_of(2));
}

#[test]
fn test_symbol_order_is_lexicographic() {
    let dir = tempdir().unwrap();
    let store = KlineArchiveStore::new(dir.path(), DEFAULT_INTERVAL);
    store
        .write_archive("ETHUSDT", "ETHUSDT-30m-2024-01", &ramp(start_of(1), 500, 5))
        .unwrap();
    store
        .write_archive("BTCUSDT", "BTCUSDT-30m-2024-01", &ramp(start_of(1), 0, 5))
        .unwrap();

    let forward = store.load_symbols(&["BTCUSDT", "ETHUSDT"]).unwrap();
    let reversed = store.load_symbols(&["ETHUSDT", "BTCUSDT"]).unwrap();

    assert_eq!(forward, reversed);
    assert_eq!(forward[0].open, 0.0);
    assert_eq!(forward[5].open, 500.0);
}

#[test]
fn test_construction_is_idempotent() {
    let dir = tempdir().unwrap();
    let store = KlineArchiveStore::new(dir.path(), DEFAULT_INTERVAL);
    store
        .write_archive("SOLUSDT", "SOLUSDT-30m-2024-01", &ramp(start_of(1), 0, 50))
        .unwrap();
    store
        .write_archive("ADAUSDT", "ADAUSDT-30m-2024-01", &ramp(start_of(1), 1000, 50))
        .unwrap();

    let mut cfg = config(dir.path(), &["SOLUSDT", "ADAUSDT"], 8);
    cfg.main_features = vec!["Open".to_string(), "Volume".to_string(), "Mean".to_string()];

    let a = BinanceDataset::new(&cfg).unwrap();
    let b = BinanceDataset::new(&cfg).unwrap();

    assert_eq!(a.windows(), b.windows());
    assert_eq!(a.profit_records(), b.profit_records());
    assert_eq!(a.to_array3(), b.to_array3());
}

#[test]
fn test_date_range_filters_inclusively() {
    let dir = tempdir().unwrap();
    let store = KlineArchiveStore::new(dir.path(), DEFAULT_INTERVAL);
    store
        .write_archive("BTCUSDT", "BTCUSDT-30m-2024-01", &ramp(start_of(1), 0, 48))
        .unwrap();

    let mut cfg = config(dir.path(), &["BTCUSDT"], 4);
    cfg.start_date = "2024-01-01 01:00:00".to_string();
    cfg.end_date = "2024-01-01 06:00:00".to_string();

    // 01:00 through 06:00 inclusive at 30 minute steps: rows 2..=12
    let dataset = BinanceDataset::new(&cfg).unwrap();
    assert_eq!(dataset.len(), 11 - 4);
    assert_eq!(dataset.windows()[0].values[[0, 0]], 2.0);
    assert_eq!(
        dataset.profit_records().last().unwrap().timestamp,
        Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap()
    );
}

#[test]
fn test_start_after_last_bar_is_empty_range() {
    let dir = tempdir().unwrap();
    let store = KlineArchiveStore::new(dir.path(), DEFAULT_INTERVAL);
    store
        .write_archive("BTCUSDT", "BTCUSDT-30m-2024-01", &ramp(start_of(1), 0, 10))
        .unwrap();

    let mut cfg = config(dir.path(), &["BTCUSDT"], 4);
    cfg.start_date = "2025-01-01 00:00:00".to_string();

    let err = BinanceDataset::new(&cfg).unwrap_err();
    assert!(matches!(err, DatasetError::EmptyRange { .. }));
}

#[test]
fn test_missing_symbol_is_data_not_found() {
    let dir = tempdir().unwrap();
    let store = KlineArchiveStore::new(dir.path(), DEFAULT_INTERVAL);
    store
        .write_archive("BTCUSDT", "BTCUSDT-30m-2024-01", &ramp(start_of(1), 0, 10))
        .unwrap();

    let err = BinanceDataset::new(&config(dir.path(), &["BTCUSDT", "XLMUSDT"], 4)).unwrap_err();
    match err {
        DatasetError::DataNotFound { path, .. } => assert!(path.ends_with("XLMUSDT")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_malformed_row_fails_whole_build() {
    let dir = tempdir().unwrap();
    let store = KlineArchiveStore::new(dir.path(), DEFAULT_INTERVAL);
    let archive = store
        .write_archive("BTCUSDT", "BTCUSDT-30m-2024-01", &ramp(start_of(1), 0, 10))
        .unwrap();

    // An extracted sibling is read instead of the archive entry
    std::fs::write(
        archive.with_file_name("BTCUSDT-30m-2024-01.csv"),
        "1704067200000,1.0,2.0,0.5,1.5,3.0\n1704069000000,1.0,two,0.5,1.5,3.0\n",
    )
    .unwrap();

    let err = BinanceDataset::new(&config(dir.path(), &["BTCUSDT"], 1)).unwrap_err();
    assert!(matches!(err, DatasetError::MalformedRow { line: 2, .. }));
}

#[test]
fn test_window_boundaries_through_assembler() {
    let bars = ramp(start_of(1), 0, 11);

    let (start, end) = (DateBound::Natural, DateBound::Natural);

    let one = BinanceDataset::from_bars(&bars, &["Mean"], start, end, 10).unwrap();
    assert_eq!(one.len(), 1);

    let none = BinanceDataset::from_bars(&bars, &["Mean"], start, end, 11).unwrap();
    assert!(none.is_empty());
    assert!(none.profit_records().is_empty());
}

#[test]
fn test_unknown_feature_is_rejected() {
    let bars = ramp(start_of(1), 0, 11);
    let (start, end) = (DateBound::Natural, DateBound::Natural);
    let err = BinanceDataset::from_bars(&bars, &["Spread"], start, end, 2).unwrap_err();
    assert!(matches!(err, DatasetError::UnknownFeature(_)));
}
