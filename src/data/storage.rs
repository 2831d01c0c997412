//! Kline archive storage
//!
//! Dumps are laid out as `{root}/{SYMBOL}/{interval}/NAME.zip`, each archive
//! holding one headerless CSV entry called `NAME` (or `NAME.csv`). Unpacked
//! dumps keep the CSV next to its archive, in which case the sibling file is
//! read directly.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::bar::{open_time_to_datetime, Bar};
use super::error::{DatasetError, DatasetResult};

/// Default kline resolution of the dumps
pub const DEFAULT_INTERVAL: &str = "30m";

const ARCHIVE_EXTENSION: &str = "zip";

/// Reader/writer for per-symbol kline archives
#[derive(Debug, Clone)]
pub struct KlineArchiveStore {
    root: PathBuf,
    interval: String,
}

impl KlineArchiveStore {
    /// Create a store rooted at `root` for the given interval directory
    pub fn new(root: impl Into<PathBuf>, interval: &str) -> Self {
        Self {
            root: root.into(),
            interval: interval.to_string(),
        }
    }

    /// Root directory of the dumps
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one symbol's archives
    pub fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.root.join(symbol).join(&self.interval)
    }

    /// List a symbol's archives in filename order
    pub fn list_archives(&self, symbol: &str) -> DatasetResult<Vec<PathBuf>> {
        let symbol_root = self.root.join(symbol);
        if !symbol_root.is_dir() {
            return Err(DatasetError::not_found(symbol_root, "symbol directory missing"));
        }

        let dir = self.symbol_dir(symbol);
        if !dir.is_dir() {
            return Err(DatasetError::not_found(dir, "interval directory missing"));
        }

        let mut archives = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(ARCHIVE_EXTENSION)
            {
                archives.push(path);
            }
        }

        if archives.is_empty() {
            return Err(DatasetError::not_found(dir, "no .zip archives"));
        }

        archives.sort();
        Ok(archives)
    }

    /// Load and concatenate bars for all symbols.
    ///
    /// Symbols are visited in lexicographic order regardless of the order
    /// given; bars are not re-sorted by time.
    pub fn load_symbols<S: AsRef<str>>(&self, symbols: &[S]) -> DatasetResult<Vec<Bar>> {
        let mut ordered: Vec<&str> = symbols.iter().map(|s| s.as_ref()).collect();
        ordered.sort_unstable();
        ordered.dedup();

        let mut bars = Vec::new();
        for symbol in ordered {
            for archive in self.list_archives(symbol)? {
                let loaded = self.read_archive(&archive)?;
                debug!("Read {} bars from {}", loaded.len(), archive.display());
                bars.extend(loaded);
            }
        }

        Ok(bars)
    }

    /// Read the bars stored under one archive
    pub fn read_archive(&self, archive: &Path) -> DatasetResult<Vec<Bar>> {
        let stem = archive
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DatasetError::not_found(archive, "archive has no file name"))?;
        let candidates = [stem.to_string(), format!("{}.csv", stem)];

        for name in &candidates {
            let extracted = archive.with_file_name(name);
            if extracted.is_file() {
                let file = File::open(&extracted)?;
                return parse_bars(BufReader::new(file), &extracted.display().to_string());
            }
        }

        if !archive.is_file() {
            return Err(DatasetError::not_found(archive, "archive missing"));
        }

        let mut zip = ZipArchive::new(BufReader::new(File::open(archive)?))?;
        let Some(name) = candidates.iter().find(|name| zip.index_for_name(name).is_some()) else {
            return Err(DatasetError::not_found(
                archive,
                format!("archive has no entry named {}", stem),
            ));
        };

        let entry = zip.by_name(name)?;
        parse_bars(entry, &format!("{}:{}", archive.display(), name))
    }

    /// Write bars as `NAME.zip` with a headerless `NAME` entry.
    ///
    /// Returns the archive path.
    pub fn write_archive(&self, symbol: &str, name: &str, bars: &[Bar]) -> DatasetResult<PathBuf> {
        let dir = self.symbol_dir(symbol);
        fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}.{}", name, ARCHIVE_EXTENSION));
        let mut zip = ZipWriter::new(BufWriter::new(File::create(&path)?));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(name, options)?;

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut zip);
            for bar in bars {
                writer.write_record(&[
                    bar.timestamp.timestamp_millis().to_string(),
                    bar.open.to_string(),
                    bar.high.to_string(),
                    bar.low.to_string(),
                    bar.close.to_string(),
                    bar.volume.to_string(),
                ])?;
            }
            writer.flush()?;
        }
        zip.finish()?.flush()?;

        debug!("Wrote {} bars to {}", bars.len(), path.display());
        Ok(path)
    }
}

/// Parse a headerless kline CSV.
///
/// Rows with a missing required value are dropped; non-numeric or non-UTF-8
/// values fail with `MalformedRow`.
pub fn parse_bars<R: Read>(reader: R, source_name: &str) -> DatasetResult<Vec<Bar>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();
    let mut dropped = 0usize;

    for (index, result) in csv_reader.byte_records().enumerate() {
        let raw = result?;
        let line = raw.position().map(|p| p.line()).unwrap_or(index as u64 + 1);
        let record = StringRecord::from_byte_record(raw)
            .map_err(|e| DatasetError::malformed(source_name, line, e.to_string()))?;

        if index == 0 && is_header(&record) {
            continue;
        }

        match parse_record(&record, source_name, line)? {
            Some(bar) => bars.push(bar),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!("Dropped {} incomplete rows from {}", dropped, source_name);
    }

    Ok(bars)
}

fn is_header(record: &StringRecord) -> bool {
    record
        .get(0)
        .map(|field| field.eq_ignore_ascii_case("open_time"))
        .unwrap_or(false)
}

/// Parse the leading columns of one row.
///
/// Every field is parsed before deciding, so a non-numeric value fails the row
/// even when another field is missing.
fn parse_record(
    record: &StringRecord,
    source_name: &str,
    line: u64,
) -> DatasetResult<Option<Bar>> {
    let open_time = match record.get(0) {
        Some(field) => parse_field::<i64>(field, source_name, line)?,
        None => None,
    };

    let mut values = [None; 5];
    for (slot, field) in values.iter_mut().zip(record.iter().skip(1)) {
        *slot = parse_field::<f64>(field, source_name, line)?.filter(|v| v.is_finite());
    }

    let (Some(open_time), [Some(open), Some(high), Some(low), Some(close), Some(volume)]) =
        (open_time, values)
    else {
        return Ok(None);
    };

    let timestamp = open_time_to_datetime(open_time).ok_or_else(|| {
        let message = format!("open time out of range: {}", open_time);
        DatasetError::malformed(source_name, line, message)
    })?;

    Ok(Some(Bar::new(timestamp, open, high, low, close, volume)))
}

/// Parse one field; empty and NaN-like fields count as missing
fn parse_field<T: std::str::FromStr>(
    field: &str,
    source_name: &str,
    line: u64,
) -> DatasetResult<Option<T>> {
    let missing = ["", "nan", "null"];
    if missing.iter().any(|m| field.eq_ignore_ascii_case(m)) {
        return Ok(None);
    }

    field.parse::<T>().map(Some).map_err(|_| {
        DatasetError::malformed(source_name, line, format!("not a number: '{}'", field))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const ROWS: &str = "\
1704067200000,100.0,110.0,90.0,105.0,12.5,1704068999999,1300.0,42,6.0,600.0,0
1704069000000,105.0,115.0,95.0,110.0,8.0,1704070799999,900.0,30,4.0,400.0,0
";

    #[test]
    fn test_parse_bars_reads_leading_columns() {
        let bars = parse_bars(ROWS.as_bytes(), "test").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 12.5);
        assert_eq!(bars[1].timestamp.timestamp_millis(), 1_704_069_000_000);
    }

    #[test]
    fn test_parse_bars_skips_binance_header() {
        let data = format!("open_time,open,high,low,close,volume\n{}", ROWS);
        let bars = parse_bars(data.as_bytes(), "test").unwrap();
        assert_eq!(bars.len(), 2);
    }

    #[test]
    fn test_parse_bars_drops_missing_values() {
        let data = "\
1704067200000,100.0,110.0,90.0,105.0,12.5
1704069000000,105.0,,95.0,110.0,8.0
1704070800000,105.0,115.0,NaN,110.0,8.0
1704072600000,105.0,115.0
1704074400000,106.0,116.0,96.0,111.0,9.0
";
        let bars = parse_bars(data.as_bytes(), "test").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].open, 106.0);
    }

    #[test]
    fn test_parse_bars_malformed_row() {
        let data = "\
1704067200000,100.0,110.0,90.0,105.0,12.5
1704069000000,105.0,abc,95.0,110.0,8.0
";
        let err = parse_bars(data.as_bytes(), "dump.csv").unwrap_err();
        match err {
            DatasetError::MalformedRow { source_name, line, .. } => {
                assert_eq!(source_name, "dump.csv");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_bars_open_time_out_of_range() {
        let data = "-9223372036854775808,1.0,2.0,0.5,1.5,3.0\n";
        let err = parse_bars(data.as_bytes(), "dump.csv").unwrap_err();
        assert!(matches!(
            err,
            DatasetError::MalformedRow { line: 1, message, .. } if message.contains("out of range")
        ));
    }

    #[test]
    fn test_parse_bars_invalid_utf8_is_malformed() {
        let mut data = b"1704067200000,100.0,110.0,90.0,105.0,12.5\n1704069000000,105.0,".to_vec();
        data.extend_from_slice(b"\xff\xfe,95.0,110.0,8.0\n");

        let err = parse_bars(data.as_slice(), "dump.csv").unwrap_err();
        assert!(matches!(err, DatasetError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn test_non_numeric_field_fails_regardless_of_order() {
        let empty_first = "1704067200000,2.0,,4.0,abc,5.0\n";
        let err = parse_bars(empty_first.as_bytes(), "dump.csv").unwrap_err();
        assert!(matches!(err, DatasetError::MalformedRow { .. }));

        let empty_last = "1704067200000,abc,,4.0,5.0,6.0\n";
        let err = parse_bars(empty_last.as_bytes(), "dump.csv").unwrap_err();
        assert!(matches!(err, DatasetError::MalformedRow { .. }));
    }

    #[test]
    fn test_archive_round_trip_through_store() {
        let dir = tempdir().unwrap();
        let store = KlineArchiveStore::new(dir.path(), DEFAULT_INTERVAL);
        let bars = parse_bars(ROWS.as_bytes(), "test").unwrap();

        let path = store
            .write_archive("BTCUSDT", "BTCUSDT-30m-2024-01", &bars)
            .unwrap();
        assert!(path.ends_with("BTCUSDT/30m/BTCUSDT-30m-2024-01.zip"));

        let loaded = store.read_archive(&path).unwrap();
        assert_eq!(loaded, bars);
    }

    #[test]
    fn test_extracted_sibling_takes_precedence() {
        let dir = tempdir().unwrap();
        let store = KlineArchiveStore::new(dir.path(), DEFAULT_INTERVAL);
        let bars = parse_bars(ROWS.as_bytes(), "test").unwrap();
        let path = store
            .write_archive("ETHUSDT", "ETHUSDT-30m-2024-01", &bars)
            .unwrap();

        std::fs::write(
            path.with_file_name("ETHUSDT-30m-2024-01"),
            "1704067200000,1.0,2.0,0.5,1.5,3.0\n",
        )
        .unwrap();

        let loaded = store.read_archive(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].close, 1.5);
    }

    #[test]
    fn test_list_archives_errors() {
        let dir = tempdir().unwrap();
        let store = KlineArchiveStore::new(dir.path(), DEFAULT_INTERVAL);

        let err = store.list_archives("BTCUSDT").unwrap_err();
        assert!(matches!(err, DatasetError::DataNotFound { .. }));

        std::fs::create_dir_all(dir.path().join("BTCUSDT").join("30m")).unwrap();
        let err = store.list_archives("BTCUSDT").unwrap_err();
        assert!(matches!(
            err,
            DatasetError::DataNotFound { reason, .. } if reason.contains("no .zip")
        ));
    }

    #[test]
    fn test_list_archives_sorted() {
        let dir = tempdir().unwrap();
        let store = KlineArchiveStore::new(dir.path(), DEFAULT_INTERVAL);
        let bars = parse_bars(ROWS.as_bytes(), "test").unwrap();

        store.write_archive("BTCUSDT", "BTCUSDT-30m-2024-02", &bars).unwrap();
        store.write_archive("BTCUSDT", "BTCUSDT-30m-2024-01", &bars).unwrap();

        let names: Vec<String> = store
            .list_archives("BTCUSDT")
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["BTCUSDT-30m-2024-01.zip", "BTCUSDT-30m-2024-02.zip"]);
    }
}
