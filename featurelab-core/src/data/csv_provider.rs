//! CSV directory provider.
//!
//! Looks up `{dir}/{SYMBOL}_{interval}.csv`, then `{dir}/{SYMBOL}.csv`.
//! The first column holds the timestamp (date or datetime); the remaining
//! header cells name the numeric columns. Multi-level exports (a `Ticker`
//! row and a bare `Date` row under the header) keep only the top level:
//! any row before the first parseable timestamp is treated as an extra
//! header level and skipped, and repeated top-level names keep their first
//! occurrence.
//!
//! Rows are sorted by timestamp and de-duplicated (first occurrence wins)
//! before the requested range is applied.

use super::provider::{DataError, DataProvider, DownloadOptions};
use crate::names;
use crate::table::FeatureTable;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};

/// Reads OHLCV tables from CSV files in one directory.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The file that would be read for a symbol and interval, if any.
    pub fn resolve(&self, symbol: &str, options: &DownloadOptions) -> Option<PathBuf> {
        [
            self.dir.join(format!("{symbol}_{}.csv", options.interval)),
            self.dir.join(format!("{symbol}.csv")),
        ]
        .into_iter()
        .find(|p| p.is_file())
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn download(&self, symbol: &str, options: &DownloadOptions) -> Result<FeatureTable, DataError> {
        let path = self
            .resolve(symbol, options)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        tracing::debug!(symbol, path = %path.display(), "reading CSV history");

        let parsed = read_ohlcv_csv(&path)?;
        let (index, columns) = parsed.into_range(options);
        if index.is_empty() {
            return Err(DataError::EmptyHistory {
                symbol: symbol.to_string(),
            });
        }

        FeatureTable::from_columns(index, columns)
            .map_err(|e| DataError::Validation(format!("{}: {e}", path.display())))
    }
}

/// Parsed CSV contents: one timestamp and one value per column for each row.
struct ParsedCsv {
    names: Vec<String>,
    rows: Vec<(NaiveDateTime, Vec<f64>)>,
}

impl ParsedCsv {
    fn into_range(self, options: &DownloadOptions) -> (Vec<NaiveDateTime>, Vec<(String, Vec<f64>)>) {
        let kept: Vec<&(NaiveDateTime, Vec<f64>)> = self
            .rows
            .iter()
            .filter(|(ts, _)| options.range.contains(*ts))
            .collect();
        let index = kept.iter().map(|(ts, _)| *ts).collect();
        let columns = self
            .names
            .iter()
            .enumerate()
            .map(|(c, name)| (name.clone(), kept.iter().map(|(_, row)| row[c]).collect()))
            .collect();
        (index, columns)
    }
}

fn read_ohlcv_csv(path: &Path) -> Result<ParsedCsv, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::Io(format!("{}: {e}", path.display())))?;

    let mut records = reader.records();
    let header = records
        .next()
        .ok_or_else(|| DataError::Validation(format!("{}: empty file", path.display())))?
        .map_err(|e| DataError::Io(format!("{}: {e}", path.display())))?;

    // Column slots: (position in the record, canonical name). The first
    // occurrence of a top-level name wins.
    let mut slots: Vec<(usize, String)> = Vec::new();
    for (pos, cell) in header.iter().enumerate().skip(1) {
        let name = canonical_name(cell);
        if name.is_empty() || slots.iter().any(|(_, n)| *n == name) {
            continue;
        }
        slots.push((pos, name));
    }
    for required in names::OHLCV {
        if !slots.iter().any(|(_, n)| n == required) {
            return Err(DataError::Validation(format!(
                "{}: missing column '{required}'",
                path.display()
            )));
        }
    }

    let mut rows = Vec::new();
    for (line, record) in records.enumerate() {
        let record = record.map_err(|e| DataError::Io(format!("{}: {e}", path.display())))?;
        let first = record.get(0).unwrap_or_default();
        let Some(timestamp) = parse_timestamp(first) else {
            if rows.is_empty() {
                continue; // extra header level
            }
            return Err(DataError::Validation(format!(
                "{}: line {}: unparseable timestamp '{first}'",
                path.display(),
                line + 2
            )));
        };

        let mut values = Vec::with_capacity(slots.len());
        for (pos, name) in &slots {
            let cell = record.get(*pos).unwrap_or_default();
            values.push(parse_value(cell).ok_or_else(|| {
                DataError::Validation(format!(
                    "{}: line {}: bad value '{cell}' in column '{name}'",
                    path.display(),
                    line + 2
                ))
            })?);
        }
        rows.push((timestamp, values));
    }

    // Canonicalize: sort by timestamp, keep the first of any duplicates.
    rows.sort_by_key(|(ts, _)| *ts);
    rows.dedup_by_key(|(ts, _)| *ts);

    Ok(ParsedCsv {
        names: slots.into_iter().map(|(_, n)| n).collect(),
        rows,
    })
}

/// Base OHLCV names are matched case-insensitively; others pass through.
fn canonical_name(cell: &str) -> String {
    let cell = cell.trim();
    names::OHLCV
        .iter()
        .find(|n| n.eq_ignore_ascii_case(cell))
        .map(|n| n.to_string())
        .unwrap_or_else(|| cell.to_string())
}

/// Empty cells are undefined; anything else must parse as a number.
fn parse_value(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") || cell.eq_ignore_ascii_case("null") {
        return Some(f64::NAN);
    }
    cell.parse().ok()
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` (or `T`-separated), and the
/// same with a UTC offset, which is converted to UTC.
pub(crate) fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    let cell = cell.trim();
    if let Ok(date) = NaiveDate::parse_from_str(cell, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(cell, fmt) {
            return Some(ts);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%dT%H:%M:%S%:z"] {
        if let Ok(ts) = DateTime::parse_from_str(cell, fmt) {
            return Some(ts.naive_utc());
        }
    }
    DateTime::parse_from_rfc3339(cell).ok().map(|ts| ts.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{Frequency, HistoryRange};
    use std::fs;

    fn options(range: HistoryRange) -> DownloadOptions {
        DownloadOptions {
            interval: Frequency::DAILY,
            range,
        }
    }

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn reads_flat_csv() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "SPY.csv",
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-03,101,103,100,102,1100\n\
             2024-01-02,100,102,99,101,1000\n",
        );

        let table = CsvProvider::new(dir.path())
            .download("SPY", &options(HistoryRange::Max))
            .unwrap();

        assert_eq!(table.height(), 2);
        // sorted ascending
        assert_eq!(table.column("Close").unwrap(), &[101.0, 102.0]);
        let cols: Vec<&str> = table.column_names().collect();
        assert_eq!(cols, vec!["Open", "High", "Low", "Close", "Volume"]);
    }

    #[test]
    fn multi_level_header_keeps_top_level() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "AAPL_1d.csv",
            "Price,Close,High,Low,Open,Volume\n\
             Ticker,AAPL,AAPL,AAPL,AAPL,AAPL\n\
             Date,,,,,\n\
             2024-01-02 00:00:00+00:00,185.6,188.4,183.9,187.2,82488700\n\
             2024-01-03 00:00:00+00:00,184.2,185.9,183.4,184.2,58414500\n",
        );

        let table = CsvProvider::new(dir.path())
            .download("AAPL", &options(HistoryRange::Max))
            .unwrap();

        assert_eq!(table.height(), 2);
        assert_eq!(table.column("Open").unwrap()[0], 187.2);
        assert_eq!(table.column("Volume").unwrap()[1], 58414500.0);
    }

    #[test]
    fn range_filter_and_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "QQQ.csv",
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-02,1,1,1,1,1\n\
             2024-01-03,2,2,2,2,2\n\
             2024-01-04,3,3,3,3,3\n",
        );
        let provider = CsvProvider::new(dir.path());
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();

        let table = provider
            .download(
                "QQQ",
                &options(HistoryRange::from_bounds(Some(d("2024-01-03")), None)),
            )
            .unwrap();
        assert_eq!(table.column("Close").unwrap(), &[2.0, 3.0]);

        let err = provider
            .download(
                "QQQ",
                &options(HistoryRange::from_bounds(Some(d("2025-01-01")), None)),
            )
            .unwrap_err();
        assert!(matches!(err, DataError::EmptyHistory { .. }));
    }

    #[test]
    fn missing_file_and_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvProvider::new(dir.path());
        assert!(matches!(
            provider.download("NOPE", &options(HistoryRange::Max)),
            Err(DataError::SymbolNotFound { .. })
        ));

        write(dir.path(), "BAD.csv", "Date,Open,Close\n2024-01-02,1,1\n");
        assert!(matches!(
            provider.download("BAD", &options(HistoryRange::Max)),
            Err(DataError::Validation(_))
        ));
    }

    #[test]
    fn empty_cells_are_undefined_and_garbage_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "GAP.csv",
            "Date,Open,High,Low,Close,Volume\n2024-01-02,1,1,1,,1\n",
        );
        let table = CsvProvider::new(dir.path())
            .download("GAP", &options(HistoryRange::Max))
            .unwrap();
        assert!(table.column("Close").unwrap()[0].is_nan());

        write(
            dir.path(),
            "JUNK.csv",
            "Date,Open,High,Low,Close,Volume\n2024-01-02,1,1,1,abc,1\n",
        );
        assert!(CsvProvider::new(dir.path())
            .download("JUNK", &options(HistoryRange::Max))
            .is_err());
    }

    #[test]
    fn timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-01-02"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02 00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02 00:00:00+00:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-01-02 09:30:00-05:00"),
            expected.date().and_hms_opt(14, 30, 0)
        );
        assert_eq!(parse_timestamp("Date"), None);
        assert_eq!(parse_timestamp("Ticker"), None);
    }
}
