//! Table export: CSV and Parquet.
//!
//! Both writers are atomic: they write `{path}.tmp` and rename it into place,
//! so a failed export never leaves a truncated file behind.

use crate::error::{FeatureError, Result};
use crate::table::FeatureTable;
use chrono::{NaiveDateTime, Timelike};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the timestamp column in exported DataFrames.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

fn export_err(context: &str) -> impl Fn(PolarsError) -> FeatureError + '_ {
    move |e| FeatureError::Export(format!("{context}: {e}"))
}

/// Convert a table into a polars DataFrame.
///
/// The index becomes a leading `timestamp` column of type `Datetime(ms)`;
/// every value column follows in table order as `Float64`.
pub fn to_dataframe(table: &FeatureTable) -> Result<DataFrame> {
    let millis: Vec<i64> = table
        .index()
        .iter()
        .map(|ts| ts.and_utc().timestamp_millis())
        .collect();

    let mut columns = Vec::with_capacity(table.width() + 1);
    columns.push(
        Column::new(TIMESTAMP_COLUMN.into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(export_err("timestamp cast"))?,
    );
    for (name, values) in table.columns() {
        columns.push(Column::new(name.into(), values.to_vec()));
    }

    DataFrame::new(columns).map_err(export_err("dataframe creation"))
}

/// Write a table to a Parquet file.
pub fn write_parquet(table: &FeatureTable, path: &Path) -> Result<()> {
    let mut df = to_dataframe(table)?;
    atomic_write(path, |tmp| {
        let file = fs::File::create(tmp)
            .map_err(|e| FeatureError::Export(format!("create {}: {e}", tmp.display())))?;
        ParquetWriter::new(file)
            .finish(&mut df)
            .map_err(export_err("write parquet"))?;
        Ok(())
    })
}

/// Read a table written by [`write_parquet`].
pub fn read_parquet(path: &Path) -> Result<FeatureTable> {
    let file = fs::File::open(path)
        .map_err(|e| FeatureError::Export(format!("open {}: {e}", path.display())))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(export_err("read parquet"))?;

    let stamps = df
        .column(TIMESTAMP_COLUMN)
        .map_err(export_err("timestamp column"))?
        .cast(&DataType::Int64)
        .map_err(export_err("timestamp cast"))?;
    let index = stamps
        .i64()
        .map_err(export_err("timestamp column type"))?
        .into_iter()
        .map(|ms| {
            ms.and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| FeatureError::Export("null or out-of-range timestamp".into()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut table = FeatureTable::new(index)?;
    for column in df.get_columns() {
        if column.name().as_str() == TIMESTAMP_COLUMN {
            continue;
        }
        let values = column
            .cast(&DataType::Float64)
            .map_err(export_err("value cast"))?
            .f64()
            .map_err(export_err("value column type"))?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        table.insert_column(column.name().as_str(), values)?;
    }
    Ok(table)
}

/// Write a table to a CSV file.
///
/// The first column is `Date` (`%Y-%m-%d`) when every timestamp falls on
/// midnight, otherwise `Datetime` (`%Y-%m-%d %H:%M:%S`). Either reads back
/// through the CSV provider.
pub fn write_csv(table: &FeatureTable, path: &Path) -> Result<()> {
    let daily = table.index().iter().all(is_midnight);
    let (header, format) = if daily {
        ("Date", "%Y-%m-%d")
    } else {
        ("Datetime", "%Y-%m-%d %H:%M:%S")
    };

    atomic_write(path, |tmp| {
        let csv_err = |e: csv::Error| FeatureError::Export(format!("write csv: {e}"));
        let mut writer = csv::Writer::from_path(tmp).map_err(csv_err)?;

        let mut record = vec![header.to_string()];
        record.extend(table.column_names().map(str::to_string));
        writer.write_record(&record).map_err(csv_err)?;

        let columns: Vec<&[f64]> = table.columns().map(|(_, values)| values).collect();
        for (row, ts) in table.index().iter().enumerate() {
            record.clear();
            record.push(ts.format(format).to_string());
            record.extend(columns.iter().map(|values| format_value(values[row])));
            writer.write_record(&record).map_err(csv_err)?;
        }

        writer
            .flush()
            .map_err(|e| FeatureError::Export(format!("flush csv: {e}")))
    })
}

/// Write a table, picking the format from the file extension.
pub fn write_table(table: &FeatureTable, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => write_csv(table, path),
        Some("parquet") => write_parquet(table, path),
        other => Err(FeatureError::Export(format!(
            "unsupported output extension {:?} (expected .csv or .parquet)",
            other.unwrap_or("")
        ))),
    }
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn is_midnight(ts: &NaiveDateTime) -> bool {
    ts.num_seconds_from_midnight() == 0 && ts.nanosecond() == 0
}

fn atomic_write(path: &Path, write: impl FnOnce(&Path) -> Result<()>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| FeatureError::Export(format!("create {}: {e}", parent.display())))?;
    }
    let tmp = tmp_path(path);
    if let Err(e) = write(&tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        FeatureError::Export(format!("atomic rename failed: {e}"))
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::csv_provider::CsvProvider;
    use crate::data::provider::{DataProvider, DownloadOptions, Frequency, HistoryRange};
    use crate::names;
    use crate::table::test_support::daily_index;

    fn ohlcv(n: usize) -> FeatureTable {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        FeatureTable::from_columns(
            daily_index(n),
            [
                (names::OPEN, closes.clone()),
                (names::HIGH, closes.iter().map(|c| c + 1.0).collect()),
                (names::LOW, closes.iter().map(|c| c - 1.0).collect()),
                (names::CLOSE, closes.clone()),
                (names::VOLUME, vec![1_000.0; n]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn dataframe_has_timestamp_then_columns() {
        let df = to_dataframe(&ohlcv(3)).unwrap();
        let names: Vec<&str> = df.get_column_names().into_iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["timestamp", "Open", "High", "Low", "Close", "Volume"]);
        assert_eq!(df.height(), 3);
        assert!(matches!(
            df.column("timestamp").unwrap().dtype(),
            DataType::Datetime(TimeUnit::Milliseconds, _)
        ));
    }

    #[test]
    fn parquet_roundtrip_preserves_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/table.parquet");
        let table = ohlcv(5);

        write_table(&table, &path).unwrap();
        assert!(!tmp_path(&path).exists());

        let back = read_parquet(&path).unwrap();
        assert_eq!(back.fingerprint(), table.fingerprint());
    }

    #[test]
    fn csv_reads_back_through_provider() {
        let dir = tempfile::tempdir().unwrap();
        let table = ohlcv(4);
        write_table(&table, &dir.path().join("TEST.csv")).unwrap();

        let provider = CsvProvider::new(dir.path());
        let options = DownloadOptions {
            interval: Frequency::DAILY,
            range: HistoryRange::Max,
        };
        let back = provider.download("TEST", &options).unwrap();
        assert_eq!(back.index(), table.index());
        assert_eq!(back.column("Close").unwrap(), table.column("Close").unwrap());
    }

    #[test]
    fn intraday_csv_uses_datetime_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intraday.csv");
        let index: Vec<NaiveDateTime> = daily_index(2)
            .into_iter()
            .map(|ts| ts + chrono::Duration::minutes(90))
            .collect();
        let table = FeatureTable::from_columns(index, [("x", vec![1.0, f64::NAN])]).unwrap();

        write_csv(&table, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Datetime,x");
        assert_eq!(lines[1], "2024-01-02 01:30:00,1");
        assert_eq!(lines[2], "2024-01-03 01:30:00,");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_table(&ohlcv(1), &dir.path().join("table.xlsx"));
        assert!(matches!(result, Err(FeatureError::Export(_))));
    }
}
