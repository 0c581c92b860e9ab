//! FeatureTable: the time-indexed numeric table every stage consumes.
//!
//! Rows are keyed by strictly increasing timestamps. Columns are named `f64`
//! series of the same length as the index, kept in insertion order.
//! Undefined cells are `f64::NAN`.
//!
//! `Clone` is a deep copy: a cloned table shares no storage with the
//! original, so a stage writing to the copy never aliases the caller's data.

use crate::data::provider::RawBar;
use crate::error::{FeatureError, Result};
use crate::names;
use chrono::NaiveDateTime;

#[derive(Debug, Clone)]
struct Column {
    name: String,
    values: Vec<f64>,
}

/// A time-indexed table of named numeric columns.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    index: Vec<NaiveDateTime>,
    columns: Vec<Column>,
}

impl FeatureTable {
    /// Create a table with the given index and no columns.
    ///
    /// Fails with `UnorderedIndex` unless timestamps are strictly increasing.
    pub fn new(index: Vec<NaiveDateTime>) -> Result<Self> {
        for (row, pair) in index.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(FeatureError::UnorderedIndex {
                    row: row + 1,
                    timestamp: pair[1],
                });
            }
        }
        Ok(Self {
            index,
            columns: Vec::new(),
        })
    }

    /// Create a table from an index and named columns, in order.
    pub fn from_columns<N: Into<String>>(
        index: Vec<NaiveDateTime>,
        columns: impl IntoIterator<Item = (N, Vec<f64>)>,
    ) -> Result<Self> {
        let mut table = Self::new(index)?;
        for (name, values) in columns {
            let name = name.into();
            if table.has_column(&name) {
                return Err(FeatureError::DuplicateColumn(name));
            }
            table.insert_column(name, values)?;
        }
        Ok(table)
    }

    /// Build an OHLCV table from provider bars.
    pub fn from_bars(bars: &[RawBar]) -> Result<Self> {
        let index = bars.iter().map(|b| b.timestamp).collect();
        Self::from_columns(
            index,
            [
                (names::OPEN, bars.iter().map(|b| b.open).collect()),
                (names::HIGH, bars.iter().map(|b| b.high).collect()),
                (names::LOW, bars.iter().map(|b| b.low).collect()),
                (names::CLOSE, bars.iter().map(|b| b.close).collect()),
                (names::VOLUME, bars.iter().map(|b| b.volume).collect()),
            ],
        )
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.index.len()
    }

    /// Number of columns (the index is not a column).
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Iterate over `(name, values)` pairs in column order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.values.as_slice()))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Borrow a column, failing with `MissingColumn` if absent.
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.position(name)
            .map(|i| self.columns[i].values.as_slice())
            .ok_or_else(|| FeatureError::missing(name))
    }

    /// Fail with `MissingColumn` for the first name not present.
    pub fn require(&self, names: &[&str]) -> Result<()> {
        match names.iter().find(|n| !self.has_column(n)) {
            Some(missing) => Err(FeatureError::missing(*missing)),
            None => Ok(()),
        }
    }

    /// Insert a column, replacing an existing one of the same name in place.
    ///
    /// New columns are appended after the existing ones.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.height() {
            return Err(FeatureError::LengthMismatch {
                column: name,
                expected: self.height(),
                actual: values.len(),
            });
        }
        match self.position(&name) {
            Some(i) => self.columns[i].values = values,
            None => self.columns.push(Column { name, values }),
        }
        Ok(())
    }

    /// Keep only the rows where `mask` is true. Returns the number removed.
    pub fn retain_rows(&mut self, mask: &[bool]) -> Result<usize> {
        if mask.len() != self.height() {
            return Err(FeatureError::LengthMismatch {
                column: "<row mask>".into(),
                expected: self.height(),
                actual: mask.len(),
            });
        }
        let before = self.height();
        self.index = keep_masked(&self.index, mask);
        for column in &mut self.columns {
            column.values = keep_masked(&column.values, mask);
        }
        Ok(before - self.height())
    }

    /// A deep copy of the first `rows` rows.
    pub fn head(&self, rows: usize) -> Self {
        let rows = rows.min(self.height());
        Self {
            index: self.index[..rows].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: c.values[..rows].to_vec(),
                })
                .collect(),
        }
    }

    /// Mutable access to every column's values, for whole-table cleaning.
    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut Vec<f64>> {
        self.columns.iter_mut().map(|c| &mut c.values)
    }

    /// Number of NaN cells across all columns.
    pub fn count_undefined(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.values.iter().filter(|v| v.is_nan()).count())
            .sum()
    }

    /// True when every cell is finite.
    pub fn is_clean(&self) -> bool {
        self.columns
            .iter()
            .all(|c| c.values.iter().all(|v| v.is_finite()))
    }

    /// Deterministic BLAKE3 fingerprint over index, column names and values.
    ///
    /// Values are hashed by bit pattern, so two tables with equal fingerprints
    /// are byte-identical (NaN payloads included).
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.height() as u64).to_le_bytes());
        for ts in &self.index {
            hasher.update(&ts.and_utc().timestamp_millis().to_le_bytes());
        }
        for column in &self.columns {
            hasher.update(column.name.as_bytes());
            hasher.update(&[0]);
            for v in &column.values {
                hasher.update(&v.to_bits().to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

fn keep_masked<T: Copy>(values: &[T], mask: &[bool]) -> Vec<T> {
    values
        .iter()
        .zip(mask)
        .filter_map(|(v, keep)| keep.then_some(*v))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn rejects_duplicate_and_unordered_timestamps() {
        let mut index = daily_index(3);
        index[2] = index[1];
        assert!(matches!(
            FeatureTable::new(index),
            Err(FeatureError::UnorderedIndex { row: 2, .. })
        ));

        let mut index = daily_index(3);
        index.swap(0, 2);
        assert!(FeatureTable::new(index).is_err());
    }

    #[test]
    fn insert_rejects_length_mismatch() {
        let mut table = close_table(&[1.0, 2.0, 3.0]);
        let err = table.insert_column("x", vec![1.0]).unwrap_err();
        assert!(matches!(
            err,
            FeatureError::LengthMismatch {
                expected: 3,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn replacing_a_column_keeps_its_position() {
        let mut table = close_table(&[1.0, 2.0]);
        table.insert_column("a", vec![0.0, 0.0]).unwrap();
        table.insert_column(names::CLOSE, vec![5.0, 6.0]).unwrap();
        let order: Vec<&str> = table.column_names().collect();
        assert_eq!(order, vec!["Close", "a"]);
        assert_eq!(table.column("Close").unwrap(), &[5.0, 6.0]);
    }

    #[test]
    fn missing_column_is_named() {
        let table = close_table(&[1.0]);
        match table.column("Volume") {
            Err(FeatureError::MissingColumn { column }) => assert_eq!(column, "Volume"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
        assert!(table.require(&["Close", "Volume"]).is_err());
        assert!(table.require(&["Close"]).is_ok());
    }

    #[test]
    fn from_columns_rejects_duplicate_names() {
        let result = FeatureTable::from_columns(
            daily_index(1),
            [("a", vec![1.0]), ("a", vec![2.0])],
        );
        assert!(matches!(result, Err(FeatureError::DuplicateColumn(_))));
    }

    #[test]
    fn retain_rows_filters_index_and_columns() {
        let mut table = close_table(&[1.0, 2.0, 3.0]);
        let removed = table.retain_rows(&[true, false, true]).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(table.height(), 2);
        assert_eq!(table.column("Close").unwrap(), &[1.0, 3.0]);
        assert_eq!(table.index()[1], daily_index(3)[2]);
    }

    #[test]
    fn clone_is_deep() {
        let original = close_table(&[1.0, 2.0]);
        let mut copy = original.clone();
        copy.insert_column(names::CLOSE, vec![9.0, 9.0]).unwrap();
        assert_eq!(original.column("Close").unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = close_table(&[1.0, 2.0]);
        let b = close_table(&[1.0, 2.0]);
        let c = close_table(&[1.0, 2.5]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn clean_detection() {
        let mut table = close_table(&[1.0, f64::NAN]);
        assert!(!table.is_clean());
        assert_eq!(table.count_undefined(), 1);
        table.insert_column("Close", vec![1.0, f64::INFINITY]).unwrap();
        assert!(!table.is_clean());
        assert_eq!(table.count_undefined(), 0);
    }
}
