//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over data sources (CSV directories,
//! synthetic series, in-memory stubs) so the loader can be pointed at any of
//! them and mocked in tests. Network providers live outside this crate and
//! plug in through the same trait.

use crate::table::FeatureTable;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raw OHLCV bar from a data provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Structured error types for data operations.
///
/// These are designed to be displayable in CLI contexts.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no history for '{symbol}' in the requested range")]
    EmptyHistory { symbol: String },

    #[error("unsupported frequency code '{0}'")]
    UnsupportedFrequency(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Sampling interval of a series, written as a provider frequency code
/// (`1m`, `5m`, `1h`, `1d`, `5d`, `1wk`, `1mo`, `3mo`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Frequency {
    Minutes(u32),
    Hours(u32),
    Days(u32),
    Weeks(u32),
    Months(u32),
}

impl Frequency {
    pub const DAILY: Frequency = Frequency::Days(1);

    /// Nominal distance between consecutive bars. Months count as 30 days.
    pub fn step(self) -> Duration {
        match self {
            Self::Minutes(n) => Duration::minutes(n as i64),
            Self::Hours(n) => Duration::hours(n as i64),
            Self::Days(n) => Duration::days(n as i64),
            Self::Weeks(n) => Duration::weeks(n as i64),
            Self::Months(n) => Duration::days(30 * n as i64),
        }
    }

    /// True for frequencies finer than one day.
    pub fn is_intraday(self) -> bool {
        matches!(self, Self::Minutes(_) | Self::Hours(_))
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Self::DAILY
    }
}

impl FromStr for Frequency {
    type Err = DataError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let code = code.trim();
        let split = code
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| DataError::UnsupportedFrequency(code.to_string()))?;
        let (count, unit) = code.split_at(split);
        let count: u32 = count
            .parse()
            .map_err(|_| DataError::UnsupportedFrequency(code.to_string()))?;
        if count == 0 {
            return Err(DataError::UnsupportedFrequency(code.to_string()));
        }
        match unit {
            "m" => Ok(Self::Minutes(count)),
            "h" => Ok(Self::Hours(count)),
            "d" => Ok(Self::Days(count)),
            "wk" => Ok(Self::Weeks(count)),
            "mo" => Ok(Self::Months(count)),
            _ => Err(DataError::UnsupportedFrequency(code.to_string())),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minutes(n) => write!(f, "{n}m"),
            Self::Hours(n) => write!(f, "{n}h"),
            Self::Days(n) => write!(f, "{n}d"),
            Self::Weeks(n) => write!(f, "{n}wk"),
            Self::Months(n) => write!(f, "{n}mo"),
        }
    }
}

impl TryFrom<String> for Frequency {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(value: Frequency) -> Self {
        value.to_string()
    }
}

/// Which slice of history to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryRange {
    /// Everything the provider has.
    Max,
    /// Inclusive bounds; a missing bound is open.
    Between {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl HistoryRange {
    /// `Max` when neither bound is given, otherwise `Between`.
    pub fn from_bounds(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        if start.is_none() && end.is_none() {
            Self::Max
        } else {
            Self::Between { start, end }
        }
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        match self {
            Self::Max => true,
            Self::Between { start, end } => {
                let date = timestamp.date();
                start.map_or(true, |s| date >= s) && end.map_or(true, |e| date <= e)
            }
        }
    }
}

/// Options passed to every `download` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOptions {
    pub interval: Frequency,
    pub range: HistoryRange,
}

/// Trait for data providers.
///
/// A provider returns a time-indexed table with at least the columns
/// Open/High/Low/Close/Volume. Hierarchical column headers are flattened to
/// their top level before the table is returned.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the OHLCV history of one symbol.
    fn download(&self, symbol: &str, options: &DownloadOptions) -> Result<FeatureTable, DataError>;
}

impl<P: DataProvider + ?Sized> DataProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn download(&self, symbol: &str, options: &DownloadOptions) -> Result<FeatureTable, DataError> {
        (**self).download(symbol, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_codes_roundtrip() {
        for code in ["1m", "15m", "1h", "1d", "5d", "1wk", "1mo", "3mo"] {
            let freq: Frequency = code.parse().unwrap();
            assert_eq!(freq.to_string(), code);
        }
        assert_eq!("1d".parse::<Frequency>().unwrap(), Frequency::DAILY);
        assert!(Frequency::Hours(1).is_intraday());
        assert!(!Frequency::Weeks(1).is_intraday());
    }

    #[test]
    fn frequency_rejects_garbage() {
        for code in ["", "d", "0d", "1y", "abc", "1"] {
            assert!(code.parse::<Frequency>().is_err(), "accepted '{code}'");
        }
    }

    #[test]
    fn history_range_bounds() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        assert_eq!(HistoryRange::from_bounds(None, None), HistoryRange::Max);

        let range = HistoryRange::from_bounds(Some(d("2024-01-02")), Some(d("2024-01-05")));
        let at = |s: &str| d(s).and_hms_opt(15, 30, 0).unwrap();
        assert!(!range.contains(at("2024-01-01")));
        assert!(range.contains(at("2024-01-02")));
        assert!(range.contains(at("2024-01-05")));
        assert!(!range.contains(at("2024-01-06")));

        let open_end = HistoryRange::from_bounds(Some(d("2024-01-02")), None);
        assert!(open_end.contains(at("2030-01-01")));
    }
}
