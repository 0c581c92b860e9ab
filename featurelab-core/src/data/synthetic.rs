//! Synthetic data provider.
//!
//! Produces a seeded random walk from a starting price of 100.0. The seed is
//! the BLAKE3 hash of the symbol, so the same symbol and range always yield
//! the same table. Daily-or-coarser series skip weekends.
//!
//! There is no notion of "today": an open range is anchored at a fixed date
//! and extended by `default_bars` steps so results never depend on the clock.

use super::provider::{DataError, DataProvider, DownloadOptions, Frequency, HistoryRange, RawBar};
use crate::table::FeatureTable;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic random-walk provider for demos and tests.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    anchor: NaiveDate,
    default_bars: usize,
}

impl SyntheticProvider {
    pub fn new() -> Self {
        Self {
            anchor: NaiveDate::from_ymd_opt(2020, 1, 2).unwrap_or_default(),
            default_bars: 750,
        }
    }

    /// Number of bars generated when a range bound is open.
    pub fn with_default_bars(mut self, bars: usize) -> Self {
        self.default_bars = bars;
        self
    }

    /// First bar of an open-start range.
    pub fn with_anchor(mut self, anchor: NaiveDate) -> Self {
        self.anchor = anchor;
        self
    }

    /// Generate the bars for a symbol.
    pub fn bars(&self, symbol: &str, options: &DownloadOptions) -> Vec<RawBar> {
        let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);
        let step = options.interval.step();
        let skip_weekends = !options.interval.is_intraday() && options.interval == Frequency::DAILY;

        let (start, end) = match options.range {
            HistoryRange::Max => (self.anchor, None),
            HistoryRange::Between { start, end } => match (start, end) {
                (Some(s), e) => (s, e),
                (None, Some(e)) => (self.backfill_start(e, options.interval), Some(e)),
                (None, None) => (self.anchor, None),
            },
        };

        let mut bars = Vec::new();
        let mut price = 100.0_f64;
        let mut current: NaiveDateTime = start.and_hms_opt(0, 0, 0).unwrap_or_default();

        loop {
            match end {
                Some(e) if current.date() > e => break,
                None if bars.len() >= self.default_bars => break,
                _ => {}
            }
            if skip_weekends && is_weekend(current.date()) {
                current += step;
                continue;
            }

            let bar_return: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + bar_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(500_000..5_000_000u64) as f64;

            bars.push(RawBar {
                timestamp: current,
                open,
                high,
                low,
                close,
                volume,
            });

            price = close;
            current += step;
        }

        bars
    }

    /// Start date that leaves roughly `default_bars` bars before `end`.
    fn backfill_start(&self, end: NaiveDate, interval: Frequency) -> NaiveDate {
        let mut span = interval.step() * self.default_bars as i32;
        if interval == Frequency::DAILY {
            // Weekends eat two of every seven days.
            span = span * 7 / 5;
        }
        (end.and_hms_opt(0, 0, 0).unwrap_or_default() - span).date()
    }
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn download(&self, symbol: &str, options: &DownloadOptions) -> Result<FeatureTable, DataError> {
        let bars = self.bars(symbol, options);
        if bars.is_empty() {
            return Err(DataError::EmptyHistory {
                symbol: symbol.to_string(),
            });
        }
        tracing::debug!(symbol, bars = bars.len(), "generated synthetic history");
        FeatureTable::from_bars(&bars).map_err(|e| DataError::Other(e.to_string()))
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
