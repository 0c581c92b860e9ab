//! Loader: fetch → derive → merge → clean.
//!
//! One pass, no retries. Provider failures propagate unchanged (wrapped in
//! `FeatureError::Provider`). Features come straight from series math, not
//! from indicator stages; stages are applied afterwards by the caller or the
//! pipeline.

use crate::clean::{self, BoundaryFill, CleanReport};
use crate::data::align::merge_prefixed;
use crate::data::provider::{DataProvider, DownloadOptions, Frequency, HistoryRange};
use crate::error::{FeatureError, Result};
use crate::horizon::HorizonSet;
use crate::names;
use crate::series;
use crate::table::FeatureTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What to load and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub symbol: String,
    /// Benchmark symbol; the asset itself when absent.
    #[serde(default)]
    pub benchmark: Option<String>,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub interval: Frequency,
    #[serde(default)]
    pub horizons: HorizonSet,
    #[serde(default)]
    pub boundary: BoundaryFill,
    /// Fetch asset and benchmark on two threads.
    #[serde(default = "default_concurrent_fetch")]
    pub concurrent_fetch: bool,
}

fn default_concurrent_fetch() -> bool {
    true
}

impl LoaderConfig {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            benchmark: None,
            start: None,
            end: None,
            interval: Frequency::default(),
            horizons: HorizonSet::default(),
            boundary: BoundaryFill::default(),
            concurrent_fetch: default_concurrent_fetch(),
        }
    }

    pub fn benchmark_symbol(&self) -> &str {
        self.benchmark.as_deref().unwrap_or(&self.symbol)
    }

    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            interval: self.interval,
            range: HistoryRange::from_bounds(self.start, self.end),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(FeatureError::Config("symbol must not be empty".into()));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(FeatureError::Config(format!(
                    "start {start} is after end {end}"
                )));
            }
        }
        Ok(())
    }
}

/// Summary of one load, for logs and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub provider: String,
    pub symbol: String,
    pub benchmark: String,
    pub asset_rows: usize,
    pub benchmark_rows: usize,
    pub clean: CleanReport,
    pub columns: usize,
    pub fingerprint: String,
}

/// Builds the cleaned, aligned feature table for one asset.
pub struct Loader<'a> {
    provider: &'a dyn DataProvider,
    config: LoaderConfig,
}

impl<'a> Loader<'a> {
    pub fn new(provider: &'a dyn DataProvider, config: LoaderConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Fetch the asset and benchmark tables.
    ///
    /// A benchmark equal to the asset is fetched once and copied.
    pub fn fetch(&self) -> Result<(FeatureTable, FeatureTable)> {
        let options = self.config.download_options();
        let symbol = self.config.symbol.as_str();
        let benchmark = self.config.benchmark_symbol();

        if benchmark == symbol {
            let asset = self.provider.download(symbol, &options)?;
            let bench = asset.clone();
            return Ok((asset, bench));
        }

        let (asset, bench) = if self.config.concurrent_fetch {
            rayon::join(
                || self.provider.download(symbol, &options),
                || self.provider.download(benchmark, &options),
            )
        } else {
            (
                self.provider.download(symbol, &options),
                self.provider.download(benchmark, &options),
            )
        };
        Ok((asset?, bench?))
    }

    /// Load the feature table.
    pub fn load(&self) -> Result<FeatureTable> {
        self.load_with_report().map(|(table, _)| table)
    }

    /// Load the feature table and report what happened along the way.
    pub fn load_with_report(&self) -> Result<(FeatureTable, LoadReport)> {
        self.config.validate()?;
        tracing::info!(
            provider = self.provider.name(),
            symbol = %self.config.symbol,
            benchmark = self.config.benchmark_symbol(),
            interval = %self.config.interval,
            "loading features"
        );

        let (asset, bench) = self.fetch()?;
        let (asset_rows, benchmark_rows) = (asset.height(), bench.height());
        tracing::debug!(asset_rows, benchmark_rows, "fetched history");

        let (table, clean) =
            build_features(asset, bench, &self.config.horizons, self.config.boundary)?;

        let report = LoadReport {
            provider: self.provider.name().to_string(),
            symbol: self.config.symbol.clone(),
            benchmark: self.config.benchmark_symbol().to_string(),
            asset_rows,
            benchmark_rows,
            clean,
            columns: table.width(),
            fingerprint: table.fingerprint(),
        };
        tracing::info!(
            rows = table.height(),
            columns = report.columns,
            fingerprint = %report.fingerprint,
            "features ready"
        );
        Ok((table, report))
    }
}

/// Add `forward_return[i] = Close[i+1] / Close[i] - 1`; the last row is NaN.
pub fn derive_target(table: &mut FeatureTable) -> Result<()> {
    let returns = series::percent_change(table.column(names::CLOSE)?, 1)?;
    table.insert_column(names::FORWARD_RETURN, series::lead(&returns, 1))
}

/// Add `{prefix}return_h` and `{prefix}volume_h` for every horizon.
///
/// Only trailing data is used: row i depends on rows i - h ..= i.
pub fn derive_features(table: &mut FeatureTable, horizons: &HorizonSet, prefix: &str) -> Result<()> {
    table.require(&[names::CLOSE, names::VOLUME])?;
    for h in horizons.iter() {
        let returns = series::percent_change(table.column(names::CLOSE)?, h)?;
        let volumes = series::percent_change(table.column(names::VOLUME)?, h)?;
        table.insert_column(names::return_h(prefix, h), returns)?;
        table.insert_column(names::volume_h(prefix, h), volumes)?;
    }
    Ok(())
}

/// Rows cleaning is expected to drop from aligned, gap-free inputs.
///
/// Under `Drop` that is the longest horizon's warm-up plus the trailing row
/// whose `forward_return` is undefined; `Extend` fills both.
pub fn expected_dropped_rows(horizons: &HorizonSet, boundary: BoundaryFill) -> usize {
    match boundary {
        BoundaryFill::Drop => horizons.max() + 1,
        BoundaryFill::Extend => 0,
    }
}

/// Derive, merge and clean already-fetched tables.
///
/// Fails with `MissingColumn` when either table lacks `Close` or `Volume`
/// and with `EmptyResult` when cleaning removes every row.
pub fn build_features(
    mut asset: FeatureTable,
    mut benchmark: FeatureTable,
    horizons: &HorizonSet,
    boundary: BoundaryFill,
) -> Result<(FeatureTable, CleanReport)> {
    asset.require(&[names::CLOSE, names::VOLUME])?;
    benchmark.require(&[names::CLOSE, names::VOLUME])?;

    derive_target(&mut asset)?;
    derive_features(&mut asset, horizons, "")?;
    derive_features(&mut benchmark, horizons, names::BENCHMARK_PREFIX)?;

    let mut table = merge_prefixed(asset, &benchmark, names::BENCHMARK_PREFIX)?;
    let report = clean::clean(&mut table, boundary);

    if report.infinities_replaced > 0 {
        tracing::warn!(
            cells = report.infinities_replaced,
            "replaced infinite values (zero prices or volumes)"
        );
    }
    let expected = expected_dropped_rows(horizons, boundary);
    if report.rows_dropped > expected {
        tracing::warn!(
            dropped = report.rows_dropped,
            expected,
            "cleaning dropped rows beyond the warm-up (unaligned or undefined inputs)"
        );
    } else {
        tracing::debug!(
            interpolated = report.cells_interpolated,
            dropped = report.rows_dropped,
            "cleaned feature table"
        );
    }

    if table.is_empty() {
        return Err(FeatureError::EmptyResult {
            reason: format!(
                "all {} rows were dropped while cleaning (longest horizon {})",
                report.rows_in,
                horizons.max()
            ),
        });
    }
    Ok((table, report))
}
