//! Benchmark alignment.
//!
//! Left-joins benchmark-derived columns onto an asset table by timestamp.
//! Every asset row survives; asset timestamps the benchmark lacks get NaN in
//! the joined columns (filled or dropped later by cleaning). Benchmark rows
//! at timestamps the asset lacks are discarded.

use crate::error::Result;
use crate::table::FeatureTable;
use std::cmp::Ordering;

/// Left-join every benchmark column whose name starts with `prefix`.
///
/// Benchmark columns without the prefix (its raw OHLCV) are not exposed.
/// A joined column replaces an asset column of the same name.
pub fn merge_prefixed(
    mut asset: FeatureTable,
    benchmark: &FeatureTable,
    prefix: &str,
) -> Result<FeatureTable> {
    let rows = row_map(asset.index(), benchmark);

    for (name, values) in benchmark.columns() {
        if !name.starts_with(prefix) {
            continue;
        }
        let joined = rows
            .iter()
            .map(|row| row.map_or(f64::NAN, |j| values[j]))
            .collect();
        asset.insert_column(name, joined)?;
    }

    Ok(asset)
}

/// For each asset timestamp, the benchmark row with the same timestamp.
///
/// Both indexes are strictly increasing, so a single merge walk suffices.
fn row_map(
    asset_index: &[chrono::NaiveDateTime],
    benchmark: &FeatureTable,
) -> Vec<Option<usize>> {
    let bench_index = benchmark.index();
    let mut rows = Vec::with_capacity(asset_index.len());
    let mut j = 0;

    for ts in asset_index {
        while j < bench_index.len() && bench_index[j] < *ts {
            j += 1;
        }
        match bench_index.get(j).map(|b| b.cmp(ts)) {
            Some(Ordering::Equal) => rows.push(Some(j)),
            _ => rows.push(None),
        }
    }

    rows
}
