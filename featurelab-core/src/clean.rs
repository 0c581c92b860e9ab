//! Gap filling and cleaning of a merged feature table.
//!
//! Order matters: interpolate NaN cells, then turn ±inf into NaN, then drop
//! every row that still holds a NaN. Infinities are replaced after
//! interpolation, so a gap next to an infinite value stays undefined and
//! its row is dropped.

use crate::table::FeatureTable;
use serde::{Deserialize, Serialize};

/// How leading and trailing NaN runs are treated by interpolation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryFill {
    /// Leave boundary runs undefined; their rows are dropped. Warm-up rows
    /// and the trailing target row never receive fabricated values.
    #[default]
    Drop,
    /// Extend the nearest defined value over boundary runs in both
    /// directions. The last row then carries a `forward_return` copied from
    /// the row before it, not an observed one.
    Extend,
}

/// What cleaning did to a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReport {
    pub rows_in: usize,
    pub cells_interpolated: usize,
    pub infinities_replaced: usize,
    pub rows_dropped: usize,
    pub rows_out: usize,
}

/// Linear interpolation of NaN cells, treating rows as equally spaced.
///
/// Interior gaps are filled from the defined neighbours on both sides.
/// Returns the number of cells filled. An all-NaN series is left alone.
pub fn interpolate_linear(values: &mut [f64], boundary: BoundaryFill) -> usize {
    let Some(first) = values.iter().position(|v| !v.is_nan()) else {
        return 0;
    };
    // `first` exists, so `last` does too.
    let last = values.iter().rposition(|v| !v.is_nan()).unwrap_or(first);
    let mut filled = 0;

    if boundary == BoundaryFill::Extend {
        let (head, tail) = (values[first], values[last]);
        for v in &mut values[..first] {
            *v = head;
            filled += 1;
        }
        for v in &mut values[last + 1..] {
            *v = tail;
            filled += 1;
        }
    }

    let mut left = first;
    for i in (first + 1)..=last {
        if values[i].is_nan() {
            continue;
        }
        if i - left > 1 {
            let (y0, y1) = (values[left], values[i]);
            let span = (i - left) as f64;
            for k in (left + 1)..i {
                values[k] = y0 + (y1 - y0) * ((k - left) as f64 / span);
                filled += 1;
            }
        }
        left = i;
    }

    filled
}

/// Replace ±inf with NaN. Returns the number of cells replaced.
pub fn replace_infinite(values: &mut [f64]) -> usize {
    let mut replaced = 0;
    for v in values.iter_mut().filter(|v| v.is_infinite()) {
        *v = f64::NAN;
        replaced += 1;
    }
    replaced
}

/// Interpolate, replace infinities, and drop rows with any NaN cell.
pub fn clean(table: &mut FeatureTable, boundary: BoundaryFill) -> CleanReport {
    let rows_in = table.height();
    let mut cells_interpolated = 0;
    let mut infinities_replaced = 0;

    for values in table.values_mut() {
        cells_interpolated += interpolate_linear(values, boundary);
    }
    for values in table.values_mut() {
        infinities_replaced += replace_infinite(values);
    }

    let mut keep = vec![true; rows_in];
    for (_, values) in table.columns() {
        for (row, v) in values.iter().enumerate() {
            if v.is_nan() {
                keep[row] = false;
            }
        }
    }
    // Mask length always matches the table height.
    let rows_dropped = table.retain_rows(&keep).unwrap_or(0);

    CleanReport {
        rows_in,
        cells_interpolated,
        infinities_replaced,
        rows_dropped,
        rows_out: table.height(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_support::{assert_approx, close_table, DEFAULT_EPSILON};

    const NAN: f64 = f64::NAN;

    #[test]
    fn interior_gap_is_linear() {
        let mut values = [1.0, NAN, NAN, 4.0];
        let filled = interpolate_linear(&mut values, BoundaryFill::Drop);
        assert_eq!(filled, 2);
        assert_approx(values[1], 2.0, DEFAULT_EPSILON);
        assert_approx(values[2], 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn boundary_runs_follow_policy() {
        let mut dropped = [NAN, 2.0, NAN, 4.0, NAN];
        interpolate_linear(&mut dropped, BoundaryFill::Drop);
        assert!(dropped[0].is_nan());
        assert_approx(dropped[2], 3.0, DEFAULT_EPSILON);
        assert!(dropped[4].is_nan());

        let mut extended = [NAN, 2.0, NAN, 4.0, NAN];
        let filled = interpolate_linear(&mut extended, BoundaryFill::Extend);
        assert_eq!(filled, 3);
        assert_eq!(extended[0], 2.0);
        assert_eq!(extended[4], 4.0);
    }

    #[test]
    fn all_nan_untouched() {
        let mut values = [NAN, NAN];
        assert_eq!(interpolate_linear(&mut values, BoundaryFill::Extend), 0);
        assert!(values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn infinities_become_nan() {
        let mut values = [1.0, f64::INFINITY, f64::NEG_INFINITY];
        assert_eq!(replace_infinite(&mut values), 2);
        assert!(values[1].is_nan() && values[2].is_nan());
    }

    #[test]
    fn clean_drops_rows_with_leftover_gaps() {
        let mut table = close_table(&[NAN, 1.0, NAN, 3.0, f64::INFINITY]);
        table.insert_column("x", vec![1.0, 1.0, 1.0, 1.0, 1.0]).unwrap();

        let report = clean(&mut table, BoundaryFill::Drop);

        assert_eq!(report.rows_in, 5);
        assert_eq!(report.cells_interpolated, 1);
        assert_eq!(report.infinities_replaced, 1);
        assert_eq!(report.rows_dropped, 2);
        assert_eq!(report.rows_out, 3);
        assert_eq!(table.column("Close").unwrap(), &[1.0, 2.0, 3.0]);
        assert!(table.is_clean());
    }
}
