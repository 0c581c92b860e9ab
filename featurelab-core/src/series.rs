//! Pure numeric helpers over ordered `f64` sequences.
//!
//! Every function returns a new vector of the same length as its input.
//! Rows that cannot be computed yet (warm-up) are `f64::NAN`. A window or
//! horizon at least as long as the input is not an error: the result is
//! simply all-NaN, and the loader reports the empty outcome.

use crate::error::{FeatureError, Result};
use serde::{Deserialize, Serialize};

/// Percent change over `horizon` rows: `x[i] / x[i - horizon] - 1`.
///
/// A zero denominator yields ±inf (NaN for 0/0), left for the cleaning step.
pub fn percent_change(values: &[f64], horizon: usize) -> Result<Vec<f64>> {
    if horizon == 0 {
        return Err(FeatureError::invalid_window(
            "horizon",
            0.0,
            "percent change horizon must be positive",
        ));
    }
    let mut result = vec![f64::NAN; values.len()];
    for i in horizon..values.len() {
        result[i] = values[i] / values[i - horizon] - 1.0;
    }
    Ok(result)
}

/// Value `offset` rows ahead: `out[i] = x[i + offset]`, NaN past the end.
///
/// Only the loader's target column may use this; features never look ahead.
pub fn lead(values: &[f64], offset: usize) -> Vec<f64> {
    let n = values.len();
    (0..n)
        .map(|i| if i + offset < n { values[i + offset] } else { f64::NAN })
        .collect()
}

/// Log return from a simple return: `ln(1 + r)`.
pub fn log_return(simple_returns: &[f64]) -> Vec<f64> {
    simple_returns.iter().map(|r| r.ln_1p()).collect()
}

/// Sample standard deviation (n - 1 denominator) over a trailing window.
///
/// The first `window - 1` rows are NaN, as is any row whose window holds a NaN.
pub fn rolling_std(values: &[f64], window: usize) -> Result<Vec<f64>> {
    if window < 2 {
        return Err(FeatureError::invalid_window(
            "window",
            window as f64,
            "rolling standard deviation needs a window of at least 2",
        ));
    }
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < window {
        return Ok(result);
    }

    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let sum_sq: f64 = slice
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum();
        result[i] = (sum_sq / (window - 1) as f64).sqrt();
    }

    Ok(result)
}

/// Smoothing parameter of an exponentially weighted mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EwmWeight {
    /// alpha = 2 / (span + 1)
    Span(usize),
    /// alpha = 1 / (1 + com)
    CenterOfMass(f64),
    Alpha(f64),
}

impl EwmWeight {
    /// Resolve to alpha in (0, 1].
    pub fn alpha(self) -> Result<f64> {
        let alpha = match self {
            Self::Span(span) => {
                if span == 0 {
                    return Err(FeatureError::invalid_window(
                        "span",
                        0.0,
                        "span must be at least 1",
                    ));
                }
                2.0 / (span as f64 + 1.0)
            }
            Self::CenterOfMass(com) => {
                if !(com >= 0.0) || !com.is_finite() {
                    return Err(FeatureError::invalid_window(
                        "center of mass",
                        com,
                        "center of mass must be finite and non-negative",
                    ));
                }
                1.0 / (1.0 + com)
            }
            Self::Alpha(alpha) => alpha,
        };
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(FeatureError::invalid_window(
                "alpha",
                alpha,
                "smoothing factor must lie in (0, 1]",
            ));
        }
        Ok(alpha)
    }
}

/// Weighting convention of an exponentially weighted mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EwmMode {
    /// Bias-corrected weighted average of all history:
    /// `y[t] = Σ (1-α)^k x[t-k] / Σ (1-α)^k`.
    Adjusted,
    /// Simple exponential smoothing seeded with the first observation:
    /// `y[t] = α x[t] + (1-α) y[t-1]`.
    Recursive,
}

/// Exponentially weighted mean.
///
/// NaN inputs add no observation but still decay the weight of older ones;
/// the output at such a row repeats the running mean. Rows before the first
/// observation are NaN.
pub fn ewm_mean(values: &[f64], weight: EwmWeight, mode: EwmMode) -> Result<Vec<f64>> {
    let alpha = weight.alpha()?;
    let decay = 1.0 - alpha;
    let new_weight = match mode {
        EwmMode::Adjusted => 1.0,
        EwmMode::Recursive => alpha,
    };

    let mut result = Vec::with_capacity(values.len());
    let mut mean = f64::NAN;
    let mut old_weight = 1.0;

    for &x in values {
        let observed = !x.is_nan();
        if mean.is_nan() {
            if observed {
                mean = x;
                old_weight = 1.0;
            }
        } else {
            old_weight *= decay;
            if observed {
                if mean != x {
                    mean = (old_weight * mean + new_weight * x) / (old_weight + new_weight);
                }
                old_weight = match mode {
                    EwmMode::Adjusted => old_weight + new_weight,
                    EwmMode::Recursive => 1.0,
                };
            }
        }
        result.push(mean);
    }

    Ok(result)
}

/// Element-wise `a - b`.
pub fn subtract(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_support::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn percent_change_basic() {
        let result = percent_change(&[100.0, 110.0, 121.0], 1).unwrap();
        assert!(result[0].is_nan());
        assert_approx(result[1], 0.1, DEFAULT_EPSILON);
        assert_approx(result[2], 0.1, DEFAULT_EPSILON);

        let result = percent_change(&[100.0, 110.0, 121.0], 2).unwrap();
        assert!(result[1].is_nan());
        assert_approx(result[2], 0.21, DEFAULT_EPSILON);
    }

    #[test]
    fn percent_change_zero_horizon_is_invalid() {
        assert!(matches!(
            percent_change(&[1.0, 2.0], 0),
            Err(FeatureError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn percent_change_zero_denominator_is_infinite() {
        let result = percent_change(&[0.0, 5.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(result[1], f64::INFINITY);
        assert_approx(result[2], -1.0, DEFAULT_EPSILON);
        assert!(result[3].is_nan()); // 0/0
    }

    #[test]
    fn horizon_longer_than_input_is_all_nan() {
        let result = percent_change(&[1.0, 2.0, 3.0], 5).unwrap();
        assert!(result.iter().all(|v| v.is_nan()));
        let result = rolling_std(&[1.0, 2.0, 3.0], 5).unwrap();
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn lead_shifts_into_the_past() {
        let result = lead(&[1.0, 2.0, 3.0], 1);
        assert_eq!(&result[..2], &[2.0, 3.0]);
        assert!(result[2].is_nan());
    }

    #[test]
    fn log_return_matches_ln_1p() {
        let result = log_return(&[0.1, f64::NAN, -0.5]);
        assert_approx(result[0], 1.1f64.ln(), DEFAULT_EPSILON);
        assert!(result[1].is_nan());
        assert_approx(result[2], 0.5f64.ln(), DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_std_known_values() {
        // Sample std of (1,2,3) = 1, of (2,3,5) = sqrt(7/3)
        let result = rolling_std(&[1.0, 2.0, 3.0, 5.0], 3).unwrap();
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 1.0, DEFAULT_EPSILON);
        assert_approx(result[3], (7.0f64 / 3.0).sqrt(), DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_std_nan_in_window() {
        let result = rolling_std(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2).unwrap();
        assert!(result[1].is_nan());
        assert!(result[2].is_nan());
        assert_approx(result[3], 0.5f64.sqrt(), DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_std_degenerate_window() {
        assert!(rolling_std(&[1.0, 2.0], 1).is_err());
        assert!(rolling_std(&[1.0, 2.0], 0).is_err());
    }

    #[test]
    fn recursive_ewm_known_values() {
        // span 3 -> alpha 0.5
        let result = ewm_mean(&[10.0, 11.0, 12.0], EwmWeight::Span(3), EwmMode::Recursive).unwrap();
        assert_approx(result[0], 10.0, DEFAULT_EPSILON);
        assert_approx(result[1], 10.5, DEFAULT_EPSILON);
        assert_approx(result[2], 11.25, DEFAULT_EPSILON);
    }

    #[test]
    fn adjusted_ewm_known_values() {
        // alpha 0.5: y1 = (2 + 0.5*1) / 1.5, y2 = (3 + 0.5*2 + 0.25*1) / 1.75
        let result = ewm_mean(&[1.0, 2.0, 3.0], EwmWeight::Alpha(0.5), EwmMode::Adjusted).unwrap();
        assert_approx(result[0], 1.0, DEFAULT_EPSILON);
        assert_approx(result[1], 2.5 / 1.5, DEFAULT_EPSILON);
        assert_approx(result[2], 4.25 / 1.75, DEFAULT_EPSILON);
    }

    #[test]
    fn ewm_leading_nan_and_gaps() {
        let result = ewm_mean(
            &[f64::NAN, 4.0, f64::NAN, 8.0],
            EwmWeight::Alpha(0.5),
            EwmMode::Recursive,
        )
        .unwrap();
        assert!(result[0].is_nan());
        assert_approx(result[1], 4.0, DEFAULT_EPSILON);
        // gap repeats the running mean
        assert_approx(result[2], 4.0, DEFAULT_EPSILON);
        // old weight decayed twice: (0.25*4 + 0.5*8) / 0.75
        assert_approx(result[3], 5.0 / 0.75, DEFAULT_EPSILON);
    }

    #[test]
    fn ewm_weights_resolve_to_alpha() {
        assert_approx(EwmWeight::Span(9).alpha().unwrap(), 0.2, DEFAULT_EPSILON);
        assert_approx(
            EwmWeight::CenterOfMass(5.0).alpha().unwrap(),
            1.0 / 6.0,
            DEFAULT_EPSILON,
        );
        assert!(EwmWeight::Span(0).alpha().is_err());
        assert!(EwmWeight::Alpha(0.0).alpha().is_err());
        assert!(EwmWeight::Alpha(1.5).alpha().is_err());
        assert!(EwmWeight::CenterOfMass(-1.0).alpha().is_err());
    }

    #[test]
    fn ewm_constant_series_is_constant() {
        let values = vec![42.0; 50];
        for mode in [EwmMode::Adjusted, EwmMode::Recursive] {
            let result = ewm_mean(&values, EwmWeight::Span(12), mode).unwrap();
            assert!(result.iter().all(|v| *v == 42.0));
        }
    }
}
