//! Bollinger Bands around an exponential mean.
//!
//! - mid: bias-corrected EMA(close, span = window)
//! - lower / upper: mid ∓ num_std * sample std(close, window)
//!
//! The bands start after the window - 1 row std warm-up; mid is defined from
//! row 0.

use super::IndicatorStage;
use crate::error::{FeatureError, Result};
use crate::names;
use crate::series::{self, EwmMode, EwmWeight};
use crate::table::FeatureTable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bollinger {
    pub window: usize,
    pub num_std: f64,
}

impl Bollinger {
    pub fn new(window: usize) -> Result<Self> {
        let stage = Self {
            window,
            ..Self::default()
        };
        stage.validate()?;
        Ok(stage)
    }

    pub fn with_num_std(mut self, num_std: f64) -> Result<Self> {
        self.num_std = num_std;
        self.validate()?;
        Ok(self)
    }
}

impl Default for Bollinger {
    fn default() -> Self {
        Self {
            window: 10,
            num_std: 2.0,
        }
    }
}

impl IndicatorStage for Bollinger {
    fn name(&self) -> &str {
        "bollinger"
    }

    fn validate(&self) -> Result<()> {
        if self.window < 2 {
            return Err(FeatureError::invalid_window(
                "bollinger window",
                self.window as f64,
                "window must be at least 2",
            ));
        }
        if !(self.num_std >= 0.0 && self.num_std.is_finite()) {
            return Err(FeatureError::invalid_window(
                "bollinger num_std",
                self.num_std,
                "band width must be finite and non-negative",
            ));
        }
        Ok(())
    }

    fn required_columns(&self) -> Vec<String> {
        vec![names::CLOSE.to_string()]
    }

    fn compute(&self, table: &FeatureTable) -> Result<Vec<(String, Vec<f64>)>> {
        self.validate()?;
        let close = table.column(names::CLOSE)?;

        let mid = series::ewm_mean(close, EwmWeight::Span(self.window), EwmMode::Adjusted)?;
        let std = series::rolling_std(close, self.window)?;
        let band = |sign: f64| -> Vec<f64> {
            mid.iter()
                .zip(&std)
                .map(|(m, s)| m + sign * self.num_std * s)
                .collect()
        };
        let lower = band(-1.0);
        let upper = band(1.0);

        Ok(vec![
            (names::BOLLINGER_MID.to_string(), mid),
            (names::BOLLINGER_LOWER.to_string(), lower),
            (names::BOLLINGER_UPPER.to_string(), upper),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_support::{assert_approx, close_table, return_table, DEFAULT_EPSILON};

    #[test]
    fn bands_bracket_the_mean() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + ((i as f64) * 0.5).sin() * 5.0)
            .collect();
        let out = Bollinger::default().apply(close_table(&closes)).unwrap();
        let mid = out.column(names::BOLLINGER_MID).unwrap();
        let lower = out.column(names::BOLLINGER_LOWER).unwrap();
        let upper = out.column(names::BOLLINGER_UPPER).unwrap();

        assert!(lower[..9].iter().all(|v| v.is_nan()));
        for i in 9..closes.len() {
            assert!(lower[i] <= mid[i] && mid[i] <= upper[i], "row {i}");
        }
    }

    #[test]
    fn known_values() {
        // std of (1, 2) = sqrt(0.5)
        let out = Bollinger::new(2).unwrap().apply(close_table(&[1.0, 2.0])).unwrap();
        let mid = out.column(names::BOLLINGER_MID).unwrap();
        let upper = out.column(names::BOLLINGER_UPPER).unwrap();
        assert_approx(mid[0], 1.0, DEFAULT_EPSILON);
        // span 2 -> alpha 2/3: mid[1] = (2 + (1/3) * 1) / (1 + 1/3) = 1.75
        assert_approx(mid[1], 1.75, DEFAULT_EPSILON);
        assert_approx(upper[1], 1.75 + 2.0 * 0.5f64.sqrt(), DEFAULT_EPSILON);
    }

    #[test]
    fn constant_price_collapses_bands() {
        let out = Bollinger::default().apply(close_table(&[100.0; 20])).unwrap();
        let lower = out.column(names::BOLLINGER_LOWER).unwrap();
        let upper = out.column(names::BOLLINGER_UPPER).unwrap();
        assert_approx(lower[19], 100.0, DEFAULT_EPSILON);
        assert_approx(upper[19], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn invalid_parameters() {
        assert!(Bollinger::new(1).is_err());
        assert!(Bollinger::default().with_num_std(-1.0).is_err());
    }

    #[test]
    fn missing_close() {
        assert!(matches!(
            Bollinger::default().compute(&return_table(&[0.1])),
            Err(FeatureError::MissingColumn { .. })
        ));
    }
}
