//! Moving Average Convergence Divergence.
//!
//! - line: EMA(close, fast) - EMA(close, slow)
//! - signal line: EMA(line, signal)
//! - histogram: line - signal line
//!
//! All three use the recursive EMA seeded with the first close, so the
//! output is defined from the first row.

use super::IndicatorStage;
use crate::error::{FeatureError, Result};
use crate::names;
use crate::series::{self, EwmMode, EwmWeight};
use crate::table::FeatureTable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Macd {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self> {
        let stage = Self { fast, slow, signal };
        stage.validate()?;
        Ok(stage)
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

impl IndicatorStage for Macd {
    fn name(&self) -> &str {
        "macd"
    }

    fn validate(&self) -> Result<()> {
        let spans = [
            ("macd fast span", self.fast),
            ("macd slow span", self.slow),
            ("macd signal span", self.signal),
        ];
        for (parameter, span) in spans {
            if span == 0 {
                return Err(FeatureError::invalid_window(
                    parameter,
                    0.0,
                    "EMA span must be at least 1",
                ));
            }
        }
        Ok(())
    }

    fn required_columns(&self) -> Vec<String> {
        vec![names::CLOSE.to_string()]
    }

    fn compute(&self, table: &FeatureTable) -> Result<Vec<(String, Vec<f64>)>> {
        let close = table.column(names::CLOSE)?;
        let ema = |values: &[f64], span: usize| {
            series::ewm_mean(values, EwmWeight::Span(span), EwmMode::Recursive)
        };

        let line = series::subtract(&ema(close, self.fast)?, &ema(close, self.slow)?);
        let signal = ema(&line, self.signal)?;
        let histogram = series::subtract(&line, &signal);

        Ok(vec![
            (names::MACD_LINE.to_string(), line),
            (names::MACD_SIGNAL_LINE.to_string(), signal),
            (names::MACD_HISTOGRAM.to_string(), histogram),
        ])
    }
}
