//! Relative Strength Index over one-bar returns.
//!
//! gains = positive part of `return_1`, losses = negative part (anything
//! else, NaN included, counts as 0). Both are smoothed with the recursive EMA
//! at alpha = 1 / (1 + window), seeded from the first row:
//! rs = |avg_gain / avg_loss|, RSI = 100 * rs / (1 + rs).
//!
//! This is not Wilder's RSI: there is no simple-average seed.
//! Edge cases: avg_loss == 0 with avg_gain > 0 → RSI = 100 exactly;
//! avg_gain == avg_loss == 0 → undefined.

use super::IndicatorStage;
use crate::error::{FeatureError, Result};
use crate::names;
use crate::series::{self, EwmMode, EwmWeight};
use crate::table::FeatureTable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rsi {
    pub window: usize,
}

impl Rsi {
    pub fn new(window: usize) -> Result<Self> {
        let stage = Self { window };
        stage.validate()?;
        Ok(stage)
    }
}

impl Default for Rsi {
    fn default() -> Self {
        Self { window: 5 }
    }
}

impl IndicatorStage for Rsi {
    fn name(&self) -> &str {
        "rsi"
    }

    fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(FeatureError::invalid_window(
                "rsi window",
                0.0,
                "window must be at least 1",
            ));
        }
        Ok(())
    }

    fn required_columns(&self) -> Vec<String> {
        vec![names::return_1()]
    }

    fn compute(&self, table: &FeatureTable) -> Result<Vec<(String, Vec<f64>)>> {
        self.validate()?;
        let returns = table.column(&names::return_1())?;

        let gains: Vec<f64> = returns
            .iter()
            .map(|r| if *r > 0.0 { *r } else { 0.0 })
            .collect();
        let losses: Vec<f64> = returns
            .iter()
            .map(|r| if *r < 0.0 { *r } else { 0.0 })
            .collect();

        let weight = EwmWeight::CenterOfMass(self.window as f64);
        let avg_gain = series::ewm_mean(&gains, weight, EwmMode::Recursive)?;
        let avg_loss = series::ewm_mean(&losses, weight, EwmMode::Recursive)?;

        let rsi = avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(gain, loss)| relative_strength_index(*gain, *loss))
            .collect();

        Ok(vec![(names::RSI.to_string(), rsi)])
    }
}

fn relative_strength_index(avg_gain: f64, avg_loss: f64) -> f64 {
    let rs = (avg_gain / avg_loss).abs();
    if rs.is_infinite() {
        100.0
    } else {
        100.0 * rs / (1.0 + rs)
    }
}
