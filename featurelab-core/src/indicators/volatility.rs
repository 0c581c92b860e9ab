//! Realised volatility of log returns.
//!
//! For each horizon h: `volatility_h` = sample std over h rows of
//! `ln(1 + return_1)`.
//! On a fully defined `return_1` the first h - 1 rows are undefined.

use super::IndicatorStage;
use crate::error::{FeatureError, Result};
use crate::horizon::HorizonSet;
use crate::names;
use crate::series;
use crate::table::FeatureTable;
use serde::{Deserialize, Serialize};

const DEFAULT_HORIZONS: [usize; 4] = [5, 10, 20, 40];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Volatility {
    horizons: HorizonSet,
}

impl Volatility {
    /// Rejects horizon 1: the sample std of a single value is undefined.
    pub fn new(horizons: HorizonSet) -> Result<Self> {
        let stage = Self { horizons };
        stage.validate()?;
        Ok(stage)
    }

    pub fn horizons(&self) -> &HorizonSet {
        &self.horizons
    }
}

impl Default for Volatility {
    fn default() -> Self {
        Self {
            horizons: HorizonSet::new(DEFAULT_HORIZONS).unwrap_or_default(),
        }
    }
}

impl IndicatorStage for Volatility {
    fn name(&self) -> &str {
        "volatility"
    }

    fn validate(&self) -> Result<()> {
        if self.horizons.contains(1) {
            return Err(FeatureError::invalid_window(
                "volatility horizon",
                1.0,
                "rolling standard deviation needs a window of at least 2",
            ));
        }
        Ok(())
    }

    fn required_columns(&self) -> Vec<String> {
        vec![names::return_1()]
    }

    fn compute(&self, table: &FeatureTable) -> Result<Vec<(String, Vec<f64>)>> {
        self.validate()?;
        let log_returns = series::log_return(table.column(&names::return_1())?);
        self.horizons
            .iter()
            .map(|h| Ok((names::volatility_h(h), series::rolling_std(&log_returns, h)?)))
            .collect()
    }
}
