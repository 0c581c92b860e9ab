//! Indicator stages.
//!
//! A stage reads base columns of a [`FeatureTable`] and adds derived ones.
//! Stages are pure functions of the table: the output at row t depends only
//! on rows ≤ t, and each stage writes a disjoint set of columns, so the four
//! stages commute.
//!
//! Ownership decides aliasing: [`IndicatorStage::apply`] consumes the table
//! and hands the same storage back with new columns, while
//! [`IndicatorStage::apply_to`] leaves the caller's table untouched and
//! returns a deep copy.

pub mod bollinger;
pub mod macd;
pub mod rsi;
pub mod volatility;

pub use bollinger::Bollinger;
pub use macd::Macd;
pub use rsi::Rsi;
pub use volatility::Volatility;

use crate::error::Result;
use crate::table::FeatureTable;
use serde::{Deserialize, Serialize};

/// Trait for indicator stages.
///
/// # Look-ahead contamination guard
/// No output value at row t may depend on data from row t+1 or later.
/// Every stage must pass the truncated-vs-full table test.
pub trait IndicatorStage: Send + Sync {
    /// Short stage name used in logs ("rsi", "macd", ...).
    fn name(&self) -> &str;

    /// Reject parameters the stage cannot compute with.
    ///
    /// Deserialized stages skip their constructors; configs call this
    /// before any data is fetched.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Columns that must be present before the stage runs.
    fn required_columns(&self) -> Vec<String>;

    /// Compute the new columns without touching the table.
    ///
    /// Every returned column has the table's height.
    fn compute(&self, table: &FeatureTable) -> Result<Vec<(String, Vec<f64>)>>;

    /// Add the stage's columns to `table`.
    ///
    /// All columns are computed before any is inserted, so a failing stage
    /// (e.g. `MissingColumn`) leaves the table as it was.
    fn apply_in_place(&self, table: &mut FeatureTable) -> Result<()> {
        let columns = self.compute(table)?;
        let added = columns.len();
        for (name, values) in columns {
            table.insert_column(name, values)?;
        }
        tracing::debug!(stage = self.name(), columns = added, "applied indicator stage");
        Ok(())
    }

    /// Consume the table and return it with the stage's columns added.
    fn apply(&self, mut table: FeatureTable) -> Result<FeatureTable> {
        self.apply_in_place(&mut table)?;
        Ok(table)
    }

    /// Return a new table with the stage's columns; `table` is not modified.
    fn apply_to(&self, table: &FeatureTable) -> Result<FeatureTable> {
        self.apply(table.clone())
    }
}

/// Whether a configured stage mutates its input or works on a copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    InPlace,
    #[default]
    Copy,
}

impl ApplyMode {
    pub fn from_in_place(in_place: bool) -> Self {
        if in_place {
            Self::InPlace
        } else {
            Self::Copy
        }
    }
}

/// The closed set of indicator stages, as written in configuration files.
///
/// ```toml
/// [[indicators]]
/// type = "rsi"
/// window = 14
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Indicator {
    Volatility(Volatility),
    Macd(Macd),
    Rsi(Rsi),
    Bollinger(Bollinger),
}

impl Indicator {
    fn stage(&self) -> &dyn IndicatorStage {
        match self {
            Self::Volatility(s) => s,
            Self::Macd(s) => s,
            Self::Rsi(s) => s,
            Self::Bollinger(s) => s,
        }
    }
}

impl IndicatorStage for Indicator {
    fn name(&self) -> &str {
        self.stage().name()
    }

    fn validate(&self) -> Result<()> {
        self.stage().validate()
    }

    fn required_columns(&self) -> Vec<String> {
        self.stage().required_columns()
    }

    fn compute(&self, table: &FeatureTable) -> Result<Vec<(String, Vec<f64>)>> {
        self.stage().compute(table)
    }
}

impl From<Volatility> for Indicator {
    fn from(stage: Volatility) -> Self {
        Self::Volatility(stage)
    }
}

impl From<Macd> for Indicator {
    fn from(stage: Macd) -> Self {
        Self::Macd(stage)
    }
}

impl From<Rsi> for Indicator {
    fn from(stage: Rsi) -> Self {
        Self::Rsi(stage)
    }
}

impl From<Bollinger> for Indicator {
    fn from(stage: Bollinger) -> Self {
        Self::Bollinger(stage)
    }
}

/// An ordered list of stages applied under one [`ApplyMode`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorSet {
    stages: Vec<Indicator>,
}

impl IndicatorSet {
    pub fn new(stages: impl IntoIterator<Item = Indicator>) -> Self {
        Self {
            stages: stages.into_iter().collect(),
        }
    }

    pub fn push(&mut self, stage: impl Into<Indicator>) {
        self.stages.push(stage.into());
    }

    pub fn stages(&self) -> &[Indicator] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Apply every stage in order to an owned table.
    pub fn apply(&self, mut table: FeatureTable) -> Result<FeatureTable> {
        for stage in &self.stages {
            stage.apply_in_place(&mut table)?;
        }
        Ok(table)
    }

    /// Apply every stage to a copy of `table`.
    pub fn apply_to(&self, table: &FeatureTable) -> Result<FeatureTable> {
        self.apply(table.clone())
    }
}
