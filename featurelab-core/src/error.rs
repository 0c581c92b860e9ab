//! Error taxonomy for the feature pipeline.
//!
//! Provider failures are wrapped unmodified; everything else is raised by the
//! table, the series math, the indicator stages, or the loader itself.

use crate::data::provider::DataError;
use chrono::NaiveDateTime;
use thiserror::Error;

/// Errors produced by the feature pipeline.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("provider error: {0}")]
    Provider(#[from] DataError),

    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("invalid {parameter} = {value}: {reason}")]
    InvalidWindow {
        parameter: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("empty result: {reason}")]
    EmptyResult { reason: String },

    #[error("column '{column}' has {actual} values but the table has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("timestamps must be strictly increasing (row {row}: {timestamp})")]
    UnorderedIndex {
        row: usize,
        timestamp: NaiveDateTime,
    },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("export error: {0}")]
    Export(String),

    #[error("config error: {0}")]
    Config(String),
}

impl FeatureError {
    pub fn missing(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    pub(crate) fn invalid_window(parameter: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidWindow {
            parameter,
            value,
            reason,
        }
    }
}

pub type Result<T, E = FeatureError> = std::result::Result<T, E>;
