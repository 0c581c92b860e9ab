//! Horizon sets: ordered, deduplicated lookback window sizes in bars.

use crate::error::{FeatureError, Result};
use serde::{Deserialize, Serialize};

/// Horizons used when the loader is not given any.
pub const DEFAULT_HORIZONS: [usize; 6] = [1, 2, 5, 10, 20, 40];

/// An ordered set of positive horizons, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct HorizonSet(Vec<usize>);

impl HorizonSet {
    /// Build a horizon set, sorting ascending and removing duplicates.
    ///
    /// Rejects an empty set and any zero horizon.
    pub fn new(horizons: impl IntoIterator<Item = usize>) -> Result<Self> {
        let mut values: Vec<usize> = horizons.into_iter().collect();
        if values.is_empty() {
            return Err(FeatureError::invalid_window(
                "horizon set",
                0.0,
                "at least one horizon is required",
            ));
        }
        if values.contains(&0) {
            return Err(FeatureError::invalid_window(
                "horizon",
                0.0,
                "horizons must be positive",
            ));
        }
        values.sort_unstable();
        values.dedup();
        Ok(Self(values))
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Longest horizon, i.e. the number of warm-up rows the loader loses.
    pub fn max(&self) -> usize {
        // Non-empty by construction.
        self.0.last().copied().unwrap_or(0)
    }

    pub fn contains(&self, horizon: usize) -> bool {
        self.0.binary_search(&horizon).is_ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for HorizonSet {
    fn default() -> Self {
        Self(DEFAULT_HORIZONS.to_vec())
    }
}

impl TryFrom<Vec<usize>> for HorizonSet {
    type Error = FeatureError;

    fn try_from(value: Vec<usize>) -> Result<Self> {
        Self::new(value)
    }
}

impl From<HorizonSet> for Vec<usize> {
    fn from(value: HorizonSet) -> Self {
        value.0
    }
}
