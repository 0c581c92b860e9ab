//! In-memory provider serving pre-built tables.
//!
//! Used as a deterministic stub in tests and when tables already live in
//! memory. The requested range is honoured; the interval is not, since the
//! stored tables already have one.

use super::provider::{DataError, DataProvider, DownloadOptions};
use crate::table::FeatureTable;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    tables: HashMap<String, FeatureTable>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the table served for `symbol`.
    pub fn insert(&mut self, symbol: impl Into<String>, table: FeatureTable) {
        self.tables.insert(symbol.into(), table);
    }

    pub fn with(mut self, symbol: impl Into<String>, table: FeatureTable) -> Self {
        self.insert(symbol, table);
        self
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

impl DataProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn download(&self, symbol: &str, options: &DownloadOptions) -> Result<FeatureTable, DataError> {
        let table = self
            .tables
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;

        let mask: Vec<bool> = table
            .index()
            .iter()
            .map(|ts| options.range.contains(*ts))
            .collect();
        let mut served = table.clone();
        if mask.iter().any(|keep| !keep) {
            served
                .retain_rows(&mask)
                .map_err(|e| DataError::Other(e.to_string()))?;
        }

        if served.is_empty() {
            return Err(DataError::EmptyHistory {
                symbol: symbol.to_string(),
            });
        }
        Ok(served)
    }
}
