//! FeatureLab Core: time-series feature pipeline.
//!
//! This crate turns raw per-asset OHLCV history into an aligned, cleaned
//! feature table:
//! - `FeatureTable`, a time-indexed table of named `f64` columns
//! - Series math (percent change, log return, rolling std, EWM means)
//! - Indicator stages (volatility, MACD, RSI, Bollinger Bands)
//! - Benchmark alignment by timestamp
//! - The loader (fetch → derive → merge → clean) and local data providers
//! - CSV/Parquet export and TOML pipeline configuration

pub mod clean;
pub mod config;
pub mod data;
pub mod error;
pub mod horizon;
pub mod indicators;
pub mod loader;
pub mod names;
pub mod pipeline;
pub mod series;
pub mod table;

pub use clean::{BoundaryFill, CleanReport};
pub use config::{OutputConfig, PipelineConfig, ProviderConfig};
pub use data::{DataError, DataProvider, DownloadOptions, Frequency, HistoryRange};
pub use error::{FeatureError, Result};
pub use horizon::HorizonSet;
pub use indicators::{ApplyMode, Indicator, IndicatorSet, IndicatorStage};
pub use loader::{LoadReport, Loader, LoaderConfig};
pub use pipeline::{Pipeline, PipelineOutput};
pub use table::FeatureTable;
