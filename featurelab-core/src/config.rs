//! Pipeline configuration, read from TOML.
//!
//! ```toml
//! in_place = false
//!
//! [loader]
//! symbol = "SPY"
//! benchmark = "QQQ"
//! start = "2020-01-01"
//! horizons = [1, 2, 5, 10, 20, 40]
//!
//! [source]
//! kind = "csv"
//! dir = "data"
//!
//! [[indicators]]
//! type = "rsi"
//! window = 5
//!
//! [output]
//! path = "features.parquet"
//! ```

use crate::data::csv_provider::CsvProvider;
use crate::data::provider::DataProvider;
use crate::data::synthetic::SyntheticProvider;
use crate::error::{FeatureError, Result};
use crate::indicators::{ApplyMode, IndicatorSet, IndicatorStage};
use crate::loader::LoaderConfig;
use crate::names;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the raw OHLCV history comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// A directory of `{SYMBOL}.csv` / `{SYMBOL}_{interval}.csv` files.
    Csv { dir: PathBuf },
    /// Deterministic random walk.
    Synthetic {
        #[serde(default)]
        bars: Option<usize>,
    },
}

impl ProviderConfig {
    pub fn build(&self) -> Box<dyn DataProvider> {
        match self {
            Self::Csv { dir } => Box::new(CsvProvider::new(dir)),
            Self::Synthetic { bars } => {
                let provider = SyntheticProvider::new();
                match bars {
                    Some(n) => Box::new(provider.with_default_bars(*n)),
                    None => Box::new(provider),
                }
            }
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::Synthetic { bars: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// `.csv` or `.parquet`.
    pub path: PathBuf,
}

/// Everything one pipeline run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Let indicator stages mutate the loaded table instead of a copy.
    #[serde(default)]
    pub in_place: bool,
    pub loader: LoaderConfig,
    #[serde(default)]
    pub source: ProviderConfig,
    #[serde(default)]
    pub indicators: IndicatorSet,
    #[serde(default)]
    pub output: Option<OutputConfig>,
}

impl PipelineConfig {
    pub fn new(loader: LoaderConfig) -> Self {
        Self {
            in_place: false,
            loader,
            source: ProviderConfig::default(),
            indicators: IndicatorSet::default(),
            output: None,
        }
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| FeatureError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FeatureError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn apply_mode(&self) -> ApplyMode {
        ApplyMode::from_in_place(self.in_place)
    }

    /// Check stage parameters and that every stage's inputs will exist in
    /// the loaded table.
    ///
    /// The loader produces OHLCV, `forward_return` and the per-horizon
    /// features; stages reading `return_1` need horizon 1 configured.
    pub fn validate(&self) -> Result<()> {
        self.loader.validate()?;

        let mut produced: Vec<String> = names::OHLCV.iter().map(|s| s.to_string()).collect();
        produced.push(names::FORWARD_RETURN.to_string());
        for h in self.loader.horizons.iter() {
            produced.push(names::return_h("", h));
            produced.push(names::volume_h("", h));
        }

        for stage in self.indicators.stages() {
            stage.validate()?;
            for column in stage.required_columns() {
                if !produced.contains(&column) {
                    return Err(FeatureError::Config(format!(
                        "indicator '{}' needs column '{column}', which the loader will not produce \
                         (add horizon 1 to loader.horizons)",
                        stage.name()
                    )));
                }
            }
        }

        if let Some(output) = &self.output {
            match output.path.extension().and_then(|e| e.to_str()) {
                Some("csv") | Some("parquet") => {}
                _ => {
                    return Err(FeatureError::Config(format!(
                        "output path {} must end in .csv or .parquet",
                        output.path.display()
                    )))
                }
            }
        }
        Ok(())
    }
}
