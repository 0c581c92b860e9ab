//! One configured run: load, apply indicator stages, optionally export.

use crate::config::PipelineConfig;
use crate::data::export::write_table;
use crate::data::provider::DataProvider;
use crate::error::Result;
use crate::indicators::ApplyMode;
use crate::loader::{LoadReport, Loader};
use crate::table::FeatureTable;

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Loaded table with every configured stage applied.
    pub table: FeatureTable,
    /// The loader's table before any stage ran. Only kept in copy mode;
    /// in place mode hands that storage to the stages.
    pub base: Option<FeatureTable>,
    pub report: LoadReport,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run against the provider named in the configuration.
    pub fn run(&self) -> Result<PipelineOutput> {
        let provider = self.config.source.build();
        self.run_with(provider.as_ref())
    }

    /// Run against an explicit provider.
    pub fn run_with(&self, provider: &dyn DataProvider) -> Result<PipelineOutput> {
        let loader = Loader::new(provider, self.config.loader.clone());
        let (loaded, report) = loader.load_with_report()?;

        let indicators = &self.config.indicators;
        let (table, base) = match self.config.apply_mode() {
            ApplyMode::InPlace => (indicators.apply(loaded)?, None),
            ApplyMode::Copy => (indicators.apply_to(&loaded)?, Some(loaded)),
        };
        tracing::debug!(
            stages = indicators.stages().len(),
            columns = table.width(),
            "applied indicator stages"
        );

        if let Some(output) = &self.config.output {
            write_table(&table, &output.path)?;
            tracing::info!(path = %output.path.display(), rows = table.height(), "wrote feature table");
        }

        Ok(PipelineOutput {
            table,
            base,
            report,
        })
    }
}
