//! FeatureLab CLI: build feature tables and generate synthetic data.
//!
//! Commands:
//! - `build`: load an asset and benchmark, derive features, apply indicator
//!   stages, print a JSON summary and optionally write the table
//! - `synth`: write a deterministic synthetic OHLCV CSV

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use featurelab_core::data::{write_csv, DataProvider, SyntheticProvider};
use featurelab_core::indicators::{Bollinger, Macd, Rsi, Volatility};
use featurelab_core::{
    BoundaryFill, Frequency, HorizonSet, IndicatorSet, LoaderConfig, OutputConfig,
    Pipeline, PipelineConfig, PipelineOutput, ProviderConfig,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "featurelab",
    about = "FeatureLab CLI: aligned, cleaned time-series feature tables"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a feature table from a TOML config file or from flags.
    Build(BuildArgs),
    /// Write a synthetic OHLCV CSV readable by the CSV provider.
    Synth {
        /// Symbol; also seeds the random walk.
        symbol: String,

        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD).
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Bar interval (1d, 1h, 1wk, ...).
        #[arg(long, default_value = "1d")]
        interval: Frequency,

        /// Number of bars when the range is open.
        #[arg(long, default_value_t = 750)]
        bars: usize,

        /// Output CSV. Defaults to data/{SYMBOL}.csv.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Path to a TOML pipeline config. Other flags are ignored when given.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Asset symbol.
    #[arg(long)]
    symbol: Option<String>,

    /// Benchmark symbol. Defaults to the asset.
    #[arg(long)]
    benchmark: Option<String>,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD).
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Bar interval (1d, 1h, 1wk, ...).
    #[arg(long, default_value = "1d")]
    interval: Frequency,

    /// Comma-separated horizons, e.g. 1,5,20.
    #[arg(long, value_delimiter = ',', default_values_t = [1usize, 2, 5, 10, 20, 40])]
    horizons: Vec<usize>,

    /// How leading/trailing gaps are handled while cleaning.
    #[arg(long, value_enum, default_value_t = Boundary::Drop)]
    boundary: Boundary,

    /// Directory of {SYMBOL}.csv files.
    #[arg(long, conflicts_with = "synthetic")]
    data_dir: Option<PathBuf>,

    /// Use the deterministic synthetic provider.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Add RSI (window 5).
    #[arg(long, default_value_t = false)]
    rsi: bool,

    /// Add MACD (12/26/9).
    #[arg(long, default_value_t = false)]
    macd: bool,

    /// Add Bollinger Bands (window 10).
    #[arg(long, default_value_t = false)]
    bollinger: bool,

    /// Add volatility over 5/10/20/40 bars.
    #[arg(long, default_value_t = false)]
    volatility: bool,

    /// Let stages mutate the loaded table instead of a copy.
    #[arg(long, default_value_t = false)]
    in_place: bool,

    /// Write the table here (.csv or .parquet).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Boundary {
    Drop,
    Extend,
}

impl From<Boundary> for BoundaryFill {
    fn from(value: Boundary) -> Self {
        match value {
            Boundary::Drop => BoundaryFill::Drop,
            Boundary::Extend => BoundaryFill::Extend,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => run_build(args),
        Commands::Synth {
            symbol,
            start,
            end,
            interval,
            bars,
            out,
        } => run_synth(&symbol, start, end, interval, bars, out),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_build(args: BuildArgs) -> Result<()> {
    let config = match args.config.clone() {
        Some(path) => {
            tracing::info!(config = %path.display(), "loading pipeline config");
            PipelineConfig::from_file(&path)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => config_from_flags(args)?,
    };

    let pipeline = Pipeline::new(config).context("invalid pipeline configuration")?;
    let output = pipeline.run().context("feature pipeline failed")?;
    print_summary(&output)?;
    Ok(())
}

fn config_from_flags(args: BuildArgs) -> Result<PipelineConfig> {
    let Some(symbol) = args.symbol else {
        bail!("one of --config or --symbol is required");
    };

    let source = match (args.data_dir, args.synthetic) {
        (Some(dir), _) => ProviderConfig::Csv { dir },
        (None, true) => ProviderConfig::Synthetic { bars: None },
        (None, false) => bail!("one of --data-dir or --synthetic is required"),
    };

    let mut indicators = IndicatorSet::default();
    if args.volatility {
        indicators.push(Volatility::default());
    }
    if args.macd {
        indicators.push(Macd::default());
    }
    if args.rsi {
        indicators.push(Rsi::default());
    }
    if args.bollinger {
        indicators.push(Bollinger::default());
    }

    let loader = LoaderConfig {
        benchmark: args.benchmark,
        start: args.start,
        end: args.end,
        interval: args.interval,
        horizons: HorizonSet::new(args.horizons)?,
        boundary: args.boundary.into(),
        ..LoaderConfig::new(symbol)
    };

    Ok(PipelineConfig {
        in_place: args.in_place,
        loader,
        source,
        indicators,
        output: args.out.map(|path| OutputConfig { path }),
    })
}

fn print_summary(output: &PipelineOutput) -> Result<()> {
    let columns: Vec<&str> = output.table.column_names().collect();
    let summary = serde_json::json!({
        "rows": output.table.height(),
        "columns": columns,
        "first": output.table.index().first().map(|ts| ts.to_string()),
        "last": output.table.index().last().map(|ts| ts.to_string()),
        "fingerprint": output.table.fingerprint(),
        "load": output.report,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_synth(
    symbol: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    interval: Frequency,
    bars: usize,
    out: Option<PathBuf>,
) -> Result<()> {
    let provider = SyntheticProvider::new().with_default_bars(bars);
    let options = featurelab_core::DownloadOptions {
        interval,
        range: featurelab_core::HistoryRange::from_bounds(start, end),
    };
    let table = provider
        .download(symbol, &options)
        .with_context(|| format!("failed to generate {symbol}"))?;

    let path = out.unwrap_or_else(|| PathBuf::from("data").join(format!("{symbol}.csv")));
    write_csv(&table, &path).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {} bars of {symbol} to {}", table.height(), path.display());
    Ok(())
}
