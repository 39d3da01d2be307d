//! # news-forecaster
//!
//! Command-line front end: reads an analyst bundle, runs the forecast
//! engine and writes the JSON report.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use forecast_engine::utils::timestamp_slug;
use forecast_engine::{DataLoader, ForecastConfig, Forecaster, Frequency, ModelKind};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "news_forecaster=info,forecast_engine=info";
const VERBOSE_LOG_FILTER: &str = "news_forecaster=debug,forecast_engine=debug";

#[derive(Parser, Debug)]
#[command(name = "news-forecaster")]
#[command(about = "Forecast article volume and keyword trends from an analyst bundle", long_about = None)]
struct Cli {
    /// Analyst bundle (JSON)
    input: PathBuf,

    /// Number of future periods to predict
    #[arg(long)]
    horizon: Option<usize>,

    /// Resampling frequency (daily, weekly)
    #[arg(long)]
    frequency: Option<Frequency>,

    /// Model (naive, snaive, holtwinters, arima, lightgbm, xgboost)
    #[arg(short, long)]
    model: Option<ModelKind>,

    /// Number of keyword series to forecast
    #[arg(long)]
    top_k_keywords: Option<usize>,

    /// Initial training window of the backtest
    #[arg(long)]
    min_train_size: Option<usize>,

    /// Maximum number of backtest folds
    #[arg(long)]
    cv_folds: Option<usize>,

    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file (defaults to output/forecast_<timestamp>.json)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn forecast_config(&self) -> Result<ForecastConfig> {
        let mut config = match &self.config {
            Some(path) => ForecastConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ForecastConfig::default(),
        };

        if let Some(horizon) = self.horizon {
            config.horizon = horizon;
        }
        if let Some(frequency) = self.frequency {
            config.frequency = frequency;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(top_k) = self.top_k_keywords {
            config.top_k_keywords = top_k;
        }
        if let Some(min_train) = self.min_train_size {
            config.min_train_size = min_train;
        }
        if let Some(folds) = self.cv_folds {
            config.cv_folds = folds;
        }
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { VERBOSE_LOG_FILTER } else { DEFAULT_LOG_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.forecast_config()?;
    let forecaster = Forecaster::new(config).context("Invalid forecast configuration")?;

    let bundle = DataLoader::from_json_file(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    info!(
        input = %cli.input.display(),
        query = %bundle.query,
        articles = bundle.articles.len(),
        "Loaded analyst bundle"
    );

    let generated_at = Utc::now();
    let report = forecaster
        .run_at(&bundle, generated_at)
        .context("Forecast run failed")?;

    let out = cli.out.clone().unwrap_or_else(|| {
        PathBuf::from("output").join(format!("forecast_{}.json", timestamp_slug(generated_at)))
    });
    report
        .write_to(&out)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    info!(
        output = %out.display(),
        series = report.meta.series_count,
        skipped = report.meta.skipped_series.len(),
        "Report written"
    );
    println!("{}", out.display());
    Ok(())
}
