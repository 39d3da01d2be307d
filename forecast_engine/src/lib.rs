//! # Forecast Engine
//!
//! Turns an irregular stream of dated, keyword-tagged articles into regular
//! time series and forecasts them over a fixed horizon, with a
//! cross-validated confidence label per series.
//!
//! ## Features
//!
//! - Series building: daily or weekly (weeks ending Sunday) resampling with
//!   gap filling, top-K keyword count series and auxiliary score means
//! - Feature derivation: lags, shifted rolling statistics and calendar
//!   columns with no lookahead
//! - Forecasting models: naive, seasonal naive, Holt-Winters, ARIMA
//!   (behind the `arima` feature) and two gradient-boosted tree engines
//! - Rolling-origin backtesting scored with SMAPE and RMSE
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use forecast_engine::{DataLoader, ForecastConfig, Forecaster, ModelKind};
//!
//! let bundle = DataLoader::from_json_file("analysis.json")?;
//! let config = ForecastConfig {
//!     model: ModelKind::HoltWinters,
//!     horizon: 7,
//!     top_k_keywords: 3,
//!     ..Default::default()
//! };
//!
//! let report = Forecaster::new(config)?.run(&bundle)?;
//! for series in &report.forecasts {
//!     println!("{} ({}): {} points", series.series, series.confidence, series.forecasts.len());
//! }
//! # Ok::<(), forecast_engine::ForecastError>(())
//! ```

pub mod backtest;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod forecaster;
pub mod metrics;
pub mod models;
pub mod output;
pub mod series;
pub mod utils;

// Re-export commonly used types
pub use crate::backtest::{BacktestReport, Backtester};
pub use crate::config::ForecastConfig;
pub use crate::data::{AnalystBundle, Article, DataLoader, Record};
pub use crate::error::{ForecastError, Result};
pub use crate::features::{FeatureDeriver, FeatureFrame};
pub use crate::forecaster::Forecaster;
pub use crate::metrics::CvMetrics;
pub use crate::models::{ForecastModel, ForecastResult, ModelKind, ModelParams, TrainingSet};
pub use crate::output::{Confidence, ForecastPoint, ForecastReport, SeriesForecast};
pub use crate::series::{Frequency, RegularSeries, SeriesBuilder, SeriesSet};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
