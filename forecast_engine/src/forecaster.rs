//! Forecast orchestration
//!
//! The [`Forecaster`] runs one configuration over one input snapshot: it
//! builds the regular series, decides per series which strategy is viable,
//! backtests for a confidence label, forecasts, and assembles the report.
//! Keyword series are independent and processed in parallel; the report
//! keeps their ranking order.

use crate::backtest::Backtester;
use crate::config::ForecastConfig;
use crate::data::{AnalystBundle, Record};
use crate::error::Result;
use crate::metrics::CvMetrics;
use crate::models::{ModelKind, ModelParams, TrainingSet};
use crate::output::{Confidence, FallbackRecord, ForecastPoint, ForecastReport, RunMeta, SeriesForecast};
use crate::series::{KeywordSeries, RegularSeries, SeriesBuilder, SeriesSet};
use crate::utils::future_periods;
use chrono::{DateTime, SecondsFormat, Utc};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Keyword series with at most this many nonzero periods are too sparse for trees
const MAX_SPARSE_NONZERO_PERIODS: usize = 4;

/// Reason recorded when a keyword series is too short or sparse for trees
const SHORT_HISTORY_REASON: &str = "short_or_sparse_history";

/// What happened to one keyword series
#[derive(Debug)]
enum KeywordOutcome {
    Skipped(String),
    Forecast {
        forecast: SeriesForecast,
        fallback: Option<FallbackRecord>,
    },
}

/// Runs forecasts for a validated configuration
#[derive(Debug, Clone)]
pub struct Forecaster {
    config: ForecastConfig,
    params: ModelParams,
    backtester: Backtester,
}

impl Forecaster {
    /// Validate the configuration and check the model backend is available
    pub fn new(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        config.model.ensure_available()?;

        Ok(Self {
            params: config.model_params(),
            backtester: Backtester::new(config.min_train_size, config.cv_folds),
            config,
        })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast an analyst bundle, stamping the report with the current time
    pub fn run(&self, bundle: &AnalystBundle) -> Result<ForecastReport> {
        self.run_at(bundle, Utc::now())
    }

    /// Forecast an analyst bundle with an explicit generation time
    pub fn run_at(&self, bundle: &AnalystBundle, generated_at: DateTime<Utc>) -> Result<ForecastReport> {
        let records = bundle.to_records()?;
        self.run_records(&records, &bundle.query, generated_at)
    }

    /// Forecast pre-built records
    pub fn run_records(
        &self,
        records: &[Record],
        query: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<ForecastReport> {
        let set = SeriesBuilder::new(self.config.frequency, self.config.top_k_keywords)
            .build(records)?;
        if set.dropped_records > 0 {
            warn!(
                skipped_articles = set.dropped_records,
                "Skipped articles without a resolvable date"
            );
        }

        let (primary, cv_metrics, primary_fallback) = self.forecast_primary(&set)?;

        let outcomes = set
            .keywords
            .par_iter()
            .map(|keyword| self.forecast_keyword(keyword))
            .collect::<Result<Vec<_>>>()?;

        let mut forecasts = vec![primary];
        let mut fallbacks: Vec<FallbackRecord> = primary_fallback.into_iter().collect();
        let mut skipped_series = Vec::new();
        for outcome in outcomes {
            match outcome {
                KeywordOutcome::Skipped(name) => skipped_series.push(name),
                KeywordOutcome::Forecast { forecast, fallback } => {
                    forecasts.push(forecast);
                    fallbacks.extend(fallback);
                }
            }
        }

        info!(
            model = %self.config.model,
            series = forecasts.len(),
            skipped = skipped_series.len(),
            fallbacks = fallbacks.len(),
            "Forecast run complete"
        );

        Ok(ForecastReport {
            meta: RunMeta {
                model: self.config.model.to_string(),
                horizon: self.config.horizon,
                frequency: self.config.frequency.to_string(),
                generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                series_count: forecasts.len(),
                skipped_series,
                skipped_articles: set.dropped_records,
                query: query.to_string(),
                fallbacks,
            },
            forecasts,
            cv_metrics,
            top_features: Vec::new(),
        })
    }

    /// The primary series always uses the requested model and is always backtested
    fn forecast_primary(
        &self,
        set: &SeriesSet,
    ) -> Result<(SeriesForecast, CvMetrics, Option<FallbackRecord>)> {
        let model = self.config.model;
        let data = if model.is_tree_based() {
            let mut exogenous: Vec<RegularSeries> =
                set.keywords.iter().map(|k| k.series.clone()).collect();
            exogenous.extend(set.auxiliary.iter().cloned());
            TrainingSet::with_exogenous(set.primary.clone(), exogenous)?
        } else {
            TrainingSet::new(set.primary.clone())
        };

        let report = self
            .backtester
            .evaluate(&data, self.config.horizon, model, &self.params)?;
        let confidence = Confidence::from_smape(report.metrics.smape);
        info!(
            series = set.primary.name(),
            %model,
            folds = report.folds.len(),
            smape = ?report.metrics.smape,
            %confidence,
            "Primary series backtested"
        );

        let (forecast, fallback) = self.fit_series(&data, model, confidence)?;
        Ok((forecast, report.metrics, fallback))
    }

    fn forecast_keyword(&self, keyword: &KeywordSeries) -> Result<KeywordOutcome> {
        let series = &keyword.series;
        let total = series.total();
        if total < self.config.min_keyword_occurrences as f64 {
            warn!(
                series = series.name(),
                keyword = %keyword.keyword,
                total,
                "Skipping keyword series with too few occurrences"
            );
            return Ok(KeywordOutcome::Skipped(series.name().to_string()));
        }

        let requested = self.config.model;
        let data = TrainingSet::new(series.clone());

        let too_thin_for_trees = requested.is_tree_based()
            && (series.len() < self.config.frequency.min_tree_history()
                || series.nonzero_periods() <= MAX_SPARSE_NONZERO_PERIODS);

        if too_thin_for_trees {
            warn!(
                series = series.name(),
                periods = series.len(),
                nonzero = series.nonzero_periods(),
                requested = %requested,
                "Falling back to holtwinters for a short or sparse keyword series"
            );
            let (forecast, _) = self.fit_series(&data, ModelKind::HoltWinters, Confidence::Low)?;
            return Ok(KeywordOutcome::Forecast {
                forecast,
                fallback: Some(FallbackRecord {
                    series: series.name().to_string(),
                    requested: requested.to_string(),
                    used: ModelKind::HoltWinters.to_string(),
                    reason: SHORT_HISTORY_REASON.to_string(),
                }),
            });
        }

        let confidence = if self.backtester.can_run(series.len(), self.config.horizon) {
            let report = self
                .backtester
                .evaluate(&data, self.config.horizon, requested, &self.params)?;
            Confidence::from_smape(report.metrics.smape)
        } else {
            debug!(
                series = series.name(),
                periods = series.len(),
                "Keyword series too short to backtest"
            );
            Confidence::from_smape(None)
        };

        let (forecast, fallback) = self.fit_series(&data, requested, confidence)?;
        Ok(KeywordOutcome::Forecast { forecast, fallback })
    }

    /// Fit on the whole history and label the future periods
    fn fit_series(
        &self,
        data: &TrainingSet,
        model: ModelKind,
        confidence: Confidence,
    ) -> Result<(SeriesForecast, Option<FallbackRecord>)> {
        let result = model.fit_predict(data, self.config.horizon, &self.params)?;
        let series = data.target();

        let fallback = result.note().map(|note| {
            warn!(
                series = series.name(),
                %model,
                reason = note.reason(),
                "Model repeated the last value"
            );
            FallbackRecord {
                series: series.name().to_string(),
                requested: model.to_string(),
                used: ModelKind::Naive.to_string(),
                reason: note.reason().to_string(),
            }
        });

        let periods = future_periods(series.last_period(), self.config.horizon, self.config.frequency);
        let forecasts = periods
            .into_iter()
            .zip(result.values())
            .map(|(date, &prediction)| ForecastPoint { date, prediction })
            .collect();

        Ok((
            SeriesForecast {
                series: series.name().to_string(),
                model: model.to_string(),
                confidence,
                forecasts,
            },
            fallback,
        ))
    }
}
