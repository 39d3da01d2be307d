//! Rolling-origin cross-validation
//!
//! Each fold trains on a growing prefix and scores a `horizon`-step forecast
//! against the values that follow it. The origin advances by `horizon`
//! between folds, starting at the minimum training size.

use crate::error::Result;
use crate::metrics::{forecast_accuracy, CvMetrics, ForecastAccuracy};
use crate::models::{ModelKind, ModelParams, TrainingSet};
use crate::utils::train_test_split;
use tracing::debug;

/// Score of one backtest fold
#[derive(Debug, Clone, PartialEq)]
pub struct FoldScore {
    /// Length of the training prefix
    pub train_len: usize,
    pub accuracy: ForecastAccuracy,
}

/// Outcome of a backtest
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestReport {
    pub folds: Vec<FoldScore>,
    pub metrics: CvMetrics,
}

/// Rolling-origin backtester
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backtester {
    min_train_size: usize,
    max_folds: usize,
}

impl Backtester {
    /// Both arguments are raised to at least one
    pub fn new(min_train_size: usize, max_folds: usize) -> Self {
        Self {
            min_train_size: min_train_size.max(1),
            max_folds: max_folds.max(1),
        }
    }

    pub fn min_train_size(&self) -> usize {
        self.min_train_size
    }

    pub fn max_folds(&self) -> usize {
        self.max_folds
    }

    /// Whether a series of `len` periods admits at least one fold
    pub fn can_run(&self, len: usize, horizon: usize) -> bool {
        horizon > 0 && self.min_train_size + horizon <= len
    }

    /// Backtest `model` on `data`; undefined metrics when no fold fits
    pub fn evaluate(
        &self,
        data: &TrainingSet,
        horizon: usize,
        model: ModelKind,
        params: &ModelParams,
    ) -> Result<BacktestReport> {
        let values = data.values();
        let mut folds = Vec::new();
        let mut fold_start = self.min_train_size;

        while horizon > 0 && folds.len() < self.max_folds {
            let Some((_, actual)) = train_test_split(values, fold_start, horizon) else {
                break;
            };

            let train = data.head(fold_start)?;
            let forecast = model.fit_predict(&train, horizon, params)?;
            let accuracy = forecast_accuracy(forecast.values(), actual)?;
            debug!(
                series = data.target().name(),
                %model,
                fold = folds.len(),
                train_len = fold_start,
                smape = accuracy.smape,
                rmse = accuracy.rmse,
                "Backtest fold scored"
            );

            folds.push(FoldScore {
                train_len: fold_start,
                accuracy,
            });
            fold_start += horizon;
        }

        let metrics = CvMetrics::from_folds(
            &folds.iter().map(|f| f.accuracy).collect::<Vec<_>>(),
        );
        Ok(BacktestReport { folds, metrics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{Frequency, RegularSeries};
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn training(values: Vec<f64>) -> TrainingSet {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        TrainingSet::new(RegularSeries::new("y", Frequency::Daily, start, values).unwrap())
    }

    #[test]
    fn test_fold_origins_advance_by_horizon() {
        let data = training((0..20).map(|i| i as f64).collect());
        let report = Backtester::new(5, 10)
            .evaluate(&data, 4, ModelKind::Naive, &ModelParams::default())
            .unwrap();

        let origins: Vec<usize> = report.folds.iter().map(|f| f.train_len).collect();
        assert_eq!(origins, vec![5, 9, 13]);
    }

    #[test]
    fn test_fold_count_is_capped() {
        let data = training((0..100).map(|i| i as f64).collect());
        let report = Backtester::new(10, 2)
            .evaluate(&data, 5, ModelKind::Naive, &ModelParams::default())
            .unwrap();
        assert_eq!(report.folds.len(), 2);
        assert_eq!(report.folds[1].train_len, 15);
    }

    #[test]
    fn test_naive_on_constant_series_scores_zero() {
        let data = training(vec![4.0; 40]);
        let report = Backtester::new(30, 5)
            .evaluate(&data, 7, ModelKind::Naive, &ModelParams::default())
            .unwrap();

        assert_eq!(report.folds.len(), 1);
        assert_abs_diff_eq!(report.metrics.smape.unwrap(), 0.0);
        assert_abs_diff_eq!(report.metrics.rmse.unwrap(), 0.0);
    }

    #[test]
    fn test_short_series_has_undefined_metrics() {
        let data = training(vec![1.0; 25]);
        let backtester = Backtester::new(30, 5);
        assert!(!backtester.can_run(25, 7));

        let report = backtester
            .evaluate(&data, 7, ModelKind::Naive, &ModelParams::default())
            .unwrap();
        assert!(report.folds.is_empty());
        assert_eq!(report.metrics, CvMetrics::undefined());
    }

    #[test]
    fn test_series_no_longer_than_horizon_is_undefined() {
        let data = training(vec![1.0; 7]);
        let report = Backtester::new(1, 5)
            .evaluate(&data, 7, ModelKind::Naive, &ModelParams::default())
            .unwrap();
        assert!(report.metrics.smape.is_none());
    }
}
