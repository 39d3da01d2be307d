//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Denominator substituted when both actual and forecast are zero
pub const SMAPE_EPSILON: f64 = 1e-8;

fn check_lengths(forecast: &[f64], actual: &[f64]) -> Result<()> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::ValidationError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }
    Ok(())
}

/// Symmetric mean absolute percentage error on a 0-200 percent scale
pub fn smape(forecast: &[f64], actual: &[f64]) -> Result<f64> {
    check_lengths(forecast, actual)?;
    let total: f64 = actual
        .iter()
        .zip(forecast)
        .map(|(&a, &f)| {
            let denominator = a.abs() + f.abs();
            let denominator = if denominator == 0.0 {
                SMAPE_EPSILON
            } else {
                denominator
            };
            200.0 * (a - f).abs() / denominator
        })
        .sum();
    Ok(total / forecast.len() as f64)
}

/// Root mean squared error
pub fn rmse(forecast: &[f64], actual: &[f64]) -> Result<f64> {
    check_lengths(forecast, actual)?;
    let mse = actual
        .iter()
        .zip(forecast)
        .map(|(a, f)| (a - f).powi(2))
        .sum::<f64>()
        / forecast.len() as f64;
    Ok(mse.sqrt())
}

/// Calculate accuracy metrics for a forecast vs actual values
pub fn forecast_accuracy(forecast: &[f64], actual: &[f64]) -> Result<ForecastAccuracy> {
    check_lengths(forecast, actual)?;
    let mae = actual
        .iter()
        .zip(forecast)
        .map(|(a, f)| (a - f).abs())
        .sum::<f64>()
        / forecast.len() as f64;

    Ok(ForecastAccuracy {
        mae,
        rmse: rmse(forecast, actual)?,
        smape: smape(forecast, actual)?,
    })
}

/// Forecast accuracy metrics of one fold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
}

impl fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAE {:.4}, RMSE {:.4}, SMAPE {:.2}%",
            self.mae, self.rmse, self.smape
        )
    }
}

/// Cross-validated error statistics; `None` when no fold could run
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CvMetrics {
    pub smape: Option<f64>,
    pub rmse: Option<f64>,
}

impl CvMetrics {
    /// Metrics of a backtest that could not run a single fold
    pub fn undefined() -> Self {
        Self::default()
    }

    /// Per-metric arithmetic mean over folds
    pub fn from_folds(folds: &[ForecastAccuracy]) -> Self {
        if folds.is_empty() {
            return Self::undefined();
        }
        let n = folds.len() as f64;
        Self {
            smape: Some(folds.iter().map(|f| f.smape).sum::<f64>() / n),
            rmse: Some(folds.iter().map(|f| f.rmse).sum::<f64>() / n),
        }
    }

    pub fn is_defined(&self) -> bool {
        self.smape.is_some()
    }
}
