//! Run configuration
//!
//! A [`ForecastConfig`] carries every knob of a run explicitly. It can be
//! built in code, read from a TOML file, or assembled from CLI flags on top
//! of either.

use crate::error::{ForecastError, Result};
use crate::models::{ModelKind, ModelParams};
use crate::series::Frequency;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration of one forecast run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Resampling frequency
    pub frequency: Frequency,
    /// Number of future periods to predict
    pub horizon: usize,
    /// Requested model for the primary series
    pub model: ModelKind,
    /// Number of keyword series to forecast (0 disables)
    pub top_k_keywords: usize,
    /// Initial training window of the backtest
    pub min_train_size: usize,
    /// Maximum number of backtest folds
    pub cv_folds: usize,
    /// Seasonal cycle length; defaults to the frequency's natural period
    pub seasonal_period: Option<usize>,
    /// Lag offsets for tree features
    pub lags: Vec<usize>,
    /// Trailing window sizes for rolling features
    pub rolling_windows: Vec<usize>,
    /// Keyword series with fewer total occurrences are skipped
    pub min_keyword_occurrences: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            frequency: Frequency::Daily,
            horizon: 14,
            model: ModelKind::LightGbm,
            top_k_keywords: 0,
            min_train_size: 30,
            cv_folds: 5,
            seasonal_period: None,
            lags: vec![1, 7, 14],
            rolling_windows: vec![7, 14, 28],
            min_keyword_occurrences: 2,
        }
    }
}

impl ForecastConfig {
    /// Read a configuration from a TOML file; missing keys take defaults
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ForecastConfig = toml::from_str(text)?;
        Ok(config)
    }

    /// Check the configuration for values no run could honour
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be a positive integer".to_string(),
            ));
        }
        if self.cv_folds == 0 {
            return Err(ForecastError::InvalidParameter(
                "cv_folds must be at least 1".to_string(),
            ));
        }
        if self.lags.is_empty() || self.lags.contains(&0) {
            return Err(ForecastError::InvalidParameter(
                "lags must be a non-empty list of positive offsets".to_string(),
            ));
        }
        if self.rolling_windows.is_empty() || self.rolling_windows.contains(&0) {
            return Err(ForecastError::InvalidParameter(
                "rolling_windows must be a non-empty list of positive sizes".to_string(),
            ));
        }
        if self.seasonal_period == Some(0) {
            return Err(ForecastError::InvalidParameter(
                "seasonal_period must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Seasonal cycle length in effect
    pub fn seasonal_period(&self) -> usize {
        self.seasonal_period
            .unwrap_or_else(|| self.frequency.seasonal_period())
    }

    /// Parameters handed to every model strategy
    pub fn model_params(&self) -> ModelParams {
        ModelParams {
            seasonal_period: self.seasonal_period(),
            lags: self.lags.clone(),
            rolling_windows: self.rolling_windows.clone(),
        }
    }
}
