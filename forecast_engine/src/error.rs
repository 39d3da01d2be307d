//! Error types for the forecast_engine crate

use polars::prelude::PolarsError;
use series_math::MathError;
use thiserror::Error;

/// Custom error types for the forecast_engine crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// No input record carried a resolvable timestamp
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Model name outside the supported set
    #[error("Unsupported model '{0}' (expected one of: naive, snaive, holtwinters, arima, lightgbm, xgboost)")]
    UnsupportedModel(String),

    /// A numeric backend the requested model depends on is not available
    #[error("Model '{model}' is unavailable: {reason}")]
    ModelUnavailable { model: String, reason: String },

    /// Series too short for the requested computation
    #[error("Insufficient data: need {required} observations, have {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error related to data validation or processing
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from numeric kernels
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON input or output
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed configuration file
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::Polars(err.to_string())
    }
}
