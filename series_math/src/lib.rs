//! # Series Math
//!
//! Numeric kernels shared by the forecasting engine.
//! Everything here works on plain `f64` slices ordered oldest first.
//!
//! - [`rolling`]: trailing window statistics over a series shifted by one period
//! - [`statistics`]: descriptive statistics and autocovariance
//! - [`autoregression`]: Yule-Walker / Levinson-Durbin AR estimation
//! - [`linalg`]: small dense least-squares solves

use thiserror::Error;

pub mod autoregression;
pub mod linalg;
pub mod rolling;
pub mod statistics;

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;
