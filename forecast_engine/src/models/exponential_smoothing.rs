//! Additive Holt-Winters exponential smoothing
//!
//! Level, trend and seasonal components are updated once per observation.
//! Smoothing constants are chosen from a fixed grid by minimising the
//! in-sample one-step squared error. With fewer than two full seasonal
//! cycles the model falls back to Holt's linear trend method.

use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel, TrainingSet};
use tracing::debug;

/// Candidate values for every smoothing constant
const SMOOTHING_GRID: [f64; 7] = [0.05, 0.1, 0.2, 0.3, 0.5, 0.7, 0.9];

/// Additive trend + additive seasonal exponential smoothing
#[derive(Debug, Clone)]
pub struct HoltWinters {
    /// Periods per seasonal cycle
    period: usize,
}

/// Trained Holt-Winters model
#[derive(Debug, Clone)]
pub struct TrainedHoltWinters {
    name: String,
    level: f64,
    trend: f64,
    /// Seasonal offsets indexed by absolute position modulo the period
    seasonal: Option<Vec<f64>>,
    /// Absolute index of the first forecast period
    origin: usize,
}

/// Smoothing constants and the error they achieved
#[derive(Debug, Clone, Copy)]
struct Fit {
    alpha: f64,
    beta: f64,
    gamma: f64,
    sse: f64,
}

/// Components after running the recursions over a history
#[derive(Debug, Clone)]
struct Components {
    level: f64,
    trend: f64,
    seasonal: Vec<f64>,
    sse: f64,
}

impl HoltWinters {
    /// Create a new Holt-Winters model with the given seasonal period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(ForecastError::InvalidParameter(
                "Seasonal period must be positive".to_string(),
            ));
        }
        Ok(Self { period })
    }

    /// Whether a history of `len` supports the seasonal form
    pub fn is_seasonal_for(&self, len: usize) -> bool {
        self.period >= 2 && len >= 2 * self.period
    }
}

/// Run the additive seasonal recursions
fn seasonal_components(data: &[f64], period: usize, alpha: f64, beta: f64, gamma: f64) -> Components {
    let first: f64 = data[..period].iter().sum::<f64>() / period as f64;
    let second: f64 = data[period..2 * period].iter().sum::<f64>() / period as f64;

    let mut level = first;
    let mut trend = (second - first) / period as f64;
    let mut seasonal: Vec<f64> = data[..period].iter().map(|v| v - first).collect();
    let mut sse = 0.0;

    for (t, &value) in data.iter().enumerate().skip(period) {
        let idx = t % period;
        let prev_level = level;
        let prev_seasonal = seasonal[idx];

        let error = value - (level + trend + prev_seasonal);
        sse += error * error;

        level = alpha * (value - prev_seasonal) + (1.0 - alpha) * (level + trend);
        trend = beta * (level - prev_level) + (1.0 - beta) * trend;
        seasonal[idx] = gamma * (value - level) + (1.0 - gamma) * prev_seasonal;
    }

    Components {
        level,
        trend,
        seasonal,
        sse,
    }
}

/// Run Holt's linear trend recursions
fn linear_components(data: &[f64], alpha: f64, beta: f64) -> Components {
    let mut level = data[0];
    let mut trend = data[1] - data[0];
    let mut sse = 0.0;

    for &value in &data[1..] {
        let prev_level = level;
        let error = value - (level + trend);
        sse += error * error;

        level = alpha * value + (1.0 - alpha) * (level + trend);
        trend = beta * (level - prev_level) + (1.0 - beta) * trend;
    }

    Components {
        level,
        trend,
        seasonal: Vec::new(),
        sse,
    }
}

/// Best constants on the grid; earlier grid points win ties
fn grid_search<F>(gammas: &[f64], run: F) -> Fit
where
    F: Fn(f64, f64, f64) -> f64,
{
    let mut best = Fit {
        alpha: SMOOTHING_GRID[0],
        beta: SMOOTHING_GRID[0],
        gamma: gammas[0],
        sse: f64::INFINITY,
    };

    for &alpha in &SMOOTHING_GRID {
        for &beta in &SMOOTHING_GRID {
            for &gamma in gammas {
                let sse = run(alpha, beta, gamma);
                if sse.is_finite() && sse < best.sse {
                    best = Fit {
                        alpha,
                        beta,
                        gamma,
                        sse,
                    };
                }
            }
        }
    }
    best
}

impl ForecastModel for HoltWinters {
    type Trained = TrainedHoltWinters;

    fn train(&self, data: &TrainingSet) -> Result<Self::Trained> {
        let values = data.values();
        let n = values.len();
        if n == 0 {
            return Err(ForecastError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        if n == 1 {
            return Ok(TrainedHoltWinters {
                name: "Holt (level only)".to_string(),
                level: values[0],
                trend: 0.0,
                seasonal: None,
                origin: n,
            });
        }

        if self.is_seasonal_for(n) {
            let fit = grid_search(&SMOOTHING_GRID, |a, b, g| {
                seasonal_components(values, self.period, a, b, g).sse
            });
            let components = seasonal_components(values, self.period, fit.alpha, fit.beta, fit.gamma);
            debug!(
                period = self.period,
                alpha = fit.alpha,
                beta = fit.beta,
                gamma = fit.gamma,
                sse = fit.sse,
                "Fitted seasonal Holt-Winters"
            );
            return Ok(TrainedHoltWinters {
                name: format!(
                    "Holt-Winters (alpha={}, beta={}, gamma={}, period={})",
                    fit.alpha, fit.beta, fit.gamma, self.period
                ),
                level: components.level,
                trend: components.trend,
                seasonal: Some(components.seasonal),
                origin: n,
            });
        }

        debug!(
            period = self.period,
            observations = n,
            "History shorter than two seasonal cycles; using trend-only smoothing"
        );
        let fit = grid_search(&[0.0], |a, b, _| linear_components(values, a, b).sse);
        let components = linear_components(values, fit.alpha, fit.beta);

        Ok(TrainedHoltWinters {
            name: format!("Holt (alpha={}, beta={})", fit.alpha, fit.beta),
            level: components.level,
            trend: components.trend,
            seasonal: None,
            origin: n,
        })
    }

    fn name(&self) -> &str {
        "holtwinters"
    }
}

impl TrainedHoltWinters {
    /// True when the seasonal component is in use
    pub fn is_seasonal(&self) -> bool {
        self.seasonal.is_some()
    }
}

impl TrainedForecastModel for TrainedHoltWinters {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let values = (1..=horizon)
            .map(|h| {
                let season = self.seasonal.as_ref().map_or(0.0, |s| {
                    s[(self.origin + h - 1) % s.len()]
                });
                self.level + h as f64 * self.trend + season
            })
            .collect();
        ForecastResult::new(values, horizon)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
