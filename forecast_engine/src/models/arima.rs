//! ARIMA models with automatic order selection
//!
//! The differencing order is chosen by the minimum-variance rule, then the
//! ARMA orders by AIC over a bounded grid. Pure AR fits use Yule-Walker;
//! mixed fits use the two-stage Hannan-Rissanen regression.

use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel, TrainingSet};
use series_math::autoregression::yule_walker;
use series_math::linalg::least_squares;
use series_math::statistics::{difference, mean, population_variance};
use tracing::debug;

/// Floor for the residual variance inside the AIC logarithm
const MIN_VARIANCE: f64 = 1e-12;

/// ARIMA model (AutoRegressive Integrated Moving Average) of fixed order
#[derive(Debug, Clone)]
pub struct ArimaModel {
    /// Name of the model
    name: String,
    /// AR order (p)
    p: usize,
    /// Differencing order (d)
    d: usize,
    /// MA order (q)
    q: usize,
}

/// Trained ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedArimaModel {
    name: String,
    p: usize,
    d: usize,
    q: usize,
    ar_coefficients: Vec<f64>,
    ma_coefficients: Vec<f64>,
    /// Mean of the differenced series
    mean: f64,
    /// Demeaned differenced history
    centered: Vec<f64>,
    /// One-step residuals aligned with `centered`
    residuals: Vec<f64>,
    /// Last value of the series differenced 0..d times
    tails: Vec<f64>,
    aic: f64,
}

/// ARMA coefficients estimated on a demeaned series
#[derive(Debug, Clone)]
struct ArmaFit {
    phi: Vec<f64>,
    theta: Vec<f64>,
    residuals: Vec<f64>,
    variance: f64,
    effective_len: usize,
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self {
            name: format!("ARIMA({},{},{})", p, d, q),
            p,
            d,
            q,
        }
    }

    /// Smallest differenced length this order is fitted on
    fn min_observations(&self) -> usize {
        if self.p + self.q == 0 {
            1
        } else {
            3 * (self.p + self.q) + 4
        }
    }
}

/// Residuals of an ARMA recursion; values before `start` are zero
fn arma_residuals(z: &[f64], phi: &[f64], theta: &[f64], start: usize) -> Vec<f64> {
    let mut residuals = vec![0.0; z.len()];
    for t in start..z.len() {
        let ar: f64 = phi.iter().enumerate().map(|(i, c)| c * z[t - 1 - i]).sum();
        let ma: f64 = theta
            .iter()
            .enumerate()
            .filter(|(j, _)| t > *j)
            .map(|(j, c)| c * residuals[t - 1 - j])
            .sum();
        residuals[t] = z[t] - ar - ma;
    }
    residuals
}

/// Fit ARMA(p, q) to a demeaned series
fn fit_arma(z: &[f64], p: usize, q: usize) -> Result<ArmaFit> {
    let m = z.len();

    let (phi, theta) = if q == 0 {
        (yule_walker(z, p)?.coefficients, Vec::new())
    } else {
        // Stage one: long autoregression to estimate the innovations
        let long = (p + q + 3).min(m.saturating_sub(1) / 2);
        if long < p.max(q) + 1 {
            return Err(ForecastError::InsufficientData {
                required: 2 * (p.max(q) + 1) + 1,
                actual: m,
            });
        }
        let long_fit = yule_walker(z, long)?;
        let innovations = arma_residuals(z, &long_fit.coefficients, &[], long);

        // Stage two: regress on lagged values and lagged innovations
        let first = long + q;
        let mut rows = Vec::with_capacity(m.saturating_sub(first));
        let mut targets = Vec::with_capacity(m.saturating_sub(first));
        for t in first..m {
            let mut row: Vec<f64> = (1..=p).map(|i| z[t - i]).collect();
            row.extend((1..=q).map(|j| innovations[t - j]));
            rows.push(row);
            targets.push(z[t]);
        }
        if rows.len() < p + q + 2 {
            return Err(ForecastError::InsufficientData {
                required: first + p + q + 2,
                actual: m,
            });
        }

        let beta = least_squares(&rows, &targets, 1e-8)?;
        let (phi, theta) = beta.split_at(p);
        (phi.to_vec(), theta.to_vec())
    };

    // Crude stability guard for the mixed fits
    if q > 0
        && (phi.iter().map(|c| c.abs()).sum::<f64>() >= 1.0
            || theta.iter().map(|c| c.abs()).sum::<f64>() >= 1.0)
    {
        return Err(ForecastError::ValidationError(format!(
            "ARMA({},{}) estimate is not stable",
            p, q
        )));
    }

    let residuals = arma_residuals(z, &phi, &theta, p);
    let scored = &residuals[p..];
    let effective_len = scored.len();
    let variance = scored.iter().map(|e| e * e).sum::<f64>() / effective_len.max(1) as f64;
    if !variance.is_finite() {
        return Err(ForecastError::ValidationError(format!(
            "ARMA({},{}) residuals diverged",
            p, q
        )));
    }

    Ok(ArmaFit {
        phi,
        theta,
        residuals,
        variance,
        effective_len,
    })
}

impl ForecastModel for ArimaModel {
    type Trained = TrainedArimaModel;

    fn train(&self, data: &TrainingSet) -> Result<TrainedArimaModel> {
        let values = data.values();
        if values.len() <= self.d {
            return Err(ForecastError::InsufficientData {
                required: self.d + 1,
                actual: values.len(),
            });
        }

        let tails: Vec<f64> = (0..self.d)
            .map(|k| {
                let diffed = difference(values, k);
                diffed[diffed.len() - 1]
            })
            .collect();
        let differenced = difference(values, self.d);
        if differenced.len() < self.min_observations() {
            return Err(ForecastError::InsufficientData {
                required: self.min_observations() + self.d,
                actual: values.len(),
            });
        }

        let centre = mean(&differenced)?;
        let centered: Vec<f64> = differenced.iter().map(|v| v - centre).collect();
        let fit = fit_arma(&centered, self.p, self.q)?;

        let k = (self.p + self.q + 1) as f64;
        let aic = fit.effective_len as f64 * fit.variance.max(MIN_VARIANCE).ln() + 2.0 * k;

        Ok(TrainedArimaModel {
            name: self.name.clone(),
            p: self.p,
            d: self.d,
            q: self.q,
            ar_coefficients: fit.phi,
            ma_coefficients: fit.theta,
            mean: centre,
            centered,
            residuals: fit.residuals,
            tails,
            aic,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedArimaModel {
    /// Selected `(p, d, q)`
    pub fn order(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }
}

impl TrainedForecastModel for TrainedArimaModel {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let mut z = self.centered.clone();
        let mut e = self.residuals.clone();

        let mut differenced = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let t = z.len();
            let ar: f64 = self
                .ar_coefficients
                .iter()
                .enumerate()
                .filter(|(i, _)| t > *i)
                .map(|(i, c)| c * z[t - 1 - i])
                .sum();
            let ma: f64 = self
                .ma_coefficients
                .iter()
                .enumerate()
                .filter(|(j, _)| t > *j)
                .map(|(j, c)| c * e[t - 1 - j])
                .sum();
            let next = ar + ma;
            z.push(next);
            e.push(0.0);
            differenced.push(next + self.mean);
        }

        // Undo the differencing, innermost level first
        let mut values = differenced;
        for &tail in self.tails.iter().rev() {
            let mut last = tail;
            values = values
                .into_iter()
                .map(|step| {
                    last += step;
                    last
                })
                .collect();
        }

        ForecastResult::new(values, horizon)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// ARIMA with automatic order selection
#[derive(Debug, Clone)]
pub struct AutoArima {
    max_p: usize,
    max_d: usize,
    max_q: usize,
}

impl Default for AutoArima {
    fn default() -> Self {
        Self {
            max_p: 3,
            max_d: 2,
            max_q: 2,
        }
    }
}

impl AutoArima {
    /// Create an order search over `0..=max_p`, `0..=max_d`, `0..=max_q`
    pub fn new(max_p: usize, max_d: usize, max_q: usize) -> Self {
        Self { max_p, max_d, max_q }
    }

    /// Differencing order whose result has the smallest variance
    pub fn select_differencing(&self, values: &[f64]) -> Result<usize> {
        let mut best = (0, population_variance(values)?);
        for d in 1..=self.max_d {
            if values.len() < d + 3 {
                break;
            }
            let variance = population_variance(&difference(values, d))?;
            if variance < best.1 {
                best = (d, variance);
            }
        }
        Ok(best.0)
    }
}

impl ForecastModel for AutoArima {
    type Trained = TrainedArimaModel;

    fn train(&self, data: &TrainingSet) -> Result<TrainedArimaModel> {
        let d = self.select_differencing(data.values())?;

        let mut best: Option<TrainedArimaModel> = None;
        for p in 0..=self.max_p {
            for q in 0..=self.max_q {
                match ArimaModel::new(p, d, q).train(data) {
                    Ok(candidate) => {
                        if best.as_ref().map_or(true, |b| candidate.aic < b.aic) {
                            best = Some(candidate);
                        }
                    }
                    Err(err) => debug!(p, d, q, %err, "Skipping ARIMA candidate"),
                }
            }
        }

        let chosen = best.ok_or_else(|| {
            ForecastError::ValidationError("No ARIMA order could be fitted".to_string())
        })?;
        debug!(order = ?chosen.order(), aic = chosen.aic, "Selected ARIMA order");
        Ok(chosen)
    }

    fn name(&self) -> &str {
        "arima"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{Frequency, RegularSeries};
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn training(values: Vec<f64>) -> TrainingSet {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        TrainingSet::new(RegularSeries::new("y", Frequency::Daily, start, values).unwrap())
    }

    #[test]
    fn test_linear_trend_selects_first_difference() {
        let values: Vec<f64> = (0..40).map(|i| 5.0 + 3.0 * i as f64).collect();
        let auto = AutoArima::default();
        assert_eq!(auto.select_differencing(&values).unwrap(), 1);

        let trained = auto.train(&training(values)).unwrap();
        let forecast = trained.forecast(3).unwrap();
        assert_abs_diff_eq!(forecast.values()[0], 125.0, epsilon = 1e-6);
        assert_abs_diff_eq!(forecast.values()[2], 131.0, epsilon = 1e-6);
    }

    #[test]
    fn test_stationary_noise_keeps_level() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let values: Vec<f64> = (0..200).map(|_| 50.0 + noise.sample(&mut rng)).collect();

        let trained = AutoArima::default().train(&training(values)).unwrap();
        assert_eq!(trained.order().1, 0);

        let forecast = trained.forecast(10).unwrap();
        for value in forecast.values() {
            assert!((value - 50.0).abs() < 2.0, "forecast {} drifted", value);
        }
    }

    #[test]
    fn test_ar1_order_is_found() {
        let mut rng = StdRng::seed_from_u64(11);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut values = vec![0.0];
        for t in 1..300 {
            let next = 0.7 * values[t - 1] + noise.sample(&mut rng);
            values.push(next);
        }

        let trained = ArimaModel::new(1, 0, 0).train(&training(values)).unwrap();
        assert_abs_diff_eq!(trained.ar_coefficients()[0], 0.7, epsilon = 0.1);
    }

    #[test]
    fn test_mixed_order_fit_scores_residuals() {
        let mut rng = StdRng::seed_from_u64(23);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut values = vec![0.0];
        let mut previous_shock = 0.0;
        for t in 1..400 {
            let shock = noise.sample(&mut rng);
            values.push(0.5 * values[t - 1] + shock + 0.3 * previous_shock);
            previous_shock = shock;
        }

        let trained = ArimaModel::new(1, 0, 1).train(&training(values)).unwrap();
        assert_eq!(trained.order(), (1, 0, 1));
        assert_eq!(trained.ma_coefficients().len(), 1);
        assert_abs_diff_eq!(trained.ar_coefficients()[0], 0.5, epsilon = 0.2);

        // 399 scored residuals with unit-variance shocks, three parameters
        let aic = trained.aic();
        assert!(aic.is_finite());
        assert!(aic > 399.0 * 0.5_f64.ln() && aic < 399.0 * 1.5_f64.ln() + 6.0, "aic {}", aic);
        assert_eq!(trained.forecast(4).unwrap().values().len(), 4);
    }

    #[test]
    fn test_tiny_series_still_forecasts() {
        let trained = AutoArima::default().train(&training(vec![4.0, 6.0])).unwrap();
        let forecast = trained.forecast(2).unwrap();
        assert_eq!(forecast.values().len(), 2);
    }

    #[test]
    fn test_fixed_order_needs_data() {
        let result = ArimaModel::new(3, 0, 2).train(&training(vec![1.0; 6]));
        assert!(matches!(result, Err(ForecastError::InsufficientData { .. })));
    }
}
