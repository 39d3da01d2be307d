//! Descriptive statistics over plain slices

use crate::{MathError, Result};
use statrs::statistics::Statistics;

/// Arithmetic mean, error on empty input
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the mean of an empty series".to_string(),
        ));
    }
    Ok(values.iter().mean())
}

/// Population variance (divides by n)
pub fn population_variance(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the variance of an empty series".to_string(),
        ));
    }
    Ok(values.iter().population_variance())
}

/// Biased autocovariance for lags `0..=max_lag`, computed around the sample mean
pub fn autocovariance(values: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    let n = values.len();
    if n <= max_lag {
        return Err(MathError::InsufficientData(format!(
            "Autocovariance up to lag {} needs more than {} observations, have {}",
            max_lag, max_lag, n
        )));
    }

    let centre = mean(values)?;
    let centered: Vec<f64> = values.iter().map(|v| v - centre).collect();

    Ok((0..=max_lag)
        .map(|k| {
            let sum: f64 = (k..n).map(|i| centered[i] * centered[i - k]).sum();
            sum / n as f64
        })
        .collect())
}

/// Apply `order` rounds of first differencing
pub fn difference(values: &[f64], order: usize) -> Vec<f64> {
    let mut result = values.to_vec();
    for _ in 0..order {
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Root mean square of a slice, `None` when empty
pub fn root_mean_square(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let ms = values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64;
    Some(ms.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_variance() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&data).unwrap(), 5.0);
        assert_relative_eq!(population_variance(&data).unwrap(), 4.0);
        assert!(mean(&[]).is_err());
    }

    #[test]
    fn test_autocovariance_lag_zero_is_variance() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        let acov = autocovariance(&data, 2).unwrap();
        assert_eq!(acov.len(), 3);
        assert_relative_eq!(acov[0], population_variance(&data).unwrap());
        assert!(acov[1] < acov[0]);
    }

    #[test]
    fn test_autocovariance_rejects_short_series() {
        assert!(autocovariance(&[1.0, 2.0], 2).is_err());
    }

    #[test]
    fn test_difference_orders() {
        let data = [1.0, 4.0, 9.0, 16.0];
        assert_eq!(difference(&data, 0), data.to_vec());
        assert_eq!(difference(&data, 1), vec![3.0, 5.0, 7.0]);
        assert_eq!(difference(&data, 2), vec![2.0, 2.0]);
    }

    #[test]
    fn test_root_mean_square() {
        assert_eq!(root_mean_square(&[]), None);
        assert_relative_eq!(root_mean_square(&[3.0, 4.0]).unwrap(), 12.5_f64.sqrt());
    }
}
