//! Autoregressive coefficient estimation
//!
//! Yule-Walker equations solved with the Levinson-Durbin recursion.

use crate::statistics::autocovariance;
use crate::{MathError, Result};

/// Fitted AR coefficients together with the innovation variance
#[derive(Debug, Clone, PartialEq)]
pub struct ArEstimate {
    /// `phi[0]` multiplies the most recent value
    pub coefficients: Vec<f64>,
    /// Variance of the one-step prediction error
    pub innovation_variance: f64,
}

/// Solve the Yule-Walker system for `order` coefficients from autocovariances
pub fn levinson_durbin(acov: &[f64], order: usize) -> Result<ArEstimate> {
    if acov.len() <= order {
        return Err(MathError::InsufficientData(format!(
            "Order {} needs {} autocovariances, have {}",
            order,
            order + 1,
            acov.len()
        )));
    }

    let mut phi = vec![0.0; order];
    let mut error = acov[0];
    if error.abs() < 1e-12 {
        // constant series
        return Ok(ArEstimate {
            coefficients: phi,
            innovation_variance: 0.0,
        });
    }

    for k in 1..=order {
        let mut acc = acov[k];
        for j in 1..k {
            acc -= phi[j - 1] * acov[k - j];
        }
        let kappa = acc / error;

        let previous = phi.clone();
        phi[k - 1] = kappa;
        for j in 1..k {
            phi[j - 1] = previous[j - 1] - kappa * previous[k - j - 1];
        }

        error *= 1.0 - kappa * kappa;
        if error <= 0.0 {
            return Err(MathError::CalculationError(format!(
                "Levinson-Durbin recursion became singular at order {}",
                k
            )));
        }
    }

    Ok(ArEstimate {
        coefficients: phi,
        innovation_variance: error,
    })
}

/// Estimate an AR(`order`) model from raw observations
pub fn yule_walker(values: &[f64], order: usize) -> Result<ArEstimate> {
    if order == 0 {
        return Ok(ArEstimate {
            coefficients: Vec::new(),
            innovation_variance: autocovariance(values, 0)?[0],
        });
    }
    let acov = autocovariance(values, order)?;
    levinson_durbin(&acov, order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_ar1_recovers_coefficient() {
        // x_t = 0.6 x_{t-1} + e_t, noise from a 64-bit LCG
        let mut state: u64 = 42;
        let mut series = vec![0.0];
        for i in 1..400 {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let noise = (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5;
            let next = 0.6 * series[i - 1] + noise;
            series.push(next);
        }

        let estimate = yule_walker(&series, 1).unwrap();
        assert_eq!(estimate.coefficients.len(), 1);
        assert_abs_diff_eq!(estimate.coefficients[0], 0.6, epsilon = 0.15);
        assert!(estimate.innovation_variance > 0.0);
    }

    #[test]
    fn test_constant_series_yields_zero_coefficients() {
        let estimate = yule_walker(&[3.0; 20], 2).unwrap();
        assert_eq!(estimate.coefficients, vec![0.0, 0.0]);
        assert_eq!(estimate.innovation_variance, 0.0);
    }

    #[test]
    fn test_order_zero_is_plain_variance() {
        let estimate = yule_walker(&[1.0, 3.0], 0).unwrap();
        assert!(estimate.coefficients.is_empty());
        assert_abs_diff_eq!(estimate.innovation_variance, 1.0);
    }

    #[test]
    fn test_too_few_autocovariances() {
        assert!(levinson_durbin(&[1.0, 0.5], 2).is_err());
    }
}
