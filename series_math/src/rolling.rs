//! Trailing window statistics
//!
//! All helpers here are "shifted": the value reported for index `t` only
//! looks at observations strictly before `t`. A mean needs one prior
//! observation, a sample standard deviation needs two.

use crate::{MathError, Result};
use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Fixed-capacity window over the most recent observations
#[derive(Debug, Clone)]
pub struct TrailingWindow {
    period: usize,
    values: VecDeque<f64>,
}

impl TrailingWindow {
    /// Create a new window holding at most `period` values
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Window period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
        })
    }

    /// Push a new observation, evicting the oldest once full
    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        if self.values.len() > self.period {
            self.values.pop_front();
        }
    }

    /// Mean of the values currently held, if any
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().mean())
    }

    /// Sample standard deviation (n - 1), defined from two values on
    pub fn std_dev(&self) -> Option<f64> {
        if self.values.len() < 2 {
            return None;
        }
        Some(self.values.iter().std_dev())
    }

    /// Number of values currently held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the window holds no values yet
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Configured capacity
    pub fn period(&self) -> usize {
        self.period
    }
}

/// Value `lag` periods earlier, `None` for the first `lag` positions
pub fn lagged(values: &[f64], lag: usize) -> Result<Vec<Option<f64>>> {
    if lag == 0 {
        return Err(MathError::InvalidInput(
            "Lag must be greater than zero".to_string(),
        ));
    }

    Ok((0..values.len())
        .map(|t| t.checked_sub(lag).map(|i| values[i]))
        .collect())
}

/// Trailing mean over the `window` values before each index
pub fn shifted_rolling_mean(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    let mut trailing = TrailingWindow::new(window)?;
    let mut out = Vec::with_capacity(values.len());
    for &value in values {
        out.push(trailing.mean());
        trailing.push(value);
    }
    Ok(out)
}

/// Trailing sample standard deviation over the `window` values before each index
pub fn shifted_rolling_std(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    let mut trailing = TrailingWindow::new(window)?;
    let mut out = Vec::with_capacity(values.len());
    for &value in values {
        out.push(trailing.std_dev());
        trailing.push(value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_trailing_window_evicts_oldest() {
        let mut window = TrailingWindow::new(3).unwrap();
        assert!(window.mean().is_none());

        for v in [2.0, 4.0, 6.0, 8.0] {
            window.push(v);
        }

        assert_eq!(window.len(), 3);
        assert_relative_eq!(window.mean().unwrap(), 6.0);
        assert_relative_eq!(window.std_dev().unwrap(), 2.0);
    }

    #[test]
    fn test_zero_period_rejected() {
        assert!(TrailingWindow::new(0).is_err());
        assert!(lagged(&[1.0], 0).is_err());
    }

    #[test]
    fn test_lagged_leaves_leading_gaps() {
        let lags = lagged(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
        assert_eq!(lags, vec![None, None, Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_shifted_mean_excludes_current_value() {
        let means = shifted_rolling_mean(&[10.0, 20.0, 30.0, 40.0], 2).unwrap();
        assert_eq!(means[0], None);
        assert_relative_eq!(means[1].unwrap(), 10.0);
        assert_relative_eq!(means[2].unwrap(), 15.0);
        assert_relative_eq!(means[3].unwrap(), 25.0);
    }

    #[test]
    fn test_shifted_std_needs_two_values() {
        let stds = shifted_rolling_std(&[1.0, 3.0, 5.0], 3).unwrap();
        assert_eq!(stds[0], None);
        assert_eq!(stds[1], None);
        assert_relative_eq!(stds[2].unwrap(), 2.0_f64.sqrt());
    }
}
