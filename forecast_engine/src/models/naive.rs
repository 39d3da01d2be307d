//! Naive and seasonal-naive baselines

use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel, TrainingSet};

/// Repeats the last observed value
#[derive(Debug, Clone, Default)]
pub struct NaiveModel;

/// Trained naive model
#[derive(Debug, Clone)]
pub struct TrainedNaive {
    last_value: f64,
}

impl NaiveModel {
    pub fn new() -> Self {
        Self
    }
}

impl ForecastModel for NaiveModel {
    type Trained = TrainedNaive;

    fn train(&self, data: &TrainingSet) -> Result<Self::Trained> {
        let last_value = data.values().last().copied().ok_or(
            ForecastError::InsufficientData {
                required: 1,
                actual: 0,
            },
        )?;
        Ok(TrainedNaive { last_value })
    }

    fn name(&self) -> &str {
        "naive"
    }
}

impl TrainedForecastModel for TrainedNaive {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        ForecastResult::new(vec![self.last_value; horizon], horizon)
    }

    fn name(&self) -> &str {
        "naive"
    }
}

/// Repeats the last full seasonal cycle
#[derive(Debug, Clone)]
pub struct SeasonalNaive {
    period: usize,
}

/// Trained seasonal-naive model holding the cycle to tile
#[derive(Debug, Clone)]
pub struct TrainedSeasonalNaive {
    cycle: Vec<f64>,
}

impl SeasonalNaive {
    /// Create a seasonal-naive model with `period` periods per cycle
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(ForecastError::InvalidParameter(
                "Seasonal period must be positive".to_string(),
            ));
        }
        Ok(Self { period })
    }
}

impl ForecastModel for SeasonalNaive {
    type Trained = TrainedSeasonalNaive;

    fn train(&self, data: &TrainingSet) -> Result<Self::Trained> {
        let values = data.values();
        if values.is_empty() {
            return Err(ForecastError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }
        // Shorter than one cycle: the whole history is the cycle.
        let start = values.len().saturating_sub(self.period);
        Ok(TrainedSeasonalNaive {
            cycle: values[start..].to_vec(),
        })
    }

    fn name(&self) -> &str {
        "snaive"
    }
}

impl TrainedForecastModel for TrainedSeasonalNaive {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let values = self.cycle.iter().copied().cycle().take(horizon).collect();
        ForecastResult::new(values, horizon)
    }

    fn name(&self) -> &str {
        "snaive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{Frequency, RegularSeries};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn training(values: Vec<f64>) -> TrainingSet {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        TrainingSet::new(RegularSeries::new("y", Frequency::Daily, start, values).unwrap())
    }

    #[test]
    fn test_naive_repeats_last_value() {
        let trained = NaiveModel::new().train(&training(vec![3.0, 1.0, 4.0])).unwrap();
        assert_eq!(trained.forecast(4).unwrap().values(), &[4.0; 4]);
    }

    #[test]
    fn test_seasonal_naive_reproduces_cycle() {
        let cycle = [1.0, 5.0, 2.0];
        let values: Vec<f64> = cycle.iter().copied().cycle().take(12).collect();
        let trained = SeasonalNaive::new(3).unwrap().train(&training(values)).unwrap();

        assert_eq!(
            trained.forecast(6).unwrap().values(),
            &[1.0, 5.0, 2.0, 1.0, 5.0, 2.0]
        );
    }

    #[test]
    fn test_seasonal_naive_truncates_to_horizon() {
        let trained = SeasonalNaive::new(4)
            .unwrap()
            .train(&training(vec![9.0, 1.0, 2.0, 3.0, 4.0]))
            .unwrap();
        assert_eq!(trained.forecast(2).unwrap().values(), &[1.0, 2.0]);
    }

    #[test]
    fn test_short_history_tiles_whole_history() {
        let trained = SeasonalNaive::new(7)
            .unwrap()
            .train(&training(vec![2.0, 3.0]))
            .unwrap();
        assert_eq!(
            trained.forecast(5).unwrap().values(),
            &[2.0, 3.0, 2.0, 3.0, 2.0]
        );
    }

    #[test]
    fn test_zero_period_rejected() {
        assert!(SeasonalNaive::new(0).is_err());
    }
}
