//! Feature Deriver: lag, rolling-window and calendar columns
//!
//! Every derived value at period `t` is computed from values at periods
//! strictly before `t` or from the calendar attributes of `t` itself, so a
//! frame can be extended by a forecast-origin row whose target is unknown.

use crate::error::{ForecastError, Result};
use crate::series::RegularSeries;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use series_math::rolling::{lagged, shifted_rolling_mean, shifted_rolling_std};

/// Calendar columns, in frame order
pub const CALENDAR_COLUMNS: [&str; 4] = ["day_of_week", "week_of_year", "month", "quarter"];

/// Name of the lag column for offset `k`
pub fn lag_column(k: usize) -> String {
    format!("lag_{}", k)
}

/// Derives feature frames from a target series and co-indexed exogenous series
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDeriver {
    lags: Vec<usize>,
    windows: Vec<usize>,
}

impl Default for FeatureDeriver {
    fn default() -> Self {
        Self {
            lags: vec![1, 7, 14],
            windows: vec![7, 14, 28],
        }
    }
}

impl FeatureDeriver {
    /// Create a deriver; offsets and windows are deduplicated and sorted
    pub fn new(lags: &[usize], windows: &[usize]) -> Result<Self> {
        if lags.is_empty() || lags.contains(&0) {
            return Err(ForecastError::InvalidParameter(
                "Lag offsets must be non-empty and positive".to_string(),
            ));
        }
        if windows.is_empty() || windows.contains(&0) {
            return Err(ForecastError::InvalidParameter(
                "Rolling windows must be non-empty and positive".to_string(),
            ));
        }

        let mut lags = lags.to_vec();
        lags.sort_unstable();
        lags.dedup();
        let mut windows = windows.to_vec();
        windows.sort_unstable();
        windows.dedup();

        Ok(Self { lags, windows })
    }

    pub fn lags(&self) -> &[usize] {
        &self.lags
    }

    pub fn windows(&self) -> &[usize] {
        &self.windows
    }

    /// Feature frame with one row per observed period
    pub fn derive(&self, target: &RegularSeries, exogenous: &[RegularSeries]) -> Result<FeatureFrame> {
        self.build(target, exogenous, false)
    }

    /// Feature frame with an extra row for the first unobserved period
    ///
    /// The extra row has a null target; its features are fully determined
    /// by the observed history. Its `lag_1` is the last observation, so the
    /// first multi-step prediction targets the period after the history
    /// rather than re-predicting the last observed period.
    pub fn derive_with_origin(
        &self,
        target: &RegularSeries,
        exogenous: &[RegularSeries],
    ) -> Result<FeatureFrame> {
        self.build(target, exogenous, true)
    }

    fn build(
        &self,
        target: &RegularSeries,
        exogenous: &[RegularSeries],
        with_origin: bool,
    ) -> Result<FeatureFrame> {
        for series in exogenous {
            if series.len() != target.len() || series.first_period() != target.first_period() {
                return Err(ForecastError::ValidationError(format!(
                    "Exogenous series '{}' is not aligned with '{}'",
                    series.name(),
                    target.name()
                )));
            }
        }

        let rows = target.len() + usize::from(with_origin);
        let periods: Vec<NaiveDate> = (0..rows).map(|i| target.period(i)).collect();

        // Padding with a placeholder is safe: no feature reads its own period.
        let mut history = target.values().to_vec();
        if with_origin {
            history.push(0.0);
        }

        let mut target_values: Vec<Option<f64>> = target.values().iter().copied().map(Some).collect();
        if with_origin {
            target_values.push(None);
        }

        let mut columns = vec![Series::new(target.name(), target_values)];
        let mut feature_columns = Vec::new();

        for &k in &self.lags {
            let name = lag_column(k);
            columns.push(Series::new(&name, lagged(&history, k)?));
            feature_columns.push(name);
        }
        for &w in &self.windows {
            let mean_name = format!("roll_mean_{}", w);
            columns.push(Series::new(&mean_name, shifted_rolling_mean(&history, w)?));
            feature_columns.push(mean_name);

            let std_name = format!("roll_std_{}", w);
            columns.push(Series::new(&std_name, shifted_rolling_std(&history, w)?));
            feature_columns.push(std_name);
        }

        let calendar: Vec<[f64; 4]> = periods.iter().map(|d| calendar_attributes(*d)).collect();
        for (i, name) in CALENDAR_COLUMNS.iter().enumerate() {
            let values: Vec<Option<f64>> = calendar.iter().map(|row| Some(row[i])).collect();
            columns.push(Series::new(name, values));
            feature_columns.push(name.to_string());
        }

        for series in exogenous {
            let mut padded = series.values().to_vec();
            if with_origin {
                padded.push(0.0);
            }
            let name = format!("{}_lag_1", series.name());
            columns.push(Series::new(&name, lagged(&padded, 1)?));
            feature_columns.push(name);
        }

        let frame = DataFrame::new(columns)?;

        Ok(FeatureFrame {
            frame,
            periods,
            target_column: target.name().to_string(),
            feature_columns,
            lags: self.lags.clone(),
        })
    }
}

/// Day of week (Monday = 0), ISO week, month and quarter of a period
fn calendar_attributes(date: NaiveDate) -> [f64; 4] {
    let month = date.month();
    [
        f64::from(date.weekday().num_days_from_monday()),
        f64::from(date.iso_week().week()),
        f64::from(month),
        f64::from((month - 1) / 3 + 1),
    ]
}

/// Design matrix and targets ready for fitting
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingMatrix {
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl TrainingMatrix {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// A regular series extended with derived feature columns
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    frame: DataFrame,
    periods: Vec<NaiveDate>,
    target_column: String,
    feature_columns: Vec<String>,
    lags: Vec<usize>,
}

impl FeatureFrame {
    /// Underlying polars frame (target first, then features)
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Feature column names in matrix order
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Values of one column, nulls preserved
    pub fn column_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        Ok(self.frame.column(name)?.f64()?.into_iter().collect())
    }

    /// One row of features, nulls preserved
    pub fn feature_row(&self, index: usize) -> Result<Vec<Option<f64>>> {
        if index >= self.height() {
            return Err(ForecastError::ValidationError(format!(
                "Row {} out of range for a frame of height {}",
                index,
                self.height()
            )));
        }
        self.feature_columns
            .iter()
            .map(|name| Ok(self.frame.column(name)?.f64()?.get(index)))
            .collect()
    }

    /// Last row of features; every value must be known
    pub fn last_feature_row(&self) -> Result<Vec<f64>> {
        let index = self.height().checked_sub(1).ok_or_else(|| {
            ForecastError::ValidationError("Feature frame has no rows".to_string())
        })?;
        self.feature_row(index)?
            .into_iter()
            .zip(&self.feature_columns)
            .map(|(value, name)| {
                value.ok_or_else(|| {
                    ForecastError::ValidationError(format!(
                        "Feature '{}' is missing in the last row",
                        name
                    ))
                })
            })
            .collect()
    }

    /// Rows where the target and every feature are known
    pub fn training_matrix(&self) -> Result<TrainingMatrix> {
        let complete = self.frame.drop_nulls::<String>(None)?;

        let targets: Vec<f64> = complete
            .column(&self.target_column)?
            .f64()?
            .into_no_null_iter()
            .collect();

        let columns = self
            .feature_columns
            .iter()
            .map(|name| Ok(complete.column(name)?.f64()?.into_no_null_iter().collect()))
            .collect::<Result<Vec<Vec<f64>>>>()?;

        let rows = (0..targets.len())
            .map(|i| columns.iter().map(|col| col[i]).collect())
            .collect();

        Ok(TrainingMatrix { rows, targets })
    }

    /// `(lag offset, feature index)` of every lag column, smallest lag first
    pub fn lag_slots(&self) -> Vec<(usize, usize)> {
        self.lags
            .iter()
            .filter_map(|&k| {
                let name = lag_column(k);
                self.feature_columns
                    .iter()
                    .position(|c| *c == name)
                    .map(|idx| (k, idx))
            })
            .collect()
    }
}
