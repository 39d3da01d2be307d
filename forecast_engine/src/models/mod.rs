//! Forecasting models for regular series
//!
//! Every strategy follows the same two-step contract: a [`ForecastModel`] is
//! trained on a [`TrainingSet`] and the resulting [`TrainedForecastModel`]
//! produces exactly `horizon` predictions. [`ModelKind`] is the closed set of
//! strategies a run can request.

use crate::error::{ForecastError, Result};
use crate::series::RegularSeries;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::str::FromStr;

#[cfg(feature = "arima")]
pub mod arima;
pub mod boosting;
pub mod exponential_smoothing;
pub mod naive;

/// Why a strategy substituted its documented sparse-data fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitNote {
    /// Too few complete feature rows; the last value was repeated
    SparseTrainingRows { usable: usize },
}

impl FitNote {
    /// Machine-readable reason reported in run metadata
    pub fn reason(&self) -> &'static str {
        match self {
            FitNote::SparseTrainingRows { .. } => "sparse_training_rows",
        }
    }
}

/// Forecast result containing predicted values
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    values: Vec<f64>,
    horizon: usize,
    note: Option<FitNote>,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(values: Vec<f64>, horizon: usize) -> Result<Self> {
        if values.len() != horizon {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match horizon ({})",
                values.len(),
                horizon
            )));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(ForecastError::ValidationError(format!(
                "Forecast contains a non-finite value ({})",
                bad
            )));
        }

        Ok(Self {
            values,
            horizon,
            note: None,
        })
    }

    /// Attach a fallback note
    pub fn with_note(mut self, note: FitNote) -> Self {
        self.note = Some(note);
        self
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Fallback taken while fitting, if any
    pub fn note(&self) -> Option<FitNote> {
        self.note
    }
}

/// Target series plus co-indexed exogenous series
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    target: RegularSeries,
    exogenous: Vec<RegularSeries>,
}

impl TrainingSet {
    /// Training data without exogenous columns
    pub fn new(target: RegularSeries) -> Self {
        Self {
            target,
            exogenous: Vec::new(),
        }
    }

    /// Training data with exogenous columns sharing the target's index
    pub fn with_exogenous(target: RegularSeries, exogenous: Vec<RegularSeries>) -> Result<Self> {
        for series in &exogenous {
            if series.len() != target.len() || series.first_period() != target.first_period() {
                return Err(ForecastError::ValidationError(format!(
                    "Series '{}' is not co-indexed with '{}'",
                    series.name(),
                    target.name()
                )));
            }
        }
        Ok(Self { target, exogenous })
    }

    pub fn target(&self) -> &RegularSeries {
        &self.target
    }

    pub fn values(&self) -> &[f64] {
        self.target.values()
    }

    pub fn exogenous(&self) -> &[RegularSeries] {
        &self.exogenous
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// The first `len` periods of every column
    pub fn head(&self, len: usize) -> Result<Self> {
        Ok(Self {
            target: self.target.head(len)?,
            exogenous: self
                .exogenous
                .iter()
                .map(|s| s.head(len))
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

/// Parameters shared by all strategies
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    /// Periods per seasonal cycle
    pub seasonal_period: usize,
    /// Lag offsets for tree features
    pub lags: Vec<usize>,
    /// Rolling windows for tree features
    pub rolling_windows: Vec<usize>,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            seasonal_period: 7,
            lags: vec![1, 7, 14],
            rolling_windows: vec![7, 14, 28],
        }
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Generate forecast for future periods
    fn forecast(&self, horizon: usize) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a regular series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on the given history
    fn train(&self, data: &TrainingSet) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

fn train_and_forecast<M: ForecastModel>(
    model: &M,
    data: &TrainingSet,
    horizon: usize,
) -> Result<ForecastResult> {
    let trained = model.train(data)?;
    let result = trained.forecast(horizon)?;
    tracing::trace!(model = trained.name(), horizon, "Forecast produced");
    Ok(result)
}

/// The closed set of forecasting strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelKind {
    Naive,
    SeasonalNaive,
    HoltWinters,
    Arima,
    LightGbm,
    XgBoost,
}

impl ModelKind {
    pub const ALL: [ModelKind; 6] = [
        ModelKind::Naive,
        ModelKind::SeasonalNaive,
        ModelKind::HoltWinters,
        ModelKind::Arima,
        ModelKind::LightGbm,
        ModelKind::XgBoost,
    ];

    /// Name used in configs and output
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Naive => "naive",
            ModelKind::SeasonalNaive => "snaive",
            ModelKind::HoltWinters => "holtwinters",
            ModelKind::Arima => "arima",
            ModelKind::LightGbm => "lightgbm",
            ModelKind::XgBoost => "xgboost",
        }
    }

    /// Whether the strategy fits on a feature frame
    pub fn is_tree_based(&self) -> bool {
        matches!(self, ModelKind::LightGbm | ModelKind::XgBoost)
    }

    /// Fail when the strategy's backend is not compiled in
    pub fn ensure_available(&self) -> Result<()> {
        match self {
            ModelKind::Arima if !cfg!(feature = "arima") => Err(ForecastError::ModelUnavailable {
                model: self.as_str().to_string(),
                reason: "built without the `arima` feature".to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Train on `data` and predict `horizon` periods
    pub fn fit_predict(
        &self,
        data: &TrainingSet,
        horizon: usize,
        params: &ModelParams,
    ) -> Result<ForecastResult> {
        self.ensure_available()?;
        if data.is_empty() {
            return Err(ForecastError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        match self {
            ModelKind::Naive => train_and_forecast(&naive::NaiveModel::new(), data, horizon),
            ModelKind::SeasonalNaive => train_and_forecast(
                &naive::SeasonalNaive::new(params.seasonal_period)?,
                data,
                horizon,
            ),
            ModelKind::HoltWinters => train_and_forecast(
                &exponential_smoothing::HoltWinters::new(params.seasonal_period)?,
                data,
                horizon,
            ),
            ModelKind::Arima => Self::fit_arima(data, horizon),
            ModelKind::LightGbm | ModelKind::XgBoost => {
                let engine = if *self == ModelKind::LightGbm {
                    boosting::BoosterConfig::lightgbm()
                } else {
                    boosting::BoosterConfig::xgboost()
                };
                let model = boosting::GradientBoostedForecaster::new(
                    engine,
                    &params.lags,
                    &params.rolling_windows,
                )?;
                train_and_forecast(&model, data, horizon)
            }
        }
    }

    #[cfg(feature = "arima")]
    fn fit_arima(data: &TrainingSet, horizon: usize) -> Result<ForecastResult> {
        train_and_forecast(&arima::AutoArima::default(), data, horizon)
    }

    #[cfg(not(feature = "arima"))]
    fn fit_arima(_data: &TrainingSet, _horizon: usize) -> Result<ForecastResult> {
        Err(ForecastError::ModelUnavailable {
            model: ModelKind::Arima.as_str().to_string(),
            reason: "built without the `arima` feature".to_string(),
        })
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| ForecastError::UnsupportedModel(s.to_string()))
    }
}

impl TryFrom<String> for ModelKind {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ModelKind> for String {
    fn from(kind: ModelKind) -> Self {
        kind.as_str().to_string()
    }
}
