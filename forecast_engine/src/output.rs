//! Output contract: the forecast report written as JSON

use crate::error::Result;
use crate::metrics::CvMetrics;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Confidence attached to a series forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Label from a backtest SMAPE (percent scale)
    ///
    /// No evidence is `medium`; above 60 is `low`; above 30 is `medium`.
    pub fn from_smape(smape: Option<f64>) -> Self {
        match smape {
            None => Confidence::Medium,
            Some(s) if s > 60.0 => Confidence::Low,
            Some(s) if s > 30.0 => Confidence::Medium,
            Some(_) => Confidence::High,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        f.write_str(label)
    }
}

/// One predicted period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// ISO date of the period label
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    pub prediction: f64,
}

/// Forecast of one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesForecast {
    /// Series name (`article_count` or a `kw_*_count` column)
    pub series: String,
    /// Model actually used for this series
    pub model: String,
    pub confidence: Confidence,
    pub forecasts: Vec<ForecastPoint>,
}

/// A series that did not use the requested model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackRecord {
    pub series: String,
    pub requested: String,
    pub used: String,
    pub reason: String,
}

/// Run metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub model: String,
    pub horizon: usize,
    pub frequency: String,
    /// RFC 3339 UTC timestamp
    pub generated_at: String,
    pub series_count: usize,
    pub skipped_series: Vec<String>,
    pub skipped_articles: usize,
    pub query: String,
    pub fallbacks: Vec<FallbackRecord>,
}

/// Complete result of a forecast run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub meta: RunMeta,
    pub forecasts: Vec<SeriesForecast>,
    /// Backtest metrics of the primary series
    pub cv_metrics: CvMetrics,
    /// Reserved; always empty
    pub top_features: Vec<String>,
}

impl ForecastReport {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the pretty-printed report, creating parent directories
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    /// Forecast of the named series, if produced
    pub fn series(&self, name: &str) -> Option<&SeriesForecast> {
        self.forecasts.iter().find(|f| f.series == name)
    }
}

mod iso_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
