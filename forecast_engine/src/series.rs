//! Series Builder: irregular records in, gap-free regular series out
//!
//! The primary series counts records per period. Optional keyword series
//! count records carrying a given tag, and auxiliary series average the
//! scalar scores attached to records. Every series shares the primary
//! period index, with empty periods filled with zero.

use crate::data::Record;
use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Name of the primary count series
pub const PRIMARY_SERIES: &str = "article_count";

/// Maximum length of the sanitized part of a keyword column name
const MAX_KEYWORD_IDENT: usize = 60;

/// Sampling frequency of a regular series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// One period per calendar day
    #[default]
    Daily,
    /// One period per calendar week ending on Sunday
    Weekly,
}

impl Frequency {
    /// Lowercase name used in configs and output
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
        }
    }

    /// Days between consecutive periods
    pub fn step_days(&self) -> i64 {
        match self {
            Frequency::Daily => 1,
            Frequency::Weekly => 7,
        }
    }

    /// Period length as a duration
    pub fn step(&self) -> Duration {
        Duration::days(self.step_days())
    }

    /// Default seasonal cycle length
    pub fn seasonal_period(&self) -> usize {
        match self {
            Frequency::Daily => 7,
            Frequency::Weekly => 52,
        }
    }

    /// Shortest keyword history a tree model is trusted with
    pub fn min_tree_history(&self) -> usize {
        match self {
            Frequency::Daily => 28,
            Frequency::Weekly => 12,
        }
    }

    /// Label of the period containing `date`
    ///
    /// Weekly periods are labelled by the Sunday that closes them.
    pub fn period_of(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Daily => date,
            Frequency::Weekly => {
                let to_sunday = 6 - i64::from(date.weekday().num_days_from_monday());
                date + Duration::days(to_sunday)
            }
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "d" => Ok(Frequency::Daily),
            "weekly" | "w" => Ok(Frequency::Weekly),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unsupported frequency: {} (expected daily or weekly)",
                other
            ))),
        }
    }
}

/// Gap-free series at a fixed frequency
#[derive(Debug, Clone, PartialEq)]
pub struct RegularSeries {
    name: String,
    frequency: Frequency,
    start: NaiveDate,
    values: Vec<f64>,
}

impl RegularSeries {
    /// Create a series whose first period is `start`
    pub fn new(
        name: impl Into<String>,
        frequency: Frequency,
        start: NaiveDate,
        values: Vec<f64>,
    ) -> Result<Self> {
        if values.is_empty() {
            return Err(ForecastError::ValidationError(
                "A regular series needs at least one period".to_string(),
            ));
        }
        if frequency.period_of(start) != start {
            return Err(ForecastError::ValidationError(format!(
                "{} is not a {} period label",
                start, frequency
            )));
        }

        Ok(Self {
            name: name.into(),
            frequency,
            start,
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn first_period(&self) -> NaiveDate {
        self.start
    }

    /// Label of the `index`-th period
    pub fn period(&self, index: usize) -> NaiveDate {
        self.start + Duration::days(self.frequency.step_days() * index as i64)
    }

    pub fn last_period(&self) -> NaiveDate {
        self.period(self.values.len() - 1)
    }

    /// All period labels in order
    pub fn periods(&self) -> Vec<NaiveDate> {
        (0..self.values.len()).map(|i| self.period(i)).collect()
    }

    pub fn last_value(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    /// Sum over the whole history
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Number of periods with a nonzero value
    pub fn nonzero_periods(&self) -> usize {
        self.values.iter().filter(|v| **v != 0.0).count()
    }

    /// Copy of the first `len` periods
    pub fn head(&self, len: usize) -> Result<Self> {
        if len == 0 || len > self.values.len() {
            return Err(ForecastError::ValidationError(format!(
                "Cannot take a prefix of {} from a series of {}",
                len,
                self.values.len()
            )));
        }
        Ok(Self {
            name: self.name.clone(),
            frequency: self.frequency,
            start: self.start,
            values: self.values[..len].to_vec(),
        })
    }
}

/// A keyword count series together with the tag it counts
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordSeries {
    /// Normalized tag (lowercase, single spaces)
    pub keyword: String,
    /// Count series named after the sanitized column
    pub series: RegularSeries,
}

/// Everything the Series Builder produces for one input snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSet {
    pub primary: RegularSeries,
    pub keywords: Vec<KeywordSeries>,
    pub auxiliary: Vec<RegularSeries>,
    /// Records dropped because they had no resolvable date
    pub dropped_records: usize,
}

/// Builds regular series from records
#[derive(Debug, Clone)]
pub struct SeriesBuilder {
    frequency: Frequency,
    top_k_keywords: usize,
}

/// Scalar fields averaged into auxiliary series
type AuxiliaryField = (&'static str, fn(&Record) -> Option<f64>);

const AUXILIARY_FIELDS: &[AuxiliaryField] = &[
    ("sentiment_mean", sentiment_of),
    ("source_weight_mean", source_weight_of),
];

fn sentiment_of(record: &Record) -> Option<f64> {
    record.sentiment_score
}

fn source_weight_of(record: &Record) -> Option<f64> {
    record.source_weight
}

impl SeriesBuilder {
    pub fn new(frequency: Frequency, top_k_keywords: usize) -> Self {
        Self {
            frequency,
            top_k_keywords,
        }
    }

    /// Aggregate records into the primary, keyword and auxiliary series
    pub fn build(&self, records: &[Record]) -> Result<SeriesSet> {
        let dated: Vec<(NaiveDate, &Record)> = records
            .iter()
            .filter_map(|r| r.date.map(|d| (self.frequency.period_of(d), r)))
            .collect();
        let dropped_records = records.len() - dated.len();

        let (start, end) = match (
            dated.iter().map(|(p, _)| *p).min(),
            dated.iter().map(|(p, _)| *p).max(),
        ) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(ForecastError::EmptyInput(format!(
                    "none of the {} records has a resolvable date",
                    records.len()
                )))
            }
        };

        let step = self.frequency.step_days();
        let len = ((end - start).num_days() / step) as usize + 1;
        let index_of = |period: NaiveDate| ((period - start).num_days() / step) as usize;

        let mut counts = vec![0.0; len];
        for (period, _) in &dated {
            counts[index_of(*period)] += 1.0;
        }
        let primary = RegularSeries::new(PRIMARY_SERIES, self.frequency, start, counts)?;

        let mut keywords = Vec::new();
        let mut used_columns: Vec<String> = Vec::new();
        for keyword in self.top_keywords(&dated) {
            let mut values = vec![0.0; len];
            for (period, record) in &dated {
                if record.keywords.iter().any(|k| normalize_tag(k) == keyword) {
                    values[index_of(*period)] += 1.0;
                }
            }
            let column = unique_column(&keyword_column(&keyword), &used_columns);
            used_columns.push(column.clone());
            debug!(%keyword, %column, "Materialized keyword series");
            keywords.push(KeywordSeries {
                keyword,
                series: RegularSeries::new(column, self.frequency, start, values)?,
            });
        }

        let mut auxiliary = Vec::new();
        for (name, field) in AUXILIARY_FIELDS {
            let mut sums = vec![0.0; len];
            let mut seen = vec![0usize; len];
            for (period, record) in &dated {
                if let Some(value) = field(record) {
                    let i = index_of(*period);
                    sums[i] += value;
                    seen[i] += 1;
                }
            }
            if seen.iter().all(|&n| n == 0) {
                continue;
            }
            let means = sums
                .iter()
                .zip(&seen)
                .map(|(s, &n)| if n > 0 { s / n as f64 } else { 0.0 })
                .collect();
            auxiliary.push(RegularSeries::new(*name, self.frequency, start, means)?);
        }

        info!(
            frequency = %self.frequency,
            periods = len,
            records = dated.len(),
            dropped_records,
            keyword_series = keywords.len(),
            auxiliary_series = auxiliary.len(),
            "Built regular series"
        );

        Ok(SeriesSet {
            primary,
            keywords,
            auxiliary,
            dropped_records,
        })
    }

    /// Top-K normalized tags by occurrence, ties broken by first appearance
    fn top_keywords(&self, dated: &[(NaiveDate, &Record)]) -> Vec<String> {
        if self.top_k_keywords == 0 {
            return Vec::new();
        }

        let mut tally: HashMap<String, (usize, usize)> = HashMap::new();
        let mut order = 0usize;
        for (_, record) in dated {
            for tag in &record.keywords {
                let tag = normalize_tag(tag);
                if tag.is_empty() {
                    continue;
                }
                let entry = tally.entry(tag).or_insert_with(|| {
                    order += 1;
                    (0, order)
                });
                entry.0 += 1;
            }
        }

        let mut ranked: Vec<(String, usize, usize)> = tally
            .into_iter()
            .map(|(tag, (count, first))| (tag, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        ranked
            .into_iter()
            .take(self.top_k_keywords)
            .map(|(tag, _, _)| tag)
            .collect()
    }
}

/// Lowercase a tag and collapse runs of whitespace to single spaces
pub fn normalize_tag(tag: &str) -> String {
    tag.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Identifier-safe column name for a keyword: `kw_<ident>_count`
pub fn keyword_column(keyword: &str) -> String {
    let ident: String = keyword
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .take(MAX_KEYWORD_IDENT)
        .collect();
    let ident = if ident.is_empty() {
        "keyword".to_string()
    } else {
        ident
    };
    format!("kw_{}_count", ident)
}

fn unique_column(candidate: &str, taken: &[String]) -> String {
    if !taken.iter().any(|t| t == candidate) {
        return candidate.to_string();
    }
    let stem = candidate.trim_end_matches("_count");
    (2..)
        .map(|n| format!("{}_{}_count", stem, n))
        .find(|c| !taken.contains(c))
        .unwrap_or_else(|| candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(date: NaiveDate, tags: &[&str]) -> Record {
        Record::dated(date, tags.iter().map(|t| t.to_string()).collect())
    }

    #[rstest]
    #[case(ymd(2024, 1, 1), ymd(2024, 1, 7))] // Monday
    #[case(ymd(2024, 1, 6), ymd(2024, 1, 7))] // Saturday
    #[case(ymd(2024, 1, 7), ymd(2024, 1, 7))] // Sunday closes its own week
    #[case(ymd(2024, 1, 8), ymd(2024, 1, 14))]
    fn test_weekly_period_ends_on_sunday(#[case] date: NaiveDate, #[case] label: NaiveDate) {
        assert_eq!(Frequency::Weekly.period_of(date), label);
    }

    #[test]
    fn test_frequency_parsing() {
        assert_eq!("daily".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert_eq!("Weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert!("monthly".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_daily_counts_fill_gaps_with_zero() {
        let records = vec![
            record(ymd(2024, 3, 1), &[]),
            record(ymd(2024, 3, 1), &[]),
            record(ymd(2024, 3, 4), &[]),
        ];
        let set = SeriesBuilder::new(Frequency::Daily, 0).build(&records).unwrap();

        assert_eq!(set.primary.values(), &[2.0, 0.0, 0.0, 1.0]);
        assert_eq!(set.primary.first_period(), ymd(2024, 3, 1));
        assert_eq!(set.primary.last_period(), ymd(2024, 3, 4));
        assert!(set.keywords.is_empty());
        assert!(set.auxiliary.is_empty());
    }

    #[test]
    fn test_weekly_sums_into_weeks() {
        let records = vec![
            record(ymd(2024, 1, 1), &[]),
            record(ymd(2024, 1, 3), &[]),
            record(ymd(2024, 1, 16), &[]),
        ];
        let set = SeriesBuilder::new(Frequency::Weekly, 0).build(&records).unwrap();

        assert_eq!(set.primary.values(), &[2.0, 0.0, 1.0]);
        assert_eq!(
            set.primary.periods(),
            vec![ymd(2024, 1, 7), ymd(2024, 1, 14), ymd(2024, 1, 21)]
        );
    }

    #[test]
    fn test_undated_records_are_dropped_and_counted() {
        let mut undated = record(ymd(2024, 1, 1), &[]);
        undated.date = None;
        let records = vec![record(ymd(2024, 1, 1), &[]), undated];

        let set = SeriesBuilder::new(Frequency::Daily, 0).build(&records).unwrap();
        assert_eq!(set.primary.values(), &[1.0]);
        assert_eq!(set.dropped_records, 1);
    }

    #[test]
    fn test_no_dated_records_is_empty_input() {
        let result = SeriesBuilder::new(Frequency::Daily, 0).build(&[Record::default()]);
        assert!(matches!(result, Err(ForecastError::EmptyInput(_))));
    }

    #[test]
    fn test_keywords_ranked_by_frequency_then_first_seen() {
        let records = vec![
            record(ymd(2024, 1, 1), &["Solar", "wind"]),
            record(ymd(2024, 1, 2), &["  wind ", "hydro"]),
            record(ymd(2024, 1, 2), &["solar"]),
            record(ymd(2024, 1, 3), &["Hydro"]),
            record(ymd(2024, 1, 3), &["tidal"]),
        ];
        let set = SeriesBuilder::new(Frequency::Daily, 3).build(&records).unwrap();

        let names: Vec<&str> = set.keywords.iter().map(|k| k.keyword.as_str()).collect();
        assert_eq!(names, vec!["solar", "wind", "hydro"]);
        assert_eq!(set.keywords[0].series.name(), "kw_solar_count");
        assert_eq!(set.keywords[0].series.values(), &[1.0, 1.0, 0.0]);
        assert_eq!(set.keywords[2].series.values(), &[0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_auxiliary_means_zero_filled() {
        let mut a = record(ymd(2024, 1, 1), &[]);
        a.sentiment_score = Some(0.2);
        let mut b = record(ymd(2024, 1, 1), &[]);
        b.sentiment_score = Some(0.6);
        let c = record(ymd(2024, 1, 3), &[]);

        let set = SeriesBuilder::new(Frequency::Daily, 0)
            .build(&[a, b, c])
            .unwrap();

        assert_eq!(set.auxiliary.len(), 1);
        let sentiment = &set.auxiliary[0];
        assert_eq!(sentiment.name(), "sentiment_mean");
        assert!((sentiment.values()[0] - 0.4).abs() < 1e-12);
        assert_eq!(&sentiment.values()[1..], &[0.0, 0.0]);
    }

    #[rstest]
    #[case("Electric Vehicles", "kw_electric_vehicles_count")]
    #[case("  AI   chips!! ", "kw_ai_chips_count")]
    #[case("C++ / Rust", "kw_c__rust_count")]
    #[case("???", "kw_keyword_count")]
    fn test_keyword_column_names(#[case] keyword: &str, #[case] expected: &str) {
        assert_eq!(keyword_column(keyword), expected);
    }

    #[test]
    fn test_keyword_column_truncated() {
        let long = "x".repeat(200);
        assert_eq!(keyword_column(&long).len(), "kw__count".len() + 60);
    }

    #[test]
    fn test_colliding_columns_get_suffix() {
        let records = vec![record(ymd(2024, 1, 1), &["a-b", "ab", "a.b"])];
        let set = SeriesBuilder::new(Frequency::Daily, 3).build(&records).unwrap();
        let columns: Vec<&str> = set.keywords.iter().map(|k| k.series.name()).collect();
        assert_eq!(columns, vec!["kw_ab_count", "kw_ab_2_count", "kw_ab_3_count"]);
    }

    #[test]
    fn test_head_and_prefix_bounds() {
        let series =
            RegularSeries::new("s", Frequency::Daily, ymd(2024, 1, 1), vec![1.0, 2.0, 3.0])
                .unwrap();
        assert_eq!(series.head(2).unwrap().values(), &[1.0, 2.0]);
        assert!(series.head(0).is_err());
        assert!(series.head(4).is_err());
    }

    #[test]
    fn test_weekly_series_rejects_non_sunday_start() {
        let result = RegularSeries::new("s", Frequency::Weekly, ymd(2024, 1, 1), vec![1.0]);
        assert!(result.is_err());
    }
}
