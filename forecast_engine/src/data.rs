//! Input contract: the analyst bundle and the records derived from it
//!
//! Articles arrive as JSON from the upstream analysis step. Each article is
//! reduced to a [`Record`]: a calendar date (if one can be resolved), its
//! keyword tags and optional auxiliary scores.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Datetime layouts carrying an explicit UTC offset
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%z",
];

/// Datetime layouts without offset
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Plain date layouts
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Date-like patterns searched for inside article URLs, in priority order
const URL_DATE_PATTERNS: &[&str] = &[r"(\d{4})[/-](\d{2})[/-](\d{2})", r"(\d{4})(\d{2})(\d{2})"];

/// Top-level document produced by the analysis step
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalystBundle {
    /// Search query the articles were collected for
    #[serde(default)]
    pub query: String,
    /// Articles in upstream order
    #[serde(default)]
    pub articles: Vec<Article>,
}

/// Nested metadata block some upstream sources attach
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleMetadata {
    #[serde(default, deserialize_with = "lenient::string")]
    pub date: Option<String>,
}

/// One analysed article
///
/// Fields of an unexpected JSON type read as absent, so one malformed
/// article becomes an undated record instead of failing the bundle.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Article {
    #[serde(default, deserialize_with = "lenient::string")]
    pub published: Option<String>,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub sentiment_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub source_weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub published_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub date: Option<String>,
    #[serde(default, rename = "publishedAt", deserialize_with = "lenient::string")]
    pub published_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub scraped_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::metadata")]
    pub metadata: Option<ArticleMetadata>,
}

impl Article {
    /// Candidate date strings in resolution order
    fn date_candidates(&self) -> impl Iterator<Item = &str> {
        [
            self.published.as_deref(),
            self.published_date.as_deref(),
            self.date.as_deref(),
            self.published_at.as_deref(),
            self.created_at.as_deref(),
            self.scraped_at.as_deref(),
            self.metadata.as_ref().and_then(|m| m.date.as_deref()),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
    }
}

mod lenient {
    use super::ArticleMetadata;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64(),
            _ => None,
        })
    }

    /// String entries of a list; anything else is dropped
    pub fn strings<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<String>>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        })
    }

    pub fn metadata<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<ArticleMetadata>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(ArticleMetadata::deserialize(value).ok())
    }
}

/// One input event reduced to what aggregation needs
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// Calendar date of the event, `None` when it could not be resolved
    pub date: Option<NaiveDate>,
    /// Keyword tags in upstream order
    pub keywords: Vec<String>,
    pub sentiment_score: Option<f64>,
    pub source_weight: Option<f64>,
}

impl Record {
    /// Convenience constructor for a dated record
    pub fn dated(date: NaiveDate, keywords: Vec<String>) -> Self {
        Self {
            date: Some(date),
            keywords,
            sentiment_score: None,
            source_weight: None,
        }
    }
}

/// Resolves article dates from explicit fields or, failing that, the URL
#[derive(Debug, Clone)]
pub struct DateResolver {
    url_patterns: Vec<Regex>,
}

impl DateResolver {
    /// Compile the URL patterns
    pub fn new() -> Result<Self> {
        let url_patterns = URL_DATE_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ForecastError::ValidationError(format!("Bad URL date pattern: {}", e)))?;
        Ok(Self { url_patterns })
    }

    /// Resolve the calendar date of an article, if any source yields one
    pub fn resolve(&self, article: &Article) -> Option<NaiveDate> {
        article
            .date_candidates()
            .find_map(parse_date)
            .or_else(|| article.url.as_deref().and_then(|url| self.date_from_url(url)))
    }

    /// First valid date embedded in a URL
    pub fn date_from_url(&self, url: &str) -> Option<NaiveDate> {
        self.url_patterns.iter().find_map(|pattern| {
            let caps = pattern.captures(url)?;
            let year = caps.get(1)?.as_str().parse().ok()?;
            let month = caps.get(2)?.as_str().parse().ok()?;
            let day = caps.get(3)?.as_str().parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        })
    }
}

/// Parse a date or datetime string into the calendar date it names
///
/// Offsets are respected: the date is the one in the timestamp's own offset.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.date_naive());
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Loader for analyst bundles
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load an analyst bundle from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<AnalystBundle> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Parse an analyst bundle from a JSON string
    pub fn from_json_str(text: &str) -> Result<AnalystBundle> {
        let bundle: AnalystBundle = serde_json::from_str(text)?;
        debug!(
            query = %bundle.query,
            articles = bundle.articles.len(),
            "Parsed analyst bundle"
        );
        Ok(bundle)
    }
}

impl AnalystBundle {
    /// Reduce every article to a record, resolving dates along the way
    pub fn to_records(&self) -> Result<Vec<Record>> {
        let resolver = DateResolver::new()?;
        let records: Vec<Record> = self
            .articles
            .iter()
            .map(|article| Record {
                date: resolver.resolve(article),
                keywords: article.keywords.clone().unwrap_or_default(),
                sentiment_score: article.sentiment_score.filter(|v| v.is_finite()),
                source_weight: article.source_weight.filter(|v| v.is_finite()),
            })
            .collect();

        let undated = records.iter().filter(|r| r.date.is_none()).count();
        if undated > 0 {
            warn!(undated, "Articles without a resolvable date will be skipped");
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case("2025-08-14", ymd(2025, 8, 14))]
    #[case("2025/08/14", ymd(2025, 8, 14))]
    #[case("2025-08-14T10:22:00Z", ymd(2025, 8, 14))]
    #[case("2025-08-14 10:22:00", ymd(2025, 8, 14))]
    #[case("2025-08-14 23:30:00-05:00", ymd(2025, 8, 14))]
    #[case("2025-08-14T10:22:00.123", ymd(2025, 8, 14))]
    #[case("Thu, 14 Aug 2025 10:22:00 +0000", ymd(2025, 8, 14))]
    fn test_parse_date_formats(#[case] raw: &str, #[case] expected: NaiveDate) {
        assert_eq!(parse_date(raw), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("yesterday")]
    #[case("2025-13-40")]
    fn test_parse_date_rejects_garbage(#[case] raw: &str) {
        assert_eq!(parse_date(raw), None);
    }

    #[test]
    fn test_resolver_prefers_published_then_falls_back() {
        let resolver = DateResolver::new().unwrap();

        let article = Article {
            published: Some("not a date".to_string()),
            created_at: Some("2024-02-03".to_string()),
            url: Some("https://news.example/2020/01/01/story".to_string()),
            ..Default::default()
        };
        assert_eq!(resolver.resolve(&article), Some(ymd(2024, 2, 3)));

        let nested = Article {
            metadata: Some(ArticleMetadata {
                date: Some("2024-05-06".to_string()),
            }),
            ..Default::default()
        };
        assert_eq!(resolver.resolve(&nested), Some(ymd(2024, 5, 6)));
    }

    #[rstest]
    #[case("https://site.example/2025/08/14/headline", Some(ymd(2025, 8, 14)))]
    #[case("https://site.example/news-2025-08-14-x", Some(ymd(2025, 8, 14)))]
    #[case("https://site.example/a/20250814/b", Some(ymd(2025, 8, 14)))]
    #[case("https://site.example/about", None)]
    fn test_dates_from_urls(#[case] url: &str, #[case] expected: Option<NaiveDate>) {
        let resolver = DateResolver::new().unwrap();
        assert_eq!(resolver.date_from_url(url), expected);
    }

    #[test]
    fn test_bundle_to_records() {
        let json = r#"{
            "query": "battery recycling",
            "articles": [
                {"published": "2025-01-02", "keywords": ["EV", "lithium"], "sentiment_score": 0.4},
                {"keywords": ["EV"]},
                {"published": "2025-01-03", "keywords": null, "source_weight": 0.9}
            ]
        }"#;

        let bundle = DataLoader::from_json_str(json).unwrap();
        assert_eq!(bundle.query, "battery recycling");

        let records = bundle.to_records().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].date, Some(ymd(2025, 1, 2)));
        assert_eq!(records[0].keywords, vec!["EV", "lithium"]);
        assert_eq!(records[0].sentiment_score, Some(0.4));
        assert_eq!(records[1].date, None);
        assert!(records[2].keywords.is_empty());
        assert_eq!(records[2].source_weight, Some(0.9));
    }

    #[test]
    fn test_off_type_fields_read_as_absent() {
        let json = r#"{
            "articles": [
                {"published": 1741000000, "sentiment_score": "n/a", "keywords": ["EV", 3, null]},
                {"published": null, "created_at": "2025-01-04", "source_weight": true},
                {"metadata": "2025-01-05", "url": 42}
            ]
        }"#;

        let records = DataLoader::from_json_str(json).unwrap().to_records().unwrap();
        assert_eq!(records[0].date, None);
        assert_eq!(records[0].sentiment_score, None);
        assert_eq!(records[0].keywords, vec!["EV"]);
        assert_eq!(records[1].date, Some(ymd(2025, 1, 4)));
        assert_eq!(records[1].source_weight, None);
        assert_eq!(records[2].date, None);
    }

    #[test]
    fn test_malformed_json_is_error() {
        let result = DataLoader::from_json_str("{ not json");
        assert!(matches!(result, Err(ForecastError::Json(_))));
    }
}
