//! Utility functions for the forecast_engine crate

use crate::series::Frequency;
use chrono::{DateTime, NaiveDate, Utc};

/// Labels of the `horizon` periods following `last_period`
pub fn future_periods(last_period: NaiveDate, horizon: usize, frequency: Frequency) -> Vec<NaiveDate> {
    let step = frequency.step();
    let mut periods = Vec::with_capacity(horizon);
    let mut current = last_period;
    for _ in 0..horizon {
        current += step;
        periods.push(current);
    }
    periods
}

/// Filesystem-safe UTC timestamp, e.g. `2025-01-02T03-04-05Z`
pub fn timestamp_slug(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%SZ").to_string()
}

/// Split a series into a training prefix and the following `horizon` values
pub fn train_test_split(data: &[f64], train_len: usize, horizon: usize) -> Option<(&[f64], &[f64])> {
    let end = train_len.checked_add(horizon)?;
    if train_len == 0 || end > data.len() {
        return None;
    }
    Some((&data[..train_len], &data[train_len..end]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_future_daily_periods() {
        assert_eq!(
            future_periods(ymd(2024, 2, 28), 3, Frequency::Daily),
            vec![ymd(2024, 2, 29), ymd(2024, 3, 1), ymd(2024, 3, 2)]
        );
    }

    #[test]
    fn test_future_weekly_periods_stay_on_sundays() {
        let periods = future_periods(ymd(2024, 1, 7), 2, Frequency::Weekly);
        assert_eq!(periods, vec![ymd(2024, 1, 14), ymd(2024, 1, 21)]);
    }

    #[test]
    fn test_timestamp_slug() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(timestamp_slug(at), "2025-01-02T03-04-05Z");
    }

    #[test]
    fn test_train_test_split_bounds() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        let (train, test) = train_test_split(&data, 3, 2).unwrap();
        assert_eq!(train, &[1.0, 2.0, 3.0]);
        assert_eq!(test, &[4.0, 5.0]);
        assert!(train_test_split(&data, 4, 2).is_none());
        assert!(train_test_split(&data, 0, 2).is_none());
    }
}
