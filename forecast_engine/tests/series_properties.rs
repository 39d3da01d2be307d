use chrono::{Duration, NaiveDate};
use forecast_engine::models::naive::{NaiveModel, SeasonalNaive};
use forecast_engine::models::TrainedForecastModel;
use forecast_engine::{
    Backtester, FeatureDeriver, ForecastModel, Frequency, ModelKind, ModelParams, Record,
    RegularSeries, SeriesBuilder, TrainingSet,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;

const TAGS: &[&str] = &["solar", "Wind", "grid storage", "hydrogen", "EV"];

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, 18).unwrap()
}

fn random_records(seed: u64, count: usize) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let date = if rng.gen_bool(0.05) {
                None
            } else {
                Some(start() + Duration::days(rng.gen_range(0..120)))
            };
            let keywords = TAGS
                .iter()
                .filter(|_| rng.gen_bool(0.3))
                .map(|t| t.to_string())
                .collect();
            Record {
                date,
                keywords,
                sentiment_score: Some(rng.gen_range(-1.0..1.0)),
                source_weight: None,
            }
        })
        .collect()
}

fn series(values: Vec<f64>) -> RegularSeries {
    RegularSeries::new("article_count", Frequency::Daily, start(), values).unwrap()
}

#[rstest]
#[case(Frequency::Daily, 7)]
#[case(Frequency::Weekly, 11)]
#[case(Frequency::Daily, 2024)]
fn test_series_have_no_gaps(#[case] frequency: Frequency, #[case] seed: u64) {
    let records = random_records(seed, 300);
    let set = SeriesBuilder::new(frequency, 3).build(&records).unwrap();

    let periods = set.primary.periods();
    for pair in periods.windows(2) {
        assert_eq!(pair[1] - pair[0], frequency.step());
    }

    let dated = records.iter().filter(|r| r.date.is_some()).count();
    assert_eq!(set.primary.total(), dated as f64);
    assert_eq!(set.dropped_records, records.len() - dated);

    for keyword in &set.keywords {
        assert_eq!(keyword.series.len(), set.primary.len());
        assert_eq!(keyword.series.first_period(), set.primary.first_period());
    }
}

#[test]
fn test_builder_is_idempotent() {
    let records = random_records(99, 200);
    let builder = SeriesBuilder::new(Frequency::Daily, 5);

    let first = builder.build(&records).unwrap();
    let second = builder.build(&records).unwrap();
    assert_eq!(first.primary, second.primary);
    let names = |set: &forecast_engine::SeriesSet| -> Vec<String> {
        set.keywords.iter().map(|k| k.series.name().to_string()).collect()
    };
    assert_eq!(names(&first), names(&second));
}

#[test]
fn test_features_never_look_ahead() {
    let mut rng = StdRng::seed_from_u64(5);
    let values: Vec<f64> = (0..60).map(|_| rng.gen_range(0..10) as f64).collect();
    let deriver = FeatureDeriver::new(&[1, 7, 14], &[7, 14, 28]).unwrap();
    let base = deriver.derive(&series(values.clone()), &[]).unwrap();

    for t in [0, 13, 30, 59] {
        let mut perturbed = values.clone();
        perturbed[t] += 1000.0;
        let frame = deriver.derive(&series(perturbed), &[]).unwrap();

        for row in 0..=t {
            assert_eq!(
                frame.feature_row(row).unwrap(),
                base.feature_row(row).unwrap(),
                "row {} changed after perturbing period {}",
                row,
                t
            );
        }
    }
}

#[rstest]
#[case(vec![3.0], 4)]
#[case(vec![1.0, 5.0, 2.0], 1)]
#[case(vec![0.0, 0.0, 9.0, 4.0], 10)]
fn test_naive_repeats_last_observation(#[case] values: Vec<f64>, #[case] horizon: usize) {
    let last = *values.last().unwrap();
    let data = TrainingSet::new(series(values));
    let forecast = NaiveModel::new().train(&data).unwrap().forecast(horizon).unwrap();
    assert_eq!(forecast.values(), vec![last; horizon].as_slice());
}

#[rstest]
#[case(7)]
#[case(3)]
fn test_seasonal_naive_replays_last_cycle(#[case] period: usize) {
    let values: Vec<f64> = (0..(3 * period + 2)).map(|i| (i * i % 11) as f64).collect();
    let cycle = values[values.len() - period..].to_vec();
    let data = TrainingSet::new(series(values));

    let forecast = SeasonalNaive::new(period)
        .unwrap()
        .train(&data)
        .unwrap()
        .forecast(2 * period)
        .unwrap();

    let expected: Vec<f64> = cycle.iter().chain(cycle.iter()).copied().collect();
    assert_eq!(forecast.values(), expected.as_slice());
}

#[test]
fn test_backtest_shorter_than_training_window_is_undefined() {
    let data = TrainingSet::new(series(vec![2.0; 20]));
    let report = Backtester::new(30, 5)
        .evaluate(&data, 7, ModelKind::HoltWinters, &ModelParams::default())
        .unwrap();
    assert!(report.folds.is_empty());
    assert_eq!(report.metrics.smape, None);
    assert_eq!(report.metrics.rmse, None);
}

#[rstest]
#[case(ModelKind::Naive)]
#[case(ModelKind::SeasonalNaive)]
#[case(ModelKind::HoltWinters)]
#[case(ModelKind::LightGbm)]
#[case(ModelKind::XgBoost)]
fn test_forecasts_are_finite(#[case] model: ModelKind) {
    let mut rng = StdRng::seed_from_u64(17);
    let values: Vec<f64> = (0..90)
        .map(|i| 5.0 + 3.0 * ((i % 7) as f64) + rng.gen_range(0.0..2.0))
        .collect();
    let data = TrainingSet::new(series(values));

    let forecast = model.fit_predict(&data, 14, &ModelParams::default()).unwrap();
    assert_eq!(forecast.values().len(), 14);
    assert!(forecast.values().iter().all(|v| v.is_finite()));
}
