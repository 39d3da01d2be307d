use chrono::{Duration, NaiveDate};
use forecast_engine::models::exponential_smoothing::HoltWinters;
use forecast_engine::models::TrainedForecastModel;
use forecast_engine::{
    Backtester, ForecastConfig, ForecastModel, Forecaster, Frequency, ModelKind, ModelParams,
    Record, SeriesBuilder, TrainingSet,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Forecast Engine: Basic Forecasting Example");
    println!("==========================================\n");

    // Synthetic coverage: busier on weekdays, with a slowly rising topic
    let records = create_sample_records()?;
    println!("Created {} sample records\n", records.len());

    // Build the regular series
    let set = SeriesBuilder::new(Frequency::Daily, 2).build(&records)?;
    println!(
        "Primary series: {} periods from {} to {}",
        set.primary.len(),
        set.primary.first_period(),
        set.primary.last_period()
    );
    for keyword in &set.keywords {
        println!("  {} -> {} (total {})", keyword.keyword, keyword.series.name(), keyword.series.total());
    }

    // Fit one model directly
    let data = TrainingSet::new(set.primary.clone());
    let trained = HoltWinters::new(7)?.train(&data)?;
    let forecast = trained.forecast(7)?;
    println!("\n{} forecast: {:?}", trained.name(), forecast.values());

    // Compare strategies with a rolling-origin backtest
    println!("\nBacktest (min train 30, horizon 7):");
    let backtester = Backtester::new(30, 5);
    for model in [ModelKind::Naive, ModelKind::SeasonalNaive, ModelKind::HoltWinters, ModelKind::XgBoost] {
        let report = backtester.evaluate(&data, 7, model, &ModelParams::default())?;
        println!(
            "  {:<12} folds={} smape={:?} rmse={:?}",
            model.to_string(),
            report.folds.len(),
            report.metrics.smape,
            report.metrics.rmse
        );
    }

    // Full run with keyword series
    let config = ForecastConfig {
        model: ModelKind::LightGbm,
        horizon: 7,
        top_k_keywords: 2,
        ..Default::default()
    };
    let report = Forecaster::new(config)?.run_records(&records, "example", chrono::Utc::now())?;
    println!("\nFull run:\n{}", report.to_json_pretty()?);

    Ok(())
}

fn create_sample_records() -> Result<Vec<Record>, Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("invalid start date")?;
    let mut records = Vec::new();

    for day in 0..90i64 {
        let date = start + Duration::days(day);
        let weekday_boost = if day % 7 < 5 { 3 } else { 0 };
        let count = 2 + weekday_boost + (day / 30) as usize;

        for i in 0..count {
            let mut tags = vec!["energy".to_string()];
            if i % 3 == 0 {
                tags.push("Battery Storage".to_string());
            }
            if day > 45 && i % 2 == 0 {
                tags.push("grid".to_string());
            }
            records.push(Record::dated(date, tags));
        }
    }

    Ok(records)
}
