//! End-to-end render passes: dataset file -> analysis -> verdict -> output files.

use chrono::{Duration, NaiveDate};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tempwatch::present::{OUTLIER_SERIES, TEMPERATURE_SERIES};
use tempwatch::*;

fn write_dataset(dir: &Path, rows: &[(&str, NaiveDate, f64)]) -> std::path::PathBuf {
    let mut text = String::from("city,timestamp,temperature\n");
    for (city, date, temp) in rows {
        writeln!(text, "{},{},{}", city, date, temp).unwrap();
    }
    let path = dir.join("history.csv");
    fs::write(&path, text).unwrap();
    path
}

fn london_spike_rows() -> Vec<(&'static str, NaiveDate, f64)> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let mut rows: Vec<(&str, NaiveDate, f64)> = (0..35)
        .map(|i| {
            let temp = if i == 34 { 50.0 } else { 10.0 };
            ("London", start + Duration::days(i), temp)
        })
        .collect();
    // Another city interleaved, and London rows out of order.
    rows.push(("Paris", start, 3.0));
    rows.swap(0, 20);
    rows
}

#[test]
fn london_spike_is_the_only_outlier() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dataset(dir.path(), &london_spike_rows());

    let records = read_records(&path).unwrap();
    assert_eq!(records.len(), 36);
    let analysis = analyze_city(&records, "London", &AnalysisConfig::default());
    assert_eq!(analysis.series.len(), 35);

    assert!(analysis.series[34].rolling.is_outlier);
    for (i, r) in analysis.series.iter().enumerate().take(34) {
        assert!(!r.rolling.is_outlier, "index {i} flagged");
    }
    for r in &analysis.series[29..34] {
        assert_eq!(r.rolling.rolling_std, Some(0.0));
    }

    let chart = build_chart(&analysis, 30, TemperatureUnit::Celsius);
    assert_eq!(chart.series(OUTLIER_SERIES).unwrap().points.len(), 1);
    assert_eq!(chart.series(TEMPERATURE_SERIES).unwrap().points.len(), 34);
}

#[test]
fn january_reading_is_judged_against_winter() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dataset(dir.path(), &london_spike_rows());
    let records = read_records(&path).unwrap();
    let config = AnalysisConfig::default();
    let analysis = analyze_city(&records, "London", &config);

    // All 35 records fall in January/February.
    assert_eq!(analysis.seasonal.len(), 1);
    let winter = &analysis.seasonal[&Season::Winter];
    assert_eq!(winter.count, 35);

    let normal = compare(winter.mean, 1, &analysis.seasonal, &config.calendar, 2.0).unwrap();
    assert_eq!(normal.season, Season::Winter);
    assert_eq!(normal.verdict, Verdict::Normal);

    let hot = compare(40.0, 1, &analysis.seasonal, &config.calendar, 2.0).unwrap();
    assert_eq!(hot.verdict, Verdict::Anomalous);
}

#[test]
fn october_without_autumn_history_is_indeterminate() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dataset(dir.path(), &london_spike_rows());
    let records = read_records(&path).unwrap();
    let config = AnalysisConfig::default();
    let analysis = analyze_city(&records, "London", &config);

    assert!(!analysis.seasonal.contains_key(&Season::Autumn));
    let assessment = compare(12.0, 10, &analysis.seasonal, &config.calendar, 2.0).unwrap();
    assert_eq!(assessment.season, Season::Autumn);
    assert_eq!(assessment.verdict, Verdict::Indeterminate);
}

#[test]
fn report_and_series_files_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dataset(dir.path(), &london_spike_rows());
    let records = read_records(&path).unwrap();
    let analysis = analyze_city(&records, "London", &AnalysisConfig::default());
    let chart = build_chart(&analysis, 30, TemperatureUnit::Celsius);

    let reading = LiveReading {
        city: "London".to_string(),
        temperature: 11.0,
        retrieved_at: chrono::Utc::now(),
    };
    let assessment = compare(
        reading.temperature,
        10,
        &analysis.seasonal,
        &SeasonCalendar::default(),
        2.0,
    )
    .unwrap();
    let report =
        DashboardReport::historical(&analysis, TemperatureUnit::Celsius).with_live(reading, assessment);
    assert_eq!(report.summary_lines.len(), 2);

    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    write_city_outputs(&analysis, &chart, &report, &out, "london").unwrap();

    for name in [
        "london_series.csv",
        "london_series.parquet",
        "london_chart.json",
        "london_report.json",
    ] {
        assert!(out.join(name).exists(), "{name} missing");
    }

    let report_json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("london_report.json")).unwrap()).unwrap();
    assert_eq!(report_json["assessment"]["verdict"], "indeterminate");
    assert_eq!(report_json["seasonal"]["winter"]["count"], 35);

    let chart_json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("london_chart.json")).unwrap()).unwrap();
    assert_eq!(chart_json["series"].as_array().unwrap().len(), 5);
    assert!(chart_json["series"][1]["points"][0]["value"].is_null());
}

#[test]
fn all_cities_share_one_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dataset(dir.path(), &london_spike_rows());
    let records = read_records(&path).unwrap();
    let all = analyze_all_cities(&records, &AnalysisConfig::default());
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].city, "London");
    assert_eq!(all[1].city, "Paris");
    assert_eq!(all[1].seasonal[&Season::Winter].std, None);
}

#[test]
fn unsupported_file_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.xlsx");
    fs::write(&path, b"not a spreadsheet").unwrap();
    assert!(matches!(
        read_records(&path),
        Err(DashboardError::UnsupportedFormat(_))
    ));
}

#[test]
fn pass_without_input_file_analyzes_nothing() {
    let input = PassInput {
        city: Some("London".to_string()),
        api_key: Some("secret".to_string()),
        ..PassInput::default()
    };
    assert!(run_pass(&DashboardConfig::default(), &input).unwrap().is_none());
}

#[test]
fn pass_with_blank_api_key_skips_live_section() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dataset(dir.path(), &london_spike_rows());
    let mut config = DashboardConfig::default();
    // Nothing listens here; a request would surface as a weather error.
    config.weather.base_url = "http://127.0.0.1:1".to_string();

    for api_key in [None, Some(String::new()), Some("  \t".to_string())] {
        let input = PassInput {
            input_file: Some(path.clone()),
            city: Some("London".to_string()),
            api_key,
            month: Some(1),
            all_cities: true,
        };
        let outcome = run_pass(&config, &input).unwrap().unwrap();
        assert_eq!(outcome.records, 36);
        assert_eq!(outcome.analysis.series.len(), 35);
        assert_eq!(outcome.all_cities.len(), 2);
        assert!(outcome.report.live.is_none());
        assert!(outcome.report.assessment.is_none());
        assert!(outcome.report.summary_lines.is_empty());
        assert!(outcome.report.weather_error.is_none());
    }
}

#[test]
fn pass_keeps_weather_failure_in_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_dataset(dir.path(), &london_spike_rows());
    let mut config = DashboardConfig::default();
    config.weather.base_url = "http://127.0.0.1:1".to_string();
    config.weather.timeout_secs = 1.0;

    let input = PassInput {
        input_file: Some(path),
        api_key: Some("secret".to_string()),
        city: Some("London".to_string()),
        month: Some(1),
        all_cities: false,
    };
    let outcome = run_pass(&config, &input).unwrap().unwrap();
    assert!(outcome.report.live.is_none());
    assert!(outcome.report.weather_error.is_some());
    assert_eq!(outcome.report.seasonal[&Season::Winter].count, 35);
}
