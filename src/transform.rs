use crate::config::AnalysisConfig;
use crate::structs::{
    CityAnalysis, DescriptiveStats, EnrichedRecord, RollingStats, Season, SeasonCalendar,
    SeasonStats, SeasonalStats, TemperatureRecord, TemperatureUnit,
};
use chrono::Datelike;
use log::{debug, warn};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Converts Celsius source records into the configured unit.
pub fn convert_units(
    records: Vec<TemperatureRecord>,
    unit: TemperatureUnit,
) -> Vec<TemperatureRecord> {
    if unit == TemperatureUnit::Celsius {
        return records;
    }
    debug!("Converting {} records to {:?}", records.len(), unit);
    records
        .into_iter()
        .map(|r| TemperatureRecord {
            temperature: unit.convert_from_celsius(r.temperature),
            ..r
        })
        .collect()
}

/// Returns the records of one city, ordered by timestamp.
///
/// The sort is stable, so rows sharing a timestamp keep their file order.
pub fn filter_city(records: &[TemperatureRecord], city: &str) -> Vec<TemperatureRecord> {
    let mut series: Vec<TemperatureRecord> =
        records.iter().filter(|r| r.city == city).cloned().collect();
    series.sort_by_key(|r| r.timestamp);
    series
}

/// Runs the full historical analysis for one city.
///
/// # Arguments
///
/// * `records` - The whole dataset, any order
/// * `city` - City to analyze; an absent city gives an empty analysis
/// * `config` - Window length, band threshold and season calendar
///
/// # Returns
///
/// The enriched series, the per-season statistics computed from that same
/// series, and the descriptive statistics of its temperature column.
pub fn analyze_city(
    records: &[TemperatureRecord],
    city: &str,
    config: &AnalysisConfig,
) -> CityAnalysis {
    let series = filter_city(records, city);
    debug!("{} records matched city '{}'", series.len(), city);
    if series.is_empty() {
        warn!("No historical records for '{}'", city);
    }

    let enriched = enrich(series, config);
    let outliers = enriched.iter().filter(|r| r.rolling.is_outlier).count();
    debug!("Flagged {} outliers for '{}'", outliers, city);

    let temps: Vec<f64> = enriched.iter().map(|r| r.record.temperature).collect();
    CityAnalysis {
        city: city.to_string(),
        seasonal: seasonal_stats(&enriched),
        summary: describe(&temps),
        series: enriched,
    }
}

/// Analyzes every city present in the dataset in parallel, sorted by city name.
pub fn analyze_all_cities(
    records: &[TemperatureRecord],
    config: &AnalysisConfig,
) -> Vec<CityAnalysis> {
    let cities: BTreeSet<&str> = records.iter().map(|r| r.city.as_str()).collect();
    debug!("Analyzing {} cities", cities.len());

    let mut results: Vec<CityAnalysis> = cities
        .into_par_iter()
        .map(|city| analyze_city(records, city, config))
        .collect();
    results.sort_by(|a, b| a.city.cmp(&b.city));
    results
}

/// Attaches rolling statistics and a season to each record of a sorted series.
pub fn enrich(series: Vec<TemperatureRecord>, config: &AnalysisConfig) -> Vec<EnrichedRecord> {
    let temps: Vec<f64> = series.iter().map(|r| r.temperature).collect();
    let rolling = rolling_stats(&temps, config.window, config.threshold);

    series
        .into_iter()
        .zip(rolling)
        .map(|(record, rolling)| EnrichedRecord {
            season: season_for(&config.calendar, &record),
            record,
            rolling,
        })
        .collect()
}

/// Computes trailing-window statistics and the outlier flag for each value.
///
/// The first `window - 1` entries have no defined statistic and are never outliers.
/// Standard deviation uses the sample (N-1) denominator.
pub fn rolling_stats(temps: &[f64], window: usize, threshold: f64) -> Vec<RollingStats> {
    (0..temps.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return RollingStats::default();
            }
            let values = &temps[i + 1 - window..=i];
            let (mean, std) = mean_std(values);
            let std = match std {
                Some(s) => s,
                None => return RollingStats::default(),
            };
            let upper = mean + threshold * std;
            let lower = mean - threshold * std;
            let value = temps[i];
            RollingStats {
                rolling_mean: Some(mean),
                rolling_std: Some(std),
                upper_bound: Some(upper),
                lower_bound: Some(lower),
                is_outlier: value < lower || value > upper,
            }
        })
        .collect()
}

/// Groups an enriched series by season and computes mean and sample std per group.
///
/// Seasons without records have no entry.
pub fn seasonal_stats(enriched: &[EnrichedRecord]) -> SeasonalStats {
    let mut groups: BTreeMap<_, Vec<f64>> = BTreeMap::new();
    for r in enriched {
        groups.entry(r.season).or_default().push(r.record.temperature);
    }

    groups
        .into_iter()
        .map(|(season, temps)| {
            let (mean, std) = mean_std(&temps);
            (
                season,
                SeasonStats {
                    count: temps.len(),
                    mean,
                    std,
                },
            )
        })
        .collect()
}

/// Descriptive statistics of a temperature column: count, mean, std, min, quartiles, max.
///
/// Returns `None` for an empty column.
pub fn describe(temps: &[f64]) -> Option<DescriptiveStats> {
    if temps.is_empty() {
        return None;
    }
    let mut sorted = temps.to_vec();
    sorted.sort_by(f64::total_cmp);
    let (mean, std) = mean_std(&sorted);

    Some(DescriptiveStats {
        count: sorted.len(),
        mean,
        std,
        min: sorted[0],
        percentile_25: calculate_percentile(&sorted, 25.0),
        median: calculate_percentile(&sorted, 50.0),
        percentile_75: calculate_percentile(&sorted, 75.0),
        max: sorted[sorted.len() - 1],
    })
}

fn season_for(calendar: &SeasonCalendar, record: &TemperatureRecord) -> Season {
    // chrono months are always 1..=12
    calendar
        .season_of(record.timestamp.month())
        .unwrap_or(calendar.months[0])
}

/// Mean and sample standard deviation; std is `None` below two values.
fn mean_std(values: &[f64]) -> (f64, Option<f64>) {
    if values.is_empty() {
        return (f64::NAN, None);
    }
    let n = values.len() as f64;
    let first = values[0];
    // Summing drifts for constants like 0.1; a flat window is exact.
    if values.iter().all(|&v| v == first) {
        return (first, (values.len() >= 2).then_some(0.0));
    }
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, Some(variance.sqrt()))
}

/// Percentile of already sorted data, linear interpolation between closest ranks.
fn calculate_percentile(sorted_data: &[f64], percentile: f64) -> f64 {
    let index = (percentile / 100.0) * (sorted_data.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted_data[lower]
    } else {
        let weight = index - lower as f64;
        sorted_data[lower] * (1.0 - weight) + sorted_data[upper] * weight
    }
}
