//! One render pass of the dashboard, independent of the CLI.

use crate::anomaly::compare;
use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::extract::read_records;
use crate::present::{Chart, DashboardReport, build_chart};
use crate::structs::CityAnalysis;
use crate::transform::{analyze_all_cities, analyze_city, convert_units};
use crate::weather::WeatherClient;
use chrono::{Datelike, Local};
use log::{debug, error, info};
use std::path::PathBuf;

/// User choices for a single pass.
#[derive(Debug, Clone, Default)]
pub struct PassInput {
    pub input_file: Option<PathBuf>,
    /// Defaults to the first catalog city.
    pub city: Option<String>,
    pub api_key: Option<String>,
    /// Month (1-12) of the live reading. Defaults to the current month.
    pub month: Option<u32>,
    pub all_cities: bool,
}

/// What a pass produced.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    /// Number of records in the dataset, all cities included.
    pub records: usize,
    pub analysis: CityAnalysis,
    pub chart: Chart,
    pub report: DashboardReport,
    /// Every city of the dataset, filled only when `all_cities` is set.
    pub all_cities: Vec<CityAnalysis>,
}

impl PassInput {
    /// The API key, unless it is missing or blank.
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// Runs the historical section and, with a usable API key, the live section.
///
/// Returns `Ok(None)` when no input file is given. A failed weather request
/// is kept in the report instead of failing the pass.
pub fn run_pass(config: &DashboardConfig, input: &PassInput) -> Result<Option<PassOutcome>> {
    config.validate()?;
    let analysis_config = &config.analysis;
    let unit = analysis_config.unit;
    let city = config.cities.select(input.city.as_deref())?;
    debug!(
        "City: {} | Unit: {:?} | Window: {} | Threshold: {} std devs",
        city, unit, analysis_config.window, analysis_config.threshold
    );

    let Some(input_file) = &input.input_file else {
        info!("No input file supplied, nothing to analyze");
        return Ok(None);
    };

    let records = convert_units(read_records(input_file)?, unit);
    let analysis = analyze_city(&records, &city, analysis_config);
    let chart = build_chart(&analysis, analysis_config.window, unit);
    let mut report = DashboardReport::historical(&analysis, unit);

    match input.usable_api_key() {
        None => info!("No API key supplied, skipping current temperature analysis"),
        Some(api_key) => {
            let month = input.month.unwrap_or_else(|| Local::now().month());
            let live = WeatherClient::new(config.weather.clone())
                .and_then(|client| client.fetch_current(&city, api_key, unit));
            match live {
                Ok(reading) => {
                    let assessment = compare(
                        reading.temperature,
                        month,
                        &analysis.seasonal,
                        &analysis_config.calendar,
                        analysis_config.threshold,
                    )?;
                    report = report.with_live(reading, assessment);
                }
                Err(DashboardError::WeatherApi { status, body }) => {
                    error!("Weather API returned status {}", status);
                    report = report.with_weather_error(body.to_string());
                }
                Err(err) => {
                    error!("{}", err);
                    report = report.with_weather_error(err.to_string());
                }
            }
        }
    }

    let all_cities = if input.all_cities {
        analyze_all_cities(&records, analysis_config)
    } else {
        Vec::new()
    };

    Ok(Some(PassOutcome {
        records: records.len(),
        analysis,
        chart,
        report,
        all_cities,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_keys_are_not_usable() {
        let mut input = PassInput::default();
        assert_eq!(input.usable_api_key(), None);
        input.api_key = Some("   ".to_string());
        assert_eq!(input.usable_api_key(), None);
        input.api_key = Some("abc".to_string());
        assert_eq!(input.usable_api_key(), Some("abc"));
    }

    #[test]
    fn unknown_city_fails_before_reading() {
        let input = PassInput {
            city: Some("Atlantis".to_string()),
            ..PassInput::default()
        };
        assert!(matches!(
            run_pass(&DashboardConfig::default(), &input),
            Err(DashboardError::UnknownCity(_))
        ));
    }
}
