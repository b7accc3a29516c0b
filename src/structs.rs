use chrono::{DateTime, NaiveDate, Utc};
use log::{Log, Metadata, Record as LogRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Simple logger implementation. Writes to stderr so stdout stays a clean report.
pub struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &LogRecord) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// One row of the historical dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRecord {
    pub city: String,
    pub timestamp: NaiveDate,
    pub temperature: f64,
}

/// Calendar season a month belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Winter => write!(f, "winter"),
            Season::Spring => write!(f, "spring"),
            Season::Summer => write!(f, "summer"),
            Season::Autumn => write!(f, "autumn"),
        }
    }
}

/// Month to season lookup table. Index 0 is January.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonCalendar {
    pub months: [Season; 12],
}

impl SeasonCalendar {
    /// Returns the season for a 1-based month, or `None` outside 1..=12.
    pub fn season_of(&self, month: u32) -> Option<Season> {
        let index = usize::try_from(month).ok()?.checked_sub(1)?;
        self.months.get(index).copied()
    }
}

impl Default for SeasonCalendar {
    fn default() -> Self {
        use Season::*;
        Self {
            months: [
                Winter, Winter, Spring, Spring, Spring, Summer, Summer, Summer, Autumn, Autumn,
                Autumn, Winter,
            ],
        }
    }
}

/// Trailing-window statistics for one record. `None` means the window was not full.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollingStats {
    pub rolling_mean: Option<f64>,
    pub rolling_std: Option<f64>,
    pub upper_bound: Option<f64>,
    pub lower_bound: Option<f64>,
    pub is_outlier: bool,
}

/// A record together with the values derived from its position in the city series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: TemperatureRecord,
    pub season: Season,
    #[serde(flatten)]
    pub rolling: RollingStats,
}

/// Mean and sample standard deviation of all records of one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonStats {
    pub count: usize,
    pub mean: f64,
    /// Undefined for a single record.
    pub std: Option<f64>,
}

pub type SeasonalStats = BTreeMap<Season, SeasonStats>;

/// Descriptive statistics table for a temperature column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub percentile_25: f64,
    pub median: f64,
    pub percentile_75: f64,
    pub max: f64,
}

/// Everything the historical analysis produces for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityAnalysis {
    pub city: String,
    pub series: Vec<EnrichedRecord>,
    pub seasonal: SeasonalStats,
    pub summary: Option<DescriptiveStats>,
}

/// Current temperature as reported by the weather service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveReading {
    pub city: String,
    pub temperature: f64,
    pub retrieved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Normal,
    Anomalous,
    /// No usable history for the season.
    Indeterminate,
}

/// Outcome of comparing a reading against its seasonal band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub season: Season,
    pub reading: f64,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    pub verdict: Verdict,
}

/// Temperature unit conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl TemperatureUnit {
    pub fn convert_from_celsius(&self, temp_celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => temp_celsius,
            TemperatureUnit::Fahrenheit => temp_celsius * 9.0 / 5.0 + 32.0,
            TemperatureUnit::Kelvin => temp_celsius + 273.15,
        }
    }

    /// Value of the OpenWeatherMap `units` query parameter that yields this unit.
    pub fn api_units(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "metric",
            TemperatureUnit::Fahrenheit => "imperial",
            TemperatureUnit::Kelvin => "standard",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
            TemperatureUnit::Kelvin => "K",
        }
    }
}
