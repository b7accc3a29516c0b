use crate::error::{DashboardError, Result};
use crate::structs::{SeasonCalendar, TemperatureUnit};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

/// Cities offered by default.
pub const DEFAULT_CITIES: [&str; 15] = [
    "New York",
    "London",
    "Paris",
    "Tokyo",
    "Moscow",
    "Sydney",
    "Berlin",
    "Beijing",
    "Rio de Janeiro",
    "Dubai",
    "Los Angeles",
    "Singapore",
    "Mumbai",
    "Cairo",
    "Mexico City",
];

pub const DEFAULT_WEATHER_URL: &str = "http://api.openweathermap.org";

/// Parameters of the historical analysis and the anomaly band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rolling window length, in records.
    pub window: usize,
    /// Band half-width, in standard deviations.
    pub threshold: f64,
    pub unit: TemperatureUnit,
    pub calendar: SeasonCalendar,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window: 30,
            threshold: 2.0,
            unit: TemperatureUnit::Celsius,
            calendar: SeasonCalendar::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub base_url: String,
    pub timeout_secs: f64,
    /// Extra attempts after a timeout, transport error or 5xx.
    pub retries: u32,
    pub backoff_ms: u64,
}

impl WeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs.max(0.0))
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEATHER_URL.to_string(),
            timeout_secs: 5.0,
            retries: 0,
            backoff_ms: 500,
        }
    }
}

/// Selectable cities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityCatalog(pub Vec<String>);

impl CityCatalog {
    pub fn contains(&self, city: &str) -> bool {
        self.0.iter().any(|c| c == city)
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Resolves the user's choice, falling back to the first entry like a select box.
    pub fn select(&self, city: Option<&str>) -> Result<String> {
        match city {
            Some(c) if self.contains(c) => Ok(c.to_string()),
            Some(c) => Err(DashboardError::UnknownCity(c.to_string())),
            None => self
                .first()
                .map(str::to_string)
                .ok_or_else(|| DashboardError::Data("City list is empty".to_string())),
        }
    }
}

impl Default for CityCatalog {
    fn default() -> Self {
        Self(DEFAULT_CITIES.iter().map(|c| c.to_string()).collect())
    }
}

/// Whole configuration file. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub analysis: AnalysisConfig,
    pub weather: WeatherConfig,
    pub cities: CityCatalog,
}

impl DashboardConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: DashboardConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading config file: {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.analysis.window < 2 {
            return Err(DashboardError::Data(format!(
                "Rolling window must be at least 2, got {}",
                self.analysis.window
            )));
        }
        if !self.analysis.threshold.is_finite() || self.analysis.threshold < 0.0 {
            return Err(DashboardError::Data(format!(
                "Threshold must be a non-negative number, got {}",
                self.analysis.threshold
            )));
        }
        if !self.weather.timeout_secs.is_finite() || self.weather.timeout_secs <= 0.0 {
            return Err(DashboardError::Data(format!(
                "Weather timeout must be a positive number of seconds, got {}",
                self.weather.timeout_secs
            )));
        }
        if self.cities.0.is_empty() {
            return Err(DashboardError::Data("City list is empty".to_string()));
        }
        Ok(())
    }
}
