//! Current-conditions client for an OpenWeatherMap-compatible endpoint.

use crate::config::WeatherConfig;
use crate::error::{DashboardError, Result};
use crate::structs::{LiveReading, TemperatureUnit};
use chrono::Utc;
use log::{debug, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::{thread, time::Duration};

const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";

/// The part of the current-weather response we read.
#[derive(Debug, Deserialize)]
pub struct CurrentWeatherResponse {
    pub main: MainReadings,
}

#[derive(Debug, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
}

/// Blocking weather client with a bounded per-request timeout.
pub struct WeatherClient {
    client: Client,
    config: WeatherConfig,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { client, config })
    }

    /// Fetches the current temperature for `city` in `unit`.
    ///
    /// Timeouts, transport failures and 5xx answers are retried up to
    /// `retries` times with exponential backoff. A 4xx answer is returned
    /// immediately as `DashboardError::WeatherApi` carrying the response body.
    pub fn fetch_current(
        &self,
        city: &str,
        api_key: &str,
        unit: TemperatureUnit,
    ) -> Result<LiveReading> {
        let mut attempt = 0;
        loop {
            match self.request_once(city, api_key, unit) {
                Ok(temperature) => {
                    return Ok(LiveReading {
                        city: city.to_string(),
                        temperature,
                        retrieved_at: Utc::now(),
                    });
                }
                Err(err) if attempt < self.config.retries && is_retryable(&err) => {
                    let factor = 1u64 << attempt.min(16);
                    let delay = Duration::from_millis(self.config.backoff_ms.saturating_mul(factor));
                    warn!(
                        "Weather request failed ({}), retrying in {:?} ({}/{})",
                        err,
                        delay,
                        attempt + 1,
                        self.config.retries
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn request_once(&self, city: &str, api_key: &str, unit: TemperatureUnit) -> Result<f64> {
        let url = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            CURRENT_WEATHER_PATH
        );
        debug!("GET {} q={} units={}", url, city, unit.api_units());

        let response = self
            .client
            .get(&url)
            .query(&[("q", city), ("appid", api_key), ("units", unit.api_units())])
            .header("Accept", "application/json")
            .send()
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().map_err(|e| self.classify(e))?;
            return Err(DashboardError::WeatherApi {
                status: status.as_u16(),
                body: error_payload(&body),
            });
        }
        let parsed: CurrentWeatherResponse = response.json().map_err(|e| {
            if e.is_decode() {
                DashboardError::MalformedResponse(e.to_string())
            } else {
                self.classify(e)
            }
        })?;
        current_temperature(parsed)
    }

    fn classify(&self, err: reqwest::Error) -> DashboardError {
        if err.is_timeout() {
            DashboardError::Timeout(self.config.timeout())
        } else {
            DashboardError::Http(err)
        }
    }
}

/// Extracts `main.temp` from a current-weather JSON body.
pub fn parse_current_temperature(body: &str) -> Result<f64> {
    let parsed: CurrentWeatherResponse = serde_json::from_str(body)
        .map_err(|e| DashboardError::MalformedResponse(e.to_string()))?;
    current_temperature(parsed)
}

fn current_temperature(parsed: CurrentWeatherResponse) -> Result<f64> {
    if !parsed.main.temp.is_finite() {
        return Err(DashboardError::MalformedResponse(
            "main.temp is not a finite number".to_string(),
        ));
    }
    Ok(parsed.main.temp)
}

/// The body of an error answer, as JSON when possible, else as a JSON string.
fn error_payload(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
}

fn is_retryable(err: &DashboardError) -> bool {
    match err {
        DashboardError::Timeout(_) | DashboardError::Http(_) => true,
        DashboardError::WeatherApi { status, .. } => *status >= 500,
        _ => false,
    }
}
