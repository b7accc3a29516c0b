use arrow_schema::ArrowError;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parquet Error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("Arrow Error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("Data Error: {0}")]
    Data(String),
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config Error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),
    #[error("Unknown city: {0}")]
    UnknownCity(String),
    #[error("HTTP Error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Weather request timed out after {0:.1?}")]
    Timeout(std::time::Duration),
    #[error("Weather API returned {status}: {body}")]
    WeatherApi {
        status: u16,
        body: serde_json::Value,
    },
    #[error("Malformed weather response: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
