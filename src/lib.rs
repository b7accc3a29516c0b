pub mod anomaly;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod load;
pub mod present;
pub mod structs;
pub mod transform;
pub mod weather;

// Re-export public API
pub use anomaly::compare;
pub use config::{AnalysisConfig, CityCatalog, DashboardConfig, WeatherConfig};
pub use dashboard::{PassInput, PassOutcome, run_pass};
pub use error::{DashboardError, Result};
pub use extract::read_records;
pub use load::{write_city_outputs, write_csv, write_json, write_parquet};
pub use present::{DashboardReport, build_chart, summary_lines};
pub use structs::{
    Assessment, CityAnalysis, LiveReading, Season, SeasonCalendar, SeasonalStats, SimpleLogger,
    TemperatureRecord, TemperatureUnit, Verdict,
};
pub use transform::{analyze_all_cities, analyze_city, convert_units};
pub use weather::WeatherClient;
