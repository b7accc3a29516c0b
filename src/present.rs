use crate::structs::{
    Assessment, CityAnalysis, DescriptiveStats, EnrichedRecord, LiveReading, SeasonalStats,
    TemperatureUnit, Verdict,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesMode {
    Lines,
    Markers,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStyle {
    pub color: &'static str,
    pub width: f64,
    pub dash: bool,
}

/// One `(timestamp, value)` sample; `None` renders as a gap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub timestamp: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub mode: SeriesMode,
    pub style: SeriesStyle,
    pub points: Vec<ChartPoint>,
}

/// Renderer-agnostic description of the historical band chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub series: Vec<ChartSeries>,
}

impl Chart {
    pub fn series(&self, name: &str) -> Option<&ChartSeries> {
        self.series.iter().find(|s| s.name == name)
    }
}

pub const TEMPERATURE_SERIES: &str = "Temperature";
pub const OUTLIER_SERIES: &str = "Outliers";

/// Builds the five chart series: temperature over non-outliers, rolling mean,
/// both bounds, and outlier markers.
pub fn build_chart(analysis: &CityAnalysis, window: usize, unit: TemperatureUnit) -> Chart {
    let (outliers, normal): (Vec<&EnrichedRecord>, Vec<&EnrichedRecord>) =
        analysis.series.iter().partition(|r| r.rolling.is_outlier);

    let all: Vec<&EnrichedRecord> = analysis.series.iter().collect();

    let bound_style = SeriesStyle {
        color: "orange",
        width: 1.0,
        dash: true,
    };

    Chart {
        title: format!("Historical temperature, {}", analysis.city),
        x_title: "Date".to_string(),
        y_title: format!("Temperature ({})", unit.symbol()),
        series: vec![
            ChartSeries {
                name: TEMPERATURE_SERIES.to_string(),
                mode: SeriesMode::Lines,
                style: SeriesStyle {
                    color: "blue",
                    width: 1.0,
                    dash: false,
                },
                points: points(&normal, |r| Some(r.record.temperature)),
            },
            ChartSeries {
                name: format!("Rolling mean ({} records)", window),
                mode: SeriesMode::Lines,
                style: SeriesStyle {
                    color: "green",
                    width: 2.0,
                    dash: false,
                },
                points: points(&all, |r| r.rolling.rolling_mean),
            },
            ChartSeries {
                name: "Upper bound".to_string(),
                mode: SeriesMode::Lines,
                style: bound_style.clone(),
                points: points(&all, |r| r.rolling.upper_bound),
            },
            ChartSeries {
                name: "Lower bound".to_string(),
                mode: SeriesMode::Lines,
                style: bound_style,
                points: points(&all, |r| r.rolling.lower_bound),
            },
            ChartSeries {
                name: OUTLIER_SERIES.to_string(),
                mode: SeriesMode::Markers,
                style: SeriesStyle {
                    color: "red",
                    width: 6.0,
                    dash: false,
                },
                points: points(&outliers, |r| Some(r.record.temperature)),
            },
        ],
    }
}

fn points(
    records: &[&EnrichedRecord],
    value: impl Fn(&EnrichedRecord) -> Option<f64>,
) -> Vec<ChartPoint> {
    records
        .iter()
        .map(|r| ChartPoint {
            timestamp: r.record.timestamp,
            value: value(*r),
        })
        .collect()
}

/// Everything one pass produced, as written to the report file.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub city: String,
    pub unit: TemperatureUnit,
    pub summary: Option<DescriptiveStats>,
    pub seasonal: SeasonalStats,
    pub live: Option<LiveReading>,
    pub assessment: Option<Assessment>,
    pub summary_lines: Vec<String>,
    /// Verbatim error of the weather section, if it failed.
    pub weather_error: Option<String>,
}

impl DashboardReport {
    pub fn historical(analysis: &CityAnalysis, unit: TemperatureUnit) -> Self {
        Self {
            city: analysis.city.clone(),
            unit,
            summary: analysis.summary.clone(),
            seasonal: analysis.seasonal.clone(),
            live: None,
            assessment: None,
            summary_lines: Vec::new(),
            weather_error: None,
        }
    }

    pub fn with_live(mut self, reading: LiveReading, assessment: Assessment) -> Self {
        self.summary_lines = summary_lines(&reading, &assessment, self.unit).to_vec();
        self.live = Some(reading);
        self.assessment = Some(assessment);
        self
    }

    pub fn with_weather_error(mut self, message: String) -> Self {
        self.weather_error = Some(message);
        self
    }
}

/// The two summary lines: current reading, then verdict.
pub fn summary_lines(
    reading: &LiveReading,
    assessment: &Assessment,
    unit: TemperatureUnit,
) -> [String; 2] {
    let first = format!(
        "Current temperature in {} is {}{}",
        reading.city,
        reading.temperature,
        unit.symbol()
    );
    let second = match assessment.verdict {
        Verdict::Normal => format!(
            "Temperature is normal for {} according to historical data",
            assessment.season
        ),
        Verdict::Anomalous => format!(
            "Temperature is anomalous for {} according to historical data",
            assessment.season
        ),
        Verdict::Indeterminate => format!(
            "Not enough historical data for {} to judge the current temperature",
            assessment.season
        ),
    };
    [first, second]
}

/// Plain-text descriptive statistics table.
pub fn render_describe(stats: Option<&DescriptiveStats>) -> String {
    let Some(s) = stats else {
        return "No historical records for this city\n".to_string();
    };
    let mut out = String::new();
    let rows: [(&str, Option<f64>); 7] = [
        ("mean", Some(s.mean)),
        ("std", s.std),
        ("min", Some(s.min)),
        ("25%", Some(s.percentile_25)),
        ("50%", Some(s.median)),
        ("75%", Some(s.percentile_75)),
        ("max", Some(s.max)),
    ];
    let _ = writeln!(out, "{:<6}{:>10}", "count", s.count);
    for (label, value) in rows {
        let _ = writeln!(out, "{:<6}{:>10}", label, format_value(value));
    }
    out
}

/// Plain-text seasonal statistics table.
pub fn render_seasonal(stats: &SeasonalStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<8}{:>7}{:>10}{:>10}", "season", "count", "mean", "std");
    for (season, s) in stats {
        let _ = writeln!(
            out,
            "{:<8}{:>7}{:>10}{:>10}",
            season.to_string(),
            s.count,
            format_value(Some(s.mean)),
            format_value(s.std)
        );
    }
    out
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}
