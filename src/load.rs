use crate::error::Result;
use crate::present::{Chart, DashboardReport};
use crate::structs::{CityAnalysis, EnrichedRecord};
use arrow_array::{BooleanArray, Date32Array, Float64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use chrono::{Datelike, NaiveDate};
use csv::Writer;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use std::{fs::File, path::Path, sync::Arc};

/// Writes the enriched city series to CSV. Undefined statistics are empty cells.
///
/// # Arguments
/// * `series` - Enriched records of one city, in timestamp order
/// * `output_path` - Path where the CSV file will be created
///
/// # Errors
/// Returns error if file cannot be created or written to.
pub fn write_csv(series: &[EnrichedRecord], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record([
        "city",
        "timestamp",
        "temperature",
        "season",
        "rolling_mean",
        "rolling_std",
        "upper_bound",
        "lower_bound",
        "is_outlier",
    ])?;

    for r in series {
        writer.write_record(&[
            r.record.city.clone(),
            r.record.timestamp.to_string(),
            format!("{:.2}", r.record.temperature),
            r.season.to_string(),
            optional_cell(r.rolling.rolling_mean),
            optional_cell(r.rolling.rolling_std),
            optional_cell(r.rolling.upper_bound),
            optional_cell(r.rolling.lower_bound),
            r.rolling.is_outlier.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes any serializable value (chart, report, multi-city summary) as pretty JSON.
pub fn write_json<T: Serialize + ?Sized>(value: &T, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

/// Writes the enriched city series to Parquet. Undefined statistics are nulls.
///
/// # Errors
/// Returns error if file cannot be created, schema is invalid, or Arrow operations fail.
pub fn write_parquet(series: &[EnrichedRecord], output_path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("city", DataType::Utf8, false),
        Field::new("timestamp", DataType::Date32, false),
        Field::new("temperature", DataType::Float64, false),
        Field::new("season", DataType::Utf8, false),
        Field::new("rolling_mean", DataType::Float64, true),
        Field::new("rolling_std", DataType::Float64, true),
        Field::new("upper_bound", DataType::Float64, true),
        Field::new("lower_bound", DataType::Float64, true),
        Field::new("is_outlier", DataType::Boolean, false),
    ]));

    let cities = StringArray::from_iter_values(series.iter().map(|r| r.record.city.as_str()));
    let timestamps: Date32Array = series
        .iter()
        .map(|r| Some(days_since_epoch(r.record.timestamp)))
        .collect();
    let temps: Float64Array = series.iter().map(|r| Some(r.record.temperature)).collect();
    let seasons = StringArray::from_iter_values(series.iter().map(|r| r.season.to_string()));
    let means: Float64Array = series.iter().map(|r| r.rolling.rolling_mean).collect();
    let stds: Float64Array = series.iter().map(|r| r.rolling.rolling_std).collect();
    let uppers: Float64Array = series.iter().map(|r| r.rolling.upper_bound).collect();
    let lowers: Float64Array = series.iter().map(|r| r.rolling.lower_bound).collect();
    let outliers: BooleanArray = series.iter().map(|r| Some(r.rolling.is_outlier)).collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(cities),
            Arc::new(timestamps),
            Arc::new(temps),
            Arc::new(seasons),
            Arc::new(means),
            Arc::new(stds),
            Arc::new(uppers),
            Arc::new(lowers),
            Arc::new(outliers),
        ],
    )?;

    let file = File::create(output_path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

/// Writes the per-city analysis files into `output_dir`, named after `base`.
pub fn write_city_outputs(
    analysis: &CityAnalysis,
    chart: &Chart,
    report: &DashboardReport,
    output_dir: &Path,
    base: &str,
) -> Result<()> {
    write_csv(&analysis.series, &output_dir.join(format!("{}_series.csv", base)))?;
    write_parquet(&analysis.series, &output_dir.join(format!("{}_series.parquet", base)))?;
    write_json(chart, &output_dir.join(format!("{}_chart.json", base)))?;
    write_json(report, &output_dir.join(format!("{}_report.json", base)))?;
    Ok(())
}

fn optional_cell(value: Option<f64>) -> String {
    value.map(|v| format!("{:.4}", v)).unwrap_or_default()
}

/// Arrow Date32 value: days since 1970-01-01.
fn days_since_epoch(date: NaiveDate) -> i32 {
    const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}
