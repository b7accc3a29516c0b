use crate::error::{DashboardError, Result};
use crate::structs::TemperatureRecord;
use arrow_array::types::{
    ArrowTemporalType, Date32Type, Date64Type, TimestampMicrosecondType,
    TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType,
};
use arrow_array::{
    Array, ArrayRef, Float64Array, GenericStringArray, OffsetSizeTrait, PrimitiveArray,
    RecordBatch, StringArray,
};
use arrow_schema::{DataType, TimeUnit};
use chrono::NaiveDate;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use std::{fs::File, io::Read, path::Path};

const DATE_FORMAT: &str = "%Y-%m-%d";
const REQUIRED_COLUMNS: [&str; 3] = ["city", "timestamp", "temperature"];

/// Supported input file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Parquet,
}

impl InputFormat {
    /// Picks the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(InputFormat::Csv),
            Some("parquet") | Some("pq") => Ok(InputFormat::Parquet),
            _ => Err(DashboardError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    city: String,
    timestamp: String,
    temperature: f64,
}

/// Reads temperature records from a CSV or Parquet file.
///
/// Fails on the first malformed row instead of returning a partial dataset.
pub fn read_records(path: &Path) -> Result<Vec<TemperatureRecord>> {
    let records = match InputFormat::from_path(path)? {
        InputFormat::Csv => {
            debug!("Reading CSV file: {}", path.display());
            read_csv(File::open(path)?)?
        }
        InputFormat::Parquet => {
            debug!("Reading Parquet file: {}", path.display());
            read_parquet(File::open(path)?)?
        }
    };
    debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Reads records from CSV text with a header row. Extra columns are ignored.
pub fn read_csv<R: Read>(input: R) -> Result<Vec<TemperatureRecord>> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(DashboardError::Data(format!("Column not found: {}", column)));
        }
    }

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row?;
        // header is line 1
        let line = index + 2;
        let timestamp = parse_date(&row.timestamp).ok_or_else(|| {
            DashboardError::Data(format!(
                "Invalid timestamp '{}' on line {}",
                row.timestamp, line
            ))
        })?;
        records.push(validated(row.city, timestamp, row.temperature, line)?);
    }
    Ok(records)
}

/// Reads records from a Parquet source.
///
/// `timestamp` may be stored as a string, Date32/Date64 or Timestamp column.
pub fn read_parquet(file: File) -> Result<Vec<TemperatureRecord>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;
        let city_col = get_column_str(&batch, "city")?;
        let temp_col = get_column_f64(&batch, "temperature")?;
        let timestamps = get_column_dates(&batch, "timestamp")?;

        for i in 0..batch.num_rows() {
            let row = records.len() + 1;
            if city_col.is_null(i) || temp_col.is_null(i) {
                return Err(DashboardError::Data(format!("Missing value in row {}", row)));
            }
            let timestamp = timestamps[i]
                .ok_or_else(|| DashboardError::Data(format!("Invalid timestamp in row {}", row)))?;
            records.push(validated(
                city_col.value(i).to_string(),
                timestamp,
                temp_col.value(i),
                row,
            )?);
        }
    }
    Ok(records)
}

/// Accepts `YYYY-MM-DD` and anything that starts with it (datetimes, RFC 3339).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let date_part = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

fn validated(
    city: String,
    timestamp: NaiveDate,
    temperature: f64,
    row: usize,
) -> Result<TemperatureRecord> {
    if !temperature.is_finite() {
        return Err(DashboardError::Data(format!(
            "Temperature is not a finite number in row {}",
            row
        )));
    }
    Ok(TemperatureRecord {
        city,
        timestamp,
        temperature,
    })
}

fn get_column_f64<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| DashboardError::Data(format!("Column not found: {}", name)))?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| DashboardError::Data(format!("Column {} is not Float64", name)))
}

fn get_column_str<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| DashboardError::Data(format!("Column not found: {}", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| DashboardError::Data(format!("Column {} is not Utf8/String", name)))
}

/// Dates of a `timestamp` column stored as a string, date or timestamp type.
fn get_column_dates(batch: &RecordBatch, name: &str) -> Result<Vec<Option<NaiveDate>>> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| DashboardError::Data(format!("Column not found: {}", name)))?;

    match column.data_type() {
        DataType::Utf8 => string_dates::<i32>(column, name),
        DataType::LargeUtf8 => string_dates::<i64>(column, name),
        DataType::Date32 => temporal_dates::<Date32Type>(column, name),
        DataType::Date64 => temporal_dates::<Date64Type>(column, name),
        DataType::Timestamp(TimeUnit::Second, _) => {
            temporal_dates::<TimestampSecondType>(column, name)
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            temporal_dates::<TimestampMillisecondType>(column, name)
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            temporal_dates::<TimestampMicrosecondType>(column, name)
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            temporal_dates::<TimestampNanosecondType>(column, name)
        }
        other => Err(DashboardError::Data(format!(
            "Column {} has unsupported type {}",
            name, other
        ))),
    }
}

fn string_dates<O: OffsetSizeTrait>(
    column: &ArrayRef,
    name: &str,
) -> Result<Vec<Option<NaiveDate>>> {
    let strings = column
        .as_any()
        .downcast_ref::<GenericStringArray<O>>()
        .ok_or_else(|| DashboardError::Data(format!("Column {} is not Utf8/String", name)))?;
    Ok((0..strings.len())
        .map(|i| {
            if strings.is_null(i) {
                None
            } else {
                parse_date(strings.value(i))
            }
        })
        .collect())
}

/// Timestamps with a time zone are read as their UTC calendar date.
fn temporal_dates<T>(column: &ArrayRef, name: &str) -> Result<Vec<Option<NaiveDate>>>
where
    T: ArrowTemporalType,
    i64: From<T::Native>,
{
    let values = column
        .as_any()
        .downcast_ref::<PrimitiveArray<T>>()
        .ok_or_else(|| {
            DashboardError::Data(format!("Column {} has an unexpected array type", name))
        })?;
    Ok((0..values.len())
        .map(|i| {
            if values.is_null(i) {
                None
            } else {
                values.value_as_datetime(i).map(|dt| dt.date())
            }
        })
        .collect())
}
