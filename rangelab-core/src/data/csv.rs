//! Clean CSV bar files.
//!
//! Header: `timestamp,open,high,low,close` (the first column may also be
//! called `time`). Extra columns are ignored. Timestamps may be RFC 3339,
//! `YYYY-MM-DD HH:MM:SS±HH:MM`, or integer epoch seconds.

use super::{BarSeries, DataError};
use crate::domain::Bar;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "time")]
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

#[derive(Debug, Serialize)]
struct CsvOutRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

/// Read a clean CSV file and express its timestamps in `tz`.
pub fn read_csv(path: &Path, tz: Tz) -> Result<BarSeries, DataError> {
    let mut reader = ::csv::Reader::from_path(path)
        .map_err(|e| DataError::Csv(format!("open {}: {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| DataError::Csv(format!("header: {e}")))?
        .clone();
    if !headers.iter().any(|h| h == "timestamp" || h == "time") {
        return Err(DataError::MissingColumn("timestamp".into()));
    }
    for col in ["open", "high", "low", "close"] {
        if !headers.iter().any(|h| h == col) {
            return Err(DataError::MissingColumn(col.into()));
        }
    }

    let mut bars = Vec::new();
    for (row, record) in reader.deserialize::<CsvRow>().enumerate() {
        let record = record.map_err(|e| DataError::Csv(format!("row {row}: {e}")))?;
        let timestamp = parse_timestamp(&record.timestamp)
            .ok_or_else(|| DataError::BadTimestamp {
                row,
                value: record.timestamp.clone(),
            })?
            .with_timezone(&tz);
        bars.push(Bar {
            timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
        });
    }

    BarSeries::new(bars)
}

/// Write a series as CSV with RFC 3339 timestamps (offset preserved).
pub fn write_csv(path: &Path, series: &BarSeries) -> Result<(), DataError> {
    let mut writer = ::csv::Writer::from_path(path)
        .map_err(|e| DataError::Csv(format!("create {}: {e}", path.display())))?;
    for bar in series.bars() {
        writer
            .serialize(CsvOutRow {
                timestamp: bar.timestamp.to_rfc3339(),
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
            })
            .map_err(|e| DataError::Csv(format!("write row: {e}")))?;
    }
    writer.flush()?;
    Ok(())
}

/// Parse one of the accepted timestamp spellings into an absolute instant.
fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return Utc
            .timestamp_opt(secs, 0)
            .single()
            .map(|dt| dt.fixed_offset());
    }
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z"))
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%z"))
        .ok()
}
