//! Parquet storage of a clean series.
//!
//! Layout: `timestamp` (Datetime[ms], UTC) plus `open`, `high`, `low`,
//! `close` as f64. The analysis timezone is not stored; readers supply it.

use super::{BarSeries, DataError};
use crate::domain::Bar;
use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use polars::prelude::*;
use std::fs;
use std::path::Path;

const COLUMNS: [&str; 5] = ["timestamp", "open", "high", "low", "close"];

/// Write a series to `path`. The file is written to a `.tmp` sibling and
/// renamed into place.
pub fn write_parquet(path: &Path, series: &BarSeries) -> Result<(), DataError> {
    let mut df = series_to_dataframe(series)?;
    let tmp_path = path.with_extension("parquet.tmp");

    let file = fs::File::create(&tmp_path)
        .map_err(|e| DataError::Parquet(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .map_err(|e| DataError::Parquet(format!("write parquet: {e}")))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::Parquet(format!("atomic rename failed: {e}"))
    })
}

/// Read a series written by [`write_parquet`] (or any file with the same
/// columns) and express it in `tz`.
pub fn read_parquet(path: &Path, tz: Tz) -> Result<BarSeries, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::Parquet(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::Parquet(format!("read: {e}")))?;

    for col_name in COLUMNS {
        if df.column(col_name).is_err() {
            return Err(DataError::MissingColumn(col_name.into()));
        }
    }

    dataframe_to_series(&df, tz)
}

// ── Conversion helpers ──────────────────────────────────────────────

fn series_to_dataframe(series: &BarSeries) -> Result<DataFrame, DataError> {
    let bars = series.bars();
    let millis: Vec<i64> = bars.iter().map(|b| b.timestamp.timestamp_millis()).collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    DataFrame::new(vec![
        Column::new("timestamp".into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| DataError::Parquet(format!("timestamp cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
    ])
    .map_err(|e| DataError::Parquet(format!("dataframe creation: {e}")))
}

fn dataframe_to_series(df: &DataFrame, tz: Tz) -> Result<BarSeries, DataError> {
    let map_err = |e: PolarsError| DataError::Parquet(format!("column read: {e}"));

    let ts_col = df.column("timestamp").map_err(map_err)?;
    // Integer columns are taken as epoch milliseconds.
    let unit = match ts_col.dtype() {
        DataType::Datetime(tu, _) => *tu,
        DataType::Int64 => TimeUnit::Milliseconds,
        other => {
            return Err(DataError::Parquet(format!(
                "timestamp column has unsupported type {other}"
            )))
        }
    };
    let raw = ts_col
        .cast(&DataType::Int64)
        .map_err(|e| DataError::Parquet(format!("timestamp cast: {e}")))?;
    let ts_ca = raw
        .i64()
        .map_err(|e| DataError::Parquet(format!("timestamp column type: {e}")))?;

    let price = |name: &str| -> Result<Float64Chunked, DataError> {
        df.column(name)
            .map_err(map_err)?
            .cast(&DataType::Float64)
            .map_err(|e| DataError::Parquet(format!("{name} cast: {e}")))?
            .f64()
            .cloned()
            .map_err(|e| DataError::Parquet(format!("{name} column type: {e}")))
    };
    let open_ca = price("open")?;
    let high_ca = price("high")?;
    let low_ca = price("low")?;
    let close_ca = price("close")?;

    let n = df.height();
    let mut bars = Vec::with_capacity(n);
    for i in 0..n {
        let value = ts_ca
            .get(i)
            .ok_or_else(|| DataError::Parquet(format!("null timestamp at row {i}")))?;
        let millis = match unit {
            TimeUnit::Nanoseconds => value.div_euclid(1_000_000),
            TimeUnit::Microseconds => value.div_euclid(1_000),
            TimeUnit::Milliseconds => value,
        };
        let timestamp = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| DataError::BadTimestamp {
                row: i,
                value: value.to_string(),
            })?
            .with_timezone(&tz);

        bars.push(Bar {
            timestamp,
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close: close_ca.get(i).unwrap_or(f64::NAN),
        });
    }

    // Null prices surface as NaN and are rejected here.
    BarSeries::new(bars)
}
