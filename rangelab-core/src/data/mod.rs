//! Clean-series input boundary.
//!
//! Everything past this module works on a [`BarSeries`], whose constructor
//! enforces the loader preconditions: strictly increasing timestamps, finite
//! prices and a consistent OHLC envelope. A violation is fatal for the run.

pub mod csv;
pub mod parquet;
pub mod synthetic;

use crate::domain::Bar;
use chrono_tz::Tz;
use thiserror::Error;

pub use self::csv::{read_csv, write_csv};
pub use self::parquet::{read_parquet, write_parquet};

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("parquet I/O error: {0}")]
    Parquet(String),

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("unparseable timestamp '{value}' at row {row}")]
    BadTimestamp { row: usize, value: String },

    #[error("precondition violated at bar {index}: {reason}")]
    PreconditionViolated { index: usize, reason: String },

    #[error("series contains no bars")]
    Empty,
}

/// A validated, time-ordered bar series.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Validate `bars` and take ownership of them.
    ///
    /// Fails on the first bar that breaks an invariant.
    pub fn new(bars: Vec<Bar>) -> Result<Self, DataError> {
        if bars.is_empty() {
            return Err(DataError::Empty);
        }
        for (i, bar) in bars.iter().enumerate() {
            if bar.is_void() {
                return Err(DataError::PreconditionViolated {
                    index: i,
                    reason: "non-finite price".into(),
                });
            }
            if !bar.is_sane() {
                return Err(DataError::PreconditionViolated {
                    index: i,
                    reason: format!(
                        "inconsistent OHLC (o={} h={} l={} c={})",
                        bar.open, bar.high, bar.low, bar.close
                    ),
                });
            }
            if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
                let reason = if bar.timestamp == bars[i - 1].timestamp {
                    format!("duplicate timestamp {}", bar.timestamp)
                } else {
                    format!(
                        "timestamp {} precedes {}",
                        bar.timestamp,
                        bars[i - 1].timestamp
                    )
                };
                return Err(DataError::PreconditionViolated { index: i, reason });
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a constructed series; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> &Bar {
        &self.bars[0]
    }

    pub fn last(&self) -> &Bar {
        &self.bars[self.bars.len() - 1]
    }

    /// Re-express every timestamp in `tz`. Instants are unchanged, so the
    /// ordering invariant still holds.
    pub fn with_timezone(self, tz: Tz) -> Self {
        let bars = self
            .bars
            .into_iter()
            .map(|b| Bar {
                timestamp: b.timestamp.with_timezone(&tz),
                ..b
            })
            .collect();
        Self { bars }
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }
}
