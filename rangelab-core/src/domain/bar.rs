//! Bar: the fundamental market data unit.

use chrono::{DateTime, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::Serialize;

/// OHLC bar stamped in the analysis timezone.
///
/// Timestamps are zoned so that every clock-time rule (reference windows,
/// cutoffs, session rollover) is evaluated in exchange-local time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub timestamp: DateTime<Tz>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    /// Local clock time of the bar open.
    #[inline]
    pub fn time(&self) -> NaiveTime {
        self.timestamp.time()
    }

    /// Local calendar date of the bar open.
    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Intrabar range (high - low).
    #[inline]
    pub fn span(&self) -> f64 {
        self.high - self.low
    }

    /// Returns true if any OHLC field is not finite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}
