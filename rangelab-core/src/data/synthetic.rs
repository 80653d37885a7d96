//! Deterministic synthetic intraday sessions.
//!
//! Produces a random walk of evenly spaced bars over a daily clock window,
//! weekdays only. The RNG is seeded from a BLAKE3 hash of the label, so the
//! same spec always yields the same series. Results computed on this data
//! are tagged as synthetic by the runner.

use super::{BarSeries, DataError};
use crate::domain::{Bar, Window};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Weekday};
use chrono_tz::Tz;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Parameters for [`generate`].
#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    /// Seed label (e.g. a symbol name).
    pub label: String,
    pub timezone: Tz,
    pub start: NaiveDate,
    /// Number of weekdays to generate.
    pub days: usize,
    /// Daily clock window the bars cover; may wrap midnight.
    pub session: Window,
    pub bar_minutes: u32,
    pub start_price: f64,
    /// Maximum absolute per-bar return, as a fraction.
    pub volatility: f64,
}

const REGULAR_START: NaiveDate = match NaiveDate::from_ymd_opt(2024, 1, 2) {
    Some(date) => date,
    None => panic!("invalid regular-hours start date"),
};

const REGULAR_OPEN: NaiveTime = match NaiveTime::from_hms_opt(9, 30, 0) {
    Some(time) => time,
    None => panic!("invalid regular-hours open"),
};

const REGULAR_CLOSE: NaiveTime = match NaiveTime::from_hms_opt(16, 0, 0) {
    Some(time) => time,
    None => panic!("invalid regular-hours close"),
};

impl SyntheticSpec {
    /// 5-minute regular-hours bars for `days` weekdays from 2024-01-02,
    /// New York time.
    pub fn regular_hours(label: &str, days: usize) -> Self {
        Self {
            label: label.to_string(),
            timezone: chrono_tz::America::New_York,
            start: REGULAR_START,
            days,
            session: Window::new(REGULAR_OPEN, REGULAR_CLOSE),
            bar_minutes: 5,
            start_price: 100.0,
            volatility: 0.002,
        }
    }
}

/// Generate a synthetic series.
pub fn generate(spec: &SyntheticSpec) -> Result<BarSeries, DataError> {
    let seed_bytes = blake3::hash(spec.label.as_bytes());
    let seed: [u8; 32] = *seed_bytes.as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let step = Duration::minutes(i64::from(spec.bar_minutes.max(1)));
    let span = session_length(&spec.session);
    let vol = spec.volatility.abs().max(f64::EPSILON);

    let mut bars = Vec::new();
    let mut price = spec.start_price;
    let mut date = spec.start;
    let mut produced = 0;

    while produced < spec.days {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date += Duration::days(1);
            continue;
        }

        let open_at = date.and_time(spec.session.start);
        let mut offset = Duration::zero();
        while offset < span {
            // Nonexistent local times (DST gaps) are skipped.
            let local = open_at + offset;
            if let Some(timestamp) = spec.timezone.from_local_datetime(&local).earliest() {
                let ret: f64 = rng.gen_range(-vol..vol);
                let open = price;
                let close = price * (1.0 + ret);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..vol));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..vol));
                bars.push(Bar {
                    timestamp,
                    open,
                    high,
                    low,
                    close,
                });
                price = close;
            }
            offset = offset + step;
        }

        produced += 1;
        date += Duration::days(1);
    }

    BarSeries::new(bars)
}

fn session_length(window: &Window) -> Duration {
    let raw = window.end.signed_duration_since(window.start);
    if window.is_wrapping() {
        raw + Duration::days(1)
    } else {
        raw
    }
}
