//! Reference range detection.

use crate::domain::{Direction, Window};
use crate::session::Session;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

/// High/low envelope of the bars inside the reference window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Range {
    pub high: f64,
    pub low: f64,
    pub window: Window,
    /// Timestamp of the last bar inside the window; scanning starts after it.
    pub last_timestamp: DateTime<Tz>,
    pub bar_count: usize,
}

impl Range {
    pub fn size(&self) -> f64 {
        self.high - self.low
    }

    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// The boundary a break in `direction` leaves behind.
    pub fn opposite(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Up => self.low,
            Direction::Down => self.high,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RangeDetector {
    window: Window,
}

impl RangeDetector {
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// `None` when the window holds no bars.
    pub fn detect(&self, session: &Session) -> Option<Range> {
        let bars = session.slice(&self.window);
        let last = bars.last()?;
        let (high, low) = bars
            .iter()
            .fold((f64::NEG_INFINITY, f64::INFINITY), |(h, l), b| {
                (h.max(b.high), l.min(b.low))
            });
        Some(Range {
            high,
            low,
            window: self.window,
            last_timestamp: last.timestamp,
            bar_count: bars.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::{NaiveDate, TimeZone};
    use chrono_tz::America::New_York;

    fn bar(h: u32, m: u32, high: f64, low: f64) -> Bar {
        Bar {
            timestamp: New_York.with_ymd_and_hms(2024, 1, 2, h, m, 0).unwrap(),
            open: low,
            high,
            low,
            close: high,
        }
    }

    fn session(bars: Vec<Bar>) -> Session {
        Session::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), bars)
    }

    #[test]
    fn envelope_over_window_only() {
        let s = session(vec![
            bar(9, 45, 200.0, 90.0),
            bar(9, 50, 105.0, 100.0),
            bar(10, 5, 110.0, 102.0),
            bar(10, 10, 300.0, 1.0),
        ]);
        let detector = RangeDetector::new(Window::parse("09:50", "10:10").unwrap());
        let range = detector.detect(&s).unwrap();
        assert_eq!(range.high, 110.0);
        assert_eq!(range.low, 100.0);
        assert_eq!(range.bar_count, 2);
        assert_eq!(range.last_timestamp, s.bars()[2].timestamp);
        assert_eq!(range.size(), 10.0);
        assert_eq!(range.midpoint(), 105.0);
        assert_eq!(range.opposite(Direction::Up), 100.0);
        assert_eq!(range.opposite(Direction::Down), 110.0);
    }

    #[test]
    fn empty_window_yields_none() {
        let s = session(vec![bar(11, 0, 101.0, 100.0)]);
        let detector = RangeDetector::new(Window::parse("09:50", "10:10").unwrap());
        assert!(detector.detect(&s).is_none());
    }
}
