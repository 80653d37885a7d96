//! Breakout scanner.
//!
//! Walks the forward horizon bar by bar after the range closes and reports
//! the first bar that crosses a range boundary. A bar crossing both sides
//! ends the scan as ambiguous: the intrabar path cannot be recovered from
//! OHLC, so neither direction is credited.

use crate::domain::{Bar, Confirmation, Direction, Window};
use crate::range::Range;
use crate::scan::{first_hit, Hit};
use crate::session::Session;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Comparison used when testing a price against a boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossRule {
    /// `>` above the high, `<` below the low.
    #[default]
    Strict,
    /// `>=` / `<=`; touching the boundary counts.
    Inclusive,
}

impl CrossRule {
    #[inline]
    pub fn above(self, price: f64, level: f64) -> bool {
        match self {
            CrossRule::Strict => price > level,
            CrossRule::Inclusive => price >= level,
        }
    }

    #[inline]
    pub fn below(self, price: f64, level: f64) -> bool {
        match self {
            CrossRule::Strict => price < level,
            CrossRule::Inclusive => price <= level,
        }
    }

    /// Cross beyond `level` in `direction`.
    pub fn beyond(self, direction: Direction, price: f64, level: f64) -> bool {
        match direction {
            Direction::Up => self.above(price, level),
            Direction::Down => self.below(price, level),
        }
    }
}

/// Which price of a bar has to cross for it to count as a breakout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// High above the range high or low below the range low.
    #[default]
    Extreme,
    /// Close beyond the boundary; every event is close-confirmed.
    Close,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakoutEvent {
    pub direction: Direction,
    pub timestamp: DateTime<Tz>,
    pub bar: Bar,
    pub confirmation: Confirmation,
}

impl BreakoutEvent {
    /// The range boundary this event crossed.
    pub fn boundary(&self, range: &Range) -> f64 {
        match self.direction {
            Direction::Up => range.high,
            Direction::Down => range.low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanOutcome {
    Breakout(BreakoutEvent),
    Ambiguous { timestamp: DateTime<Tz> },
    NoBreakout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Crossing {
    One(Direction),
    Both,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BreakoutScanner {
    cross_rule: CrossRule,
    trigger: Trigger,
}

impl BreakoutScanner {
    pub fn new(cross_rule: CrossRule, trigger: Trigger) -> Self {
        Self {
            cross_rule,
            trigger,
        }
    }

    pub fn cross_rule(&self) -> CrossRule {
        self.cross_rule
    }

    /// Scan bars strictly after the range's last bar, within `horizon`.
    pub fn scan(&self, session: &Session, range: &Range, horizon: &Window) -> ScanOutcome {
        let bars = session.after(&range.last_timestamp, horizon);
        match first_hit(bars, |bar| self.crossing(bar, range)) {
            None => ScanOutcome::NoBreakout,
            Some(Hit {
                index,
                value: Crossing::Both,
            }) => ScanOutcome::Ambiguous {
                timestamp: bars[index].timestamp,
            },
            Some(Hit {
                index,
                value: Crossing::One(direction),
            }) => {
                let bar = &bars[index];
                ScanOutcome::Breakout(BreakoutEvent {
                    direction,
                    timestamp: bar.timestamp,
                    bar: bar.clone(),
                    confirmation: self.confirmation(bar, range, direction),
                })
            }
        }
    }

    fn crossing(&self, bar: &Bar, range: &Range) -> Option<Crossing> {
        let (up_price, down_price) = match self.trigger {
            Trigger::Extreme => (bar.high, bar.low),
            Trigger::Close => (bar.close, bar.close),
        };
        let hit_high = self.cross_rule.above(up_price, range.high);
        let hit_low = self.cross_rule.below(down_price, range.low);
        match (hit_high, hit_low) {
            (true, true) => Some(Crossing::Both),
            (true, false) => Some(Crossing::One(Direction::Up)),
            (false, true) => Some(Crossing::One(Direction::Down)),
            (false, false) => None,
        }
    }

    fn confirmation(&self, bar: &Bar, range: &Range, direction: Direction) -> Confirmation {
        let level = match direction {
            Direction::Up => range.high,
            Direction::Down => range.low,
        };
        if self.cross_rule.beyond(direction, bar.close, level) {
            Confirmation::Close
        } else {
            Confirmation::Wick
        }
    }
}
