//! Midpoint revisit race.
//!
//! After a breakout, which level does price come back to first: the range
//! midpoint or the boundary left behind? The scan starts at the breakout
//! bar. A bar reaching the far boundary has also passed the midpoint, so
//! the order inside such a bar is unknown and `same_bar` decides it.

use super::{reaches_against, EventContext, OutcomePolicy};
use crate::domain::Confirmation;
use crate::scan::{first_touch, Touch};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

fn default_close_only() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidpointParams {
    /// Ranges wider than this are skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_range_size: Option<f64>,
    /// Only close-confirmed breakouts take part.
    #[serde(default = "default_close_only")]
    pub close_only: bool,
    #[serde(default)]
    pub same_bar: MidpointTie,
}

/// Level credited when one bar reaches both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MidpointTie {
    #[default]
    Midpoint,
    Boundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceLevel {
    Midpoint,
    Boundary,
}

impl RaceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RaceLevel::Midpoint => "midpoint",
            RaceLevel::Boundary => "boundary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MidpointRecord {
    Touched {
        level: RaceLevel,
        /// Both levels fell on the resolving bar.
        same_bar: bool,
        at: DateTime<Tz>,
    },
    /// Neither level before the horizon ended.
    Neither,
    RangeTooWide,
    /// Wick-only breakout while `close_only` is set.
    Unconfirmed,
}

#[derive(Debug, Clone)]
pub struct MidpointPolicy {
    max_range_size: Option<f64>,
    close_only: bool,
    same_bar: MidpointTie,
}

impl MidpointPolicy {
    pub fn new(params: &MidpointParams) -> Self {
        Self {
            max_range_size: params.max_range_size,
            close_only: params.close_only,
            same_bar: params.same_bar,
        }
    }
}

impl OutcomePolicy for MidpointPolicy {
    type Record = MidpointRecord;

    fn name(&self) -> &'static str {
        "midpoint"
    }

    fn evaluate(&self, ctx: &EventContext<'_>) -> Self::Record {
        if self.max_range_size.is_some_and(|cap| ctx.range.size() > cap) {
            return MidpointRecord::RangeTooWide;
        }
        if self.close_only && ctx.event.confirmation != Confirmation::Close {
            return MidpointRecord::Unconfirmed;
        }

        let direction = ctx.event.direction;
        let midpoint = ctx.range.midpoint();
        let boundary = ctx.range.opposite(direction);
        let bars = ctx.session.starting_at(&ctx.event.timestamp, ctx.horizon);

        let Some(hit) = first_touch(
            bars,
            |b| reaches_against(b, direction, midpoint),
            |b| reaches_against(b, direction, boundary),
        ) else {
            return MidpointRecord::Neither;
        };

        let (level, same_bar) = match (hit.value, self.same_bar) {
            (Touch::First, _) => (RaceLevel::Midpoint, false),
            (Touch::Second, _) => (RaceLevel::Boundary, false),
            (Touch::Both, MidpointTie::Midpoint) => (RaceLevel::Midpoint, true),
            (Touch::Both, MidpointTie::Boundary) => (RaceLevel::Boundary, true),
        };
        MidpointRecord::Touched {
            level,
            same_bar,
            at: bars[hit.index].timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use crate::outcome::fixtures::{bar, Fixture};

    fn policy(same_bar: MidpointTie) -> MidpointPolicy {
        MidpointPolicy::new(&MidpointParams {
            max_range_size: None,
            close_only: true,
            same_bar,
        })
    }

    // Range 100-110, midpoint 105; the 10:10 bar closes above at 111.

    #[test]
    fn midpoint_first() {
        let fx = Fixture::new(vec![
            bar(9, 50, 105.0, 110.0, 100.0, 105.0),
            bar(10, 10, 109.0, 112.0, 108.0, 111.0),
            bar(10, 15, 111.0, 112.0, 104.5, 106.0),
            bar(10, 20, 106.0, 107.0, 99.0, 100.0),
        ]);
        let record = policy(MidpointTie::Midpoint).evaluate(&fx.ctx());
        assert_eq!(
            record,
            MidpointRecord::Touched {
                level: RaceLevel::Midpoint,
                same_bar: false,
                at: fx.session.bars()[2].timestamp,
            }
        );
    }

    #[test]
    fn boundary_first_when_one_bar_takes_both_and_tie_favors_boundary() {
        let fx = Fixture::new(vec![
            bar(9, 50, 105.0, 110.0, 100.0, 105.0),
            bar(10, 10, 109.0, 112.0, 108.0, 111.0),
            bar(10, 15, 111.0, 111.0, 99.0, 100.0),
        ]);
        let record = policy(MidpointTie::Boundary).evaluate(&fx.ctx());
        assert_eq!(
            record,
            MidpointRecord::Touched {
                level: RaceLevel::Boundary,
                same_bar: true,
                at: fx.session.bars()[2].timestamp,
            }
        );
    }

    #[test]
    fn same_bar_defaults_to_midpoint() {
        let fx = Fixture::new(vec![
            bar(9, 50, 105.0, 110.0, 100.0, 105.0),
            bar(10, 10, 109.0, 112.0, 108.0, 111.0),
            bar(10, 15, 111.0, 111.0, 99.0, 100.0),
        ]);
        let record = MidpointPolicy::new(&MidpointParams {
            max_range_size: None,
            close_only: true,
            same_bar: MidpointTie::default(),
        })
        .evaluate(&fx.ctx());
        assert!(matches!(
            record,
            MidpointRecord::Touched {
                level: RaceLevel::Midpoint,
                same_bar: true,
                ..
            }
        ));
    }

    #[test]
    fn breakout_bar_itself_can_reach_the_midpoint() {
        let fx = Fixture::new(vec![
            bar(9, 50, 105.0, 110.0, 100.0, 105.0),
            bar(10, 10, 106.0, 112.0, 104.0, 111.0),
        ]);
        let record = policy(MidpointTie::Midpoint).evaluate(&fx.ctx());
        assert_eq!(
            record,
            MidpointRecord::Touched {
                level: RaceLevel::Midpoint,
                same_bar: false,
                at: fx.event.timestamp,
            }
        );
    }

    #[test]
    fn neither_before_horizon_end() {
        let fx = Fixture::new(vec![
            bar(9, 50, 105.0, 110.0, 100.0, 105.0),
            bar(10, 10, 109.0, 112.0, 108.0, 111.0),
            bar(10, 15, 111.0, 114.0, 106.0, 113.0),
            bar(12, 0, 113.0, 113.0, 90.0, 91.0),
        ]);
        assert_eq!(
            policy(MidpointTie::Midpoint).evaluate(&fx.ctx()),
            MidpointRecord::Neither
        );
    }

    #[test]
    fn short_break_races_upward() {
        // Down close at 98; midpoint 105 is reached at exactly 105.
        let fx = Fixture::new(vec![
            bar(9, 50, 105.0, 110.0, 100.0, 105.0),
            bar(10, 10, 101.0, 102.0, 97.0, 98.0),
            bar(10, 15, 98.0, 105.0, 97.5, 104.0),
        ]);
        assert_eq!(fx.event.direction, Direction::Down);
        assert!(matches!(
            policy(MidpointTie::Midpoint).evaluate(&fx.ctx()),
            MidpointRecord::Touched {
                level: RaceLevel::Midpoint,
                same_bar: false,
                ..
            }
        ));
    }

    #[test]
    fn wide_ranges_and_wick_breaks_are_skipped() {
        let fx = Fixture::new(vec![
            bar(9, 50, 105.0, 110.0, 100.0, 105.0),
            bar(10, 10, 109.0, 112.0, 108.0, 111.0),
        ]);
        let capped = MidpointPolicy::new(&MidpointParams {
            max_range_size: Some(5.0),
            close_only: true,
            same_bar: MidpointTie::Midpoint,
        });
        assert_eq!(capped.evaluate(&fx.ctx()), MidpointRecord::RangeTooWide);

        // High crosses 110 but the close stays inside the range.
        let fx = Fixture::new(vec![
            bar(9, 50, 105.0, 110.0, 100.0, 105.0),
            bar(10, 10, 109.0, 112.0, 108.0, 109.5),
            bar(10, 15, 109.5, 110.0, 104.0, 105.0),
        ]);
        assert_eq!(fx.event.confirmation, Confirmation::Wick);
        assert_eq!(
            policy(MidpointTie::Midpoint).evaluate(&fx.ctx()),
            MidpointRecord::Unconfirmed
        );

        let any_break = MidpointPolicy::new(&MidpointParams {
            max_range_size: Some(10.0),
            close_only: false,
            same_bar: MidpointTie::Midpoint,
        });
        assert!(matches!(
            any_break.evaluate(&fx.ctx()),
            MidpointRecord::Touched {
                level: RaceLevel::Midpoint,
                ..
            }
        ));
    }
}
