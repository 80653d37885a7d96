//! Retrace-versus-target race.
//!
//! Enter at the breakout bar's close and measure one R to that bar's far
//! extreme. For each retrace fraction, race an adverse move of that many R
//! against a favorable move of `target_r` R over the bars that follow the
//! breakout. Nothing is filled or stopped; the race only asks which level
//! comes first.

use super::{reaches_against, reaches_with, EventContext, OutcomePolicy};
use crate::domain::Direction;
use crate::scan::{first_touch, Touch};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

fn default_target_r() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetraceRaceParams {
    /// Adverse distances to race, in R.
    pub retrace_fractions: Vec<f64>,
    #[serde(default = "default_target_r")]
    pub target_r: f64,
    #[serde(default)]
    pub same_bar: RaceTie,
}

/// Side credited when one bar reaches both levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceTie {
    #[default]
    Retrace,
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceOutcome {
    RetraceFirst,
    TargetFirst,
    Neither,
}

impl RaceOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RaceOutcome::RetraceFirst => "retrace",
            RaceOutcome::TargetFirst => "target",
            RaceOutcome::Neither => "neither",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceLeg {
    pub fraction: f64,
    pub outcome: RaceOutcome,
    pub same_bar: bool,
    pub resolved_at: Option<DateTime<Tz>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceRun {
    pub direction: Direction,
    pub entry: f64,
    pub risk: f64,
    /// One leg per retrace fraction, in configured order.
    pub legs: Vec<RaceLeg>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RaceRecord {
    Raced(RaceRun),
    NoForwardBar,
    /// Breakout bar closed at its own far extreme.
    DegenerateRisk,
}

#[derive(Debug, Clone)]
pub struct RetraceRacePolicy {
    retrace_fractions: Vec<f64>,
    target_r: f64,
    same_bar: RaceTie,
}

impl RetraceRacePolicy {
    pub fn new(params: &RetraceRaceParams) -> Self {
        Self {
            retrace_fractions: params.retrace_fractions.clone(),
            target_r: params.target_r,
            same_bar: params.same_bar,
        }
    }

    pub fn target_r(&self) -> f64 {
        self.target_r
    }
}

impl OutcomePolicy for RetraceRacePolicy {
    type Record = RaceRecord;

    fn name(&self) -> &'static str {
        "retrace_race"
    }

    fn evaluate(&self, ctx: &EventContext<'_>) -> Self::Record {
        let forward = ctx.session.after(&ctx.event.timestamp, ctx.horizon);
        if forward.is_empty() {
            return RaceRecord::NoForwardBar;
        }

        let direction = ctx.event.direction;
        let bar = &ctx.event.bar;
        let entry = bar.close;
        let risk = match direction {
            Direction::Up => bar.close - bar.low,
            Direction::Down => bar.high - bar.close,
        };
        if risk <= 0.0 {
            return RaceRecord::DegenerateRisk;
        }

        let sign = direction.sign();
        let target = entry + sign * self.target_r * risk;
        let legs = self
            .retrace_fractions
            .iter()
            .map(|&fraction| {
                let retrace = entry - sign * fraction * risk;
                let hit = first_touch(
                    forward,
                    |b| reaches_against(b, direction, retrace),
                    |b| reaches_with(b, direction, target),
                );
                let Some(hit) = hit else {
                    return RaceLeg {
                        fraction,
                        outcome: RaceOutcome::Neither,
                        same_bar: false,
                        resolved_at: None,
                    };
                };
                let (outcome, same_bar) = match (hit.value, self.same_bar) {
                    (Touch::First, _) => (RaceOutcome::RetraceFirst, false),
                    (Touch::Second, _) => (RaceOutcome::TargetFirst, false),
                    (Touch::Both, RaceTie::Retrace) => (RaceOutcome::RetraceFirst, true),
                    (Touch::Both, RaceTie::Target) => (RaceOutcome::TargetFirst, true),
                };
                RaceLeg {
                    fraction,
                    outcome,
                    same_bar,
                    resolved_at: Some(forward[hit.index].timestamp),
                }
            })
            .collect();

        RaceRecord::Raced(RaceRun {
            direction,
            entry,
            risk,
            legs,
        })
    }
}
