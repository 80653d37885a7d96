//! R-multiple trade simulation.
//!
//! Enter with the breakout on a retrace into the breakout bar, stop beyond
//! the bar's far extreme, and resolve each R target independently from the
//! fill bar onward. A bar that touches both stop and target is booked as a
//! loss and flagged ambiguous.

use super::{reaches_against, reaches_with, EventContext, OutcomePolicy};
use crate::domain::{Bar, Direction};
use crate::scan::{first_hit, first_touch, Touch};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeParams {
    /// Entry sits this fraction of the breakout bar's body-to-extreme span
    /// back from the close.
    pub retrace_fraction: f64,
    pub r_targets: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TierOutcome {
    Win,
    Loss,
    /// Neither stop nor target before the horizon ended.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierResult {
    pub target_r: f64,
    pub outcome: TierOutcome,
    /// Stop and target touched on the same bar.
    pub ambiguous: bool,
    pub resolved_at: Option<DateTime<Tz>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeFill {
    pub direction: Direction,
    pub entry: f64,
    pub stop: f64,
    pub risk: f64,
    pub fill_timestamp: DateTime<Tz>,
    pub tiers: Vec<TierResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TradeRecord {
    Filled(TradeFill),
    NoEntryFill,
    DegenerateRisk,
}

#[derive(Debug, Clone)]
pub struct TradePolicy {
    retrace_fraction: f64,
    r_targets: Vec<f64>,
}

impl TradePolicy {
    pub fn new(params: &TradeParams) -> Self {
        Self {
            retrace_fraction: params.retrace_fraction,
            r_targets: params.r_targets.clone(),
        }
    }

    pub fn r_targets(&self) -> &[f64] {
        &self.r_targets
    }

    /// Entry, stop and risk for a breakout bar, or `None` if the setup has
    /// no usable risk.
    pub fn plan(&self, bar: &Bar, direction: Direction) -> Option<(f64, f64, f64)> {
        let (full, stop) = match direction {
            Direction::Up => (bar.close - bar.low, bar.low),
            Direction::Down => (bar.high - bar.close, bar.high),
        };
        if full <= 0.0 {
            return None;
        }
        let entry = bar.close - direction.sign() * self.retrace_fraction * full;
        let risk = (entry - stop).abs();
        if risk <= 0.0 {
            return None;
        }
        Some((entry, stop, risk))
    }
}

impl OutcomePolicy for TradePolicy {
    type Record = TradeRecord;

    fn name(&self) -> &'static str {
        "trade"
    }

    fn evaluate(&self, ctx: &EventContext<'_>) -> Self::Record {
        let direction = ctx.event.direction;
        let Some((entry, stop, risk)) = self.plan(&ctx.event.bar, direction) else {
            return TradeRecord::DegenerateRisk;
        };

        let forward = ctx.session.after(&ctx.event.timestamp, ctx.horizon);
        let Some(fill) = first_hit(forward, |b| reaches_against(b, direction, entry).then_some(())) else {
            return TradeRecord::NoEntryFill;
        };
        let live = &forward[fill.index..];

        let tiers = self
            .r_targets
            .iter()
            .map(|&k| {
                let target = entry + direction.sign() * k * risk;
                let hit = first_touch(
                    live,
                    |b| reaches_against(b, direction, stop),
                    |b| reaches_with(b, direction, target),
                );
                match hit {
                    Some(h) => {
                        let (outcome, ambiguous) = match h.value {
                            Touch::First => (TierOutcome::Loss, false),
                            Touch::Second => (TierOutcome::Win, false),
                            Touch::Both => (TierOutcome::Loss, true),
                        };
                        TierResult {
                            target_r: k,
                            outcome,
                            ambiguous,
                            resolved_at: Some(live[h.index].timestamp),
                        }
                    }
                    None => TierResult {
                        target_r: k,
                        outcome: TierOutcome::Unresolved,
                        ambiguous: false,
                        resolved_at: None,
                    },
                }
            })
            .collect();

        TradeRecord::Filled(TradeFill {
            direction,
            entry,
            stop,
            risk,
            fill_timestamp: live[0].timestamp,
            tiers,
        })
    }
}
