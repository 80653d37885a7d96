//! Revisit survival.
//!
//! After an upside breakout, does price come back down to the range low
//! before a given cutoff (and symmetrically for downside breakouts)? Each
//! cutoff is checked with its own scan from the breakout bar, so a touch
//! between two cutoffs only affects the later one.

use super::{reaches_against, EventContext, OutcomePolicy};
use crate::domain::{clock, Window};
use crate::scan::first_hit;
use chrono::{DateTime, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisitParams {
    #[serde(with = "clock::list")]
    pub cutoffs: Vec<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutoffResult {
    #[serde(with = "clock")]
    pub cutoff: NaiveTime,
    /// True when the opposite boundary was not touched before the cutoff.
    pub held: bool,
    pub touched_at: Option<DateTime<Tz>>,
}

#[derive(Debug, Clone)]
pub struct RevisitPolicy {
    cutoffs: Vec<NaiveTime>,
}

impl RevisitPolicy {
    pub fn new(params: &RevisitParams) -> Self {
        Self {
            cutoffs: params.cutoffs.clone(),
        }
    }

    pub fn cutoffs(&self) -> &[NaiveTime] {
        &self.cutoffs
    }
}

impl OutcomePolicy for RevisitPolicy {
    type Record = Vec<CutoffResult>;

    fn name(&self) -> &'static str {
        "revisit"
    }

    fn evaluate(&self, ctx: &EventContext<'_>) -> Self::Record {
        let direction = ctx.event.direction;
        let opposite = ctx.range.opposite(direction);
        self.cutoffs
            .iter()
            .map(|&cutoff| {
                let window = Window::new(ctx.reference.end, cutoff);
                let bars = ctx.session.starting_at(&ctx.event.timestamp, &window);
                let touched_at = first_hit(bars, |b| {
                    reaches_against(b, direction, opposite).then_some(b.timestamp)
                })
                .map(|hit| hit.value);
                CutoffResult {
                    cutoff,
                    held: touched_at.is_none(),
                    touched_at,
                }
            })
            .collect()
    }
}
