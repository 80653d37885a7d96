//! Stairstep chain.
//!
//! Counts how many consecutive bars after the breakout keep stepping away
//! from the range: higher lows after an upside break, lower highs after a
//! downside break. The first failure ends the chain for good.

use super::{EventContext, OutcomePolicy};
use crate::domain::{Bar, Direction};
use crate::scan::first_hit;
use serde::{Deserialize, Serialize};

/// Which rate a report leads with. Both are always derivable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StairstepMode {
    /// survivors(n) / base
    #[default]
    Cumulative,
    /// survivors(n) / reached(n)
    Conditional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StairstepParams {
    pub max_steps: usize,
    #[serde(default)]
    pub mode: StairstepMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepResult {
    Held,
    Broken,
    /// The bar for this step does not exist inside the horizon.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StairstepRecord {
    /// `steps[n - 1]` is the result of step `n`.
    pub steps: Vec<StepResult>,
}

impl StairstepRecord {
    /// Number of leading held steps.
    pub fn held_run(&self) -> usize {
        self.steps
            .iter()
            .take_while(|s| **s == StepResult::Held)
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct StairstepPolicy {
    max_steps: usize,
    mode: StairstepMode,
}

impl StairstepPolicy {
    pub fn new(params: &StairstepParams) -> Self {
        Self {
            max_steps: params.max_steps,
            mode: params.mode,
        }
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn mode(&self) -> StairstepMode {
        self.mode
    }
}

/// Step condition between consecutive candles. Strict: an equal low (or
/// high) breaks the chain.
fn steps_on(prev: &Bar, next: &Bar, direction: Direction) -> bool {
    match direction {
        Direction::Up => next.low > prev.low,
        Direction::Down => next.high < prev.high,
    }
}

impl OutcomePolicy for StairstepPolicy {
    /// `None` when no bar follows the breakout inside the horizon.
    type Record = Option<StairstepRecord>;

    fn name(&self) -> &'static str {
        "stairstep"
    }

    fn evaluate(&self, ctx: &EventContext<'_>) -> Self::Record {
        let forward = ctx.session.after(&ctx.event.timestamp, ctx.horizon);
        if forward.is_empty() {
            return None;
        }

        let mut chain: Vec<&Bar> = Vec::with_capacity(self.max_steps + 1);
        chain.push(&ctx.event.bar);
        chain.extend(forward.iter().take(self.max_steps));

        let direction = ctx.event.direction;
        // Window index k compares candle k with candle k+1, i.e. step k+1.
        let broken_at = first_hit(chain.windows(2), |pair| {
            (!steps_on(pair[0], pair[1], direction)).then_some(())
        })
        .map(|hit| hit.index + 1);

        let steps = (1..=self.max_steps)
            .map(|n| match broken_at {
                Some(b) if n >= b => StepResult::Broken,
                _ if n < chain.len() => StepResult::Held,
                _ => StepResult::Missing,
            })
            .collect();

        Some(StairstepRecord { steps })
    }
}
