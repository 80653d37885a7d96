//! Outcome classifiers.
//!
//! Each policy looks forward from a breakout event and produces its own
//! record type. Policies are stateless apart from their parameters and are
//! built from explicit configuration, so several variants can run side by
//! side on the same event.

pub mod extension;
pub mod midpoint;
pub mod retrace;
pub mod revisit;
pub mod stairstep;
pub mod trade;

use crate::breakout::BreakoutEvent;
use crate::domain::{Bar, Direction, Window};
use crate::range::Range;
use crate::session::Session;

pub use extension::{ExtensionParams, ExtensionPolicy, ExtensionRecord};
pub use midpoint::{MidpointParams, MidpointPolicy, MidpointRecord, MidpointTie, RaceLevel};
pub use retrace::{
    RaceLeg, RaceOutcome, RaceRecord, RaceRun, RaceTie, RetraceRaceParams, RetraceRacePolicy,
};
pub use revisit::{CutoffResult, RevisitParams, RevisitPolicy};
pub use stairstep::{StairstepMode, StairstepParams, StairstepPolicy, StairstepRecord, StepResult};
pub use trade::{TierOutcome, TierResult, TradeFill, TradeParams, TradePolicy, TradeRecord};

/// Everything a policy may look at for one event.
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    pub session: &'a Session,
    pub range: &'a Range,
    pub event: &'a BreakoutEvent,
    /// Forward scan bound: `[reference.end, scan_end)`.
    pub horizon: &'a Window,
    pub reference: &'a Window,
}

/// Touch of `level` against the breakout direction. Non-strict.
pub(crate) fn reaches_against(bar: &Bar, direction: Direction, level: f64) -> bool {
    match direction {
        Direction::Up => bar.low <= level,
        Direction::Down => bar.high >= level,
    }
}

/// Touch of `level` in the breakout direction. Non-strict.
pub(crate) fn reaches_with(bar: &Bar, direction: Direction, level: f64) -> bool {
    match direction {
        Direction::Up => bar.high >= level,
        Direction::Down => bar.low <= level,
    }
}

/// A forward-looking classifier over one breakout event.
pub trait OutcomePolicy: Send + Sync {
    type Record;

    /// Short identifier used in reports and exports.
    fn name(&self) -> &'static str;

    fn evaluate(&self, ctx: &EventContext<'_>) -> Self::Record;
}
