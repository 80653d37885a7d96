//! Per-session pipeline: range, breakout, then outcome policies.
//!
//! [`SessionAnalyzer`] is built once from an explicit [`AnalyzerConfig`]
//! and is then shared read-only across threads.

use crate::breakout::{BreakoutEvent, BreakoutScanner, CrossRule, ScanOutcome, Trigger};
use crate::domain::{clock, Window};
use crate::outcome::{
    CutoffResult, EventContext, ExtensionParams, ExtensionPolicy, ExtensionRecord, MidpointParams,
    MidpointPolicy, MidpointRecord, OutcomePolicy, RaceRecord, RetraceRaceParams,
    RetraceRacePolicy, RevisitParams, RevisitPolicy, StairstepParams, StairstepPolicy,
    StairstepRecord, TradeParams, TradePolicy, TradeRecord,
};
use crate::range::{Range, RangeDetector};
use crate::session::Session;
use chrono::{DateTime, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Forward-scan settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanParams {
    /// Exclusive end of the forward horizon.
    #[serde(with = "clock")]
    pub end: NaiveTime,
    #[serde(default)]
    pub cross_rule: CrossRule,
    #[serde(default)]
    pub trigger: Trigger,
}

/// Everything the per-session pipeline needs. Policies left as `None` are
/// not evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub reference: Window,
    pub scan: ScanParams,
    #[serde(default)]
    pub revisit: Option<RevisitParams>,
    #[serde(default)]
    pub stairstep: Option<StairstepParams>,
    #[serde(default)]
    pub trade: Option<TradeParams>,
    #[serde(default)]
    pub extension: Option<ExtensionParams>,
    #[serde(default)]
    pub midpoint: Option<MidpointParams>,
    #[serde(default)]
    pub retrace_race: Option<RetraceRaceParams>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} window is empty (start == end)")]
    EmptyWindow { name: &'static str },

    #[error("forward horizon is empty: scan end equals reference end ({0})")]
    EmptyHorizon(String),

    #[error("revisit: {0}")]
    Revisit(String),

    #[error("stairstep: {0}")]
    Stairstep(String),

    #[error("trade: {0}")]
    Trade(String),

    #[error("extension: {0}")]
    Extension(String),

    #[error("midpoint: {0}")]
    Midpoint(String),

    #[error("retrace_race: {0}")]
    RetraceRace(String),
}

impl AnalyzerConfig {
    /// Bare pipeline with no outcome policies.
    pub fn new(reference: Window, scan_end: NaiveTime) -> Self {
        Self {
            reference,
            scan: ScanParams {
                end: scan_end,
                cross_rule: CrossRule::default(),
                trigger: Trigger::default(),
            },
            revisit: None,
            stairstep: None,
            trade: None,
            extension: None,
            midpoint: None,
            retrace_race: None,
        }
    }

    /// `[reference.end, scan.end)`
    pub fn horizon(&self) -> Window {
        Window::new(self.reference.end, self.scan.end)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reference.is_empty() {
            return Err(ConfigError::EmptyWindow { name: "reference" });
        }
        if self.horizon().is_empty() {
            return Err(ConfigError::EmptyHorizon(clock::format(self.scan.end)));
        }

        if let Some(revisit) = &self.revisit {
            if revisit.cutoffs.is_empty() {
                return Err(ConfigError::Revisit("at least one cutoff is required".into()));
            }
            if let Some(c) = revisit.cutoffs.iter().find(|c| **c == self.reference.end) {
                return Err(ConfigError::Revisit(format!(
                    "cutoff {} equals the reference end",
                    clock::format(*c)
                )));
            }
        }

        if let Some(stairstep) = &self.stairstep {
            if stairstep.max_steps == 0 {
                return Err(ConfigError::Stairstep("max_steps must be at least 1".into()));
            }
        }

        if let Some(trade) = &self.trade {
            let f = trade.retrace_fraction;
            if !f.is_finite() || !(0.0..1.0).contains(&f) {
                return Err(ConfigError::Trade(format!(
                    "retrace_fraction must be in [0, 1), got {f}"
                )));
            }
            if trade.r_targets.is_empty() {
                return Err(ConfigError::Trade("at least one R target is required".into()));
            }
            if let Some(k) = trade.r_targets.iter().find(|k| !k.is_finite() || **k <= 0.0) {
                return Err(ConfigError::Trade(format!("R target must be positive, got {k}")));
            }
        }

        if let Some(ext) = &self.extension {
            if ext.multiples.is_empty() {
                return Err(ConfigError::Extension("at least one multiple is required".into()));
            }
            if let Some(m) = ext.multiples.iter().find(|m| !m.is_finite() || **m <= 0.0) {
                return Err(ConfigError::Extension(format!(
                    "multiple must be positive, got {m}"
                )));
            }
            if ext.bucket_edges.iter().any(|e| !e.is_finite())
                || ext.bucket_edges.windows(2).any(|w| w[0] >= w[1])
            {
                return Err(ConfigError::Extension(
                    "bucket_edges must be finite and strictly ascending".into(),
                ));
            }
        }

        if let Some(midpoint) = &self.midpoint {
            if let Some(cap) = midpoint.max_range_size.filter(|c| !c.is_finite() || *c <= 0.0) {
                return Err(ConfigError::Midpoint(format!(
                    "max_range_size must be positive, got {cap}"
                )));
            }
        }

        if let Some(race) = &self.retrace_race {
            if race.retrace_fractions.is_empty() {
                return Err(ConfigError::RetraceRace(
                    "at least one retrace fraction is required".into(),
                ));
            }
            if let Some(f) = race
                .retrace_fractions
                .iter()
                .find(|f| !f.is_finite() || **f <= 0.0)
            {
                return Err(ConfigError::RetraceRace(format!(
                    "retrace fraction must be positive, got {f}"
                )));
            }
            let k = race.target_r;
            if !k.is_finite() || k <= 0.0 {
                return Err(ConfigError::RetraceRace(format!(
                    "target_r must be positive, got {k}"
                )));
            }
        }

        Ok(())
    }
}

// ── Reports ─────────────────────────────────────────────────────────

/// Per-policy results for one breakout. The outer `Option` is `None` when
/// the policy is disabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakoutReport {
    pub range: Range,
    pub event: BreakoutEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revisit: Option<Vec<CutoffResult>>,
    /// Inner `None`: no bar followed the breakout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stairstep: Option<Option<StairstepRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade: Option<TradeRecord>,
    /// Inner `None`: zero-size range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Option<ExtensionRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub midpoint: Option<MidpointRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrace_race: Option<RaceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionOutcome {
    NoRange,
    NoBreakout { range: Range },
    Ambiguous { range: Range, timestamp: DateTime<Tz> },
    Breakout(Box<BreakoutReport>),
}

impl SessionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SessionOutcome::NoRange => "no_range",
            SessionOutcome::NoBreakout { .. } => "no_breakout",
            SessionOutcome::Ambiguous { .. } => "ambiguous",
            SessionOutcome::Breakout(_) => "breakout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub date: NaiveDate,
    pub outcome: SessionOutcome,
}

impl SessionReport {
    pub fn breakout(&self) -> Option<&BreakoutReport> {
        match &self.outcome {
            SessionOutcome::Breakout(report) => Some(report),
            _ => None,
        }
    }
}

// ── Analyzer ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SessionAnalyzer {
    config: AnalyzerConfig,
    horizon: Window,
    detector: RangeDetector,
    scanner: BreakoutScanner,
    revisit: Option<RevisitPolicy>,
    stairstep: Option<StairstepPolicy>,
    trade: Option<TradePolicy>,
    extension: Option<ExtensionPolicy>,
    midpoint: Option<MidpointPolicy>,
    retrace_race: Option<RetraceRacePolicy>,
}

impl SessionAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            horizon: config.horizon(),
            detector: RangeDetector::new(config.reference),
            scanner: BreakoutScanner::new(config.scan.cross_rule, config.scan.trigger),
            revisit: config.revisit.as_ref().map(RevisitPolicy::new),
            stairstep: config.stairstep.as_ref().map(StairstepPolicy::new),
            trade: config.trade.as_ref().map(TradePolicy::new),
            extension: config.extension.as_ref().map(ExtensionPolicy::new),
            midpoint: config.midpoint.as_ref().map(MidpointPolicy::new),
            retrace_race: config.retrace_race.as_ref().map(RetraceRacePolicy::new),
            config,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze(&self, session: &Session) -> SessionReport {
        let outcome = match self.detector.detect(session) {
            None => SessionOutcome::NoRange,
            Some(range) => match self.scanner.scan(session, &range, &self.horizon) {
                ScanOutcome::NoBreakout => SessionOutcome::NoBreakout { range },
                ScanOutcome::Ambiguous { timestamp } => {
                    SessionOutcome::Ambiguous { range, timestamp }
                }
                ScanOutcome::Breakout(event) => {
                    SessionOutcome::Breakout(Box::new(self.evaluate(session, range, event)))
                }
            },
        };
        SessionReport {
            date: session.date(),
            outcome,
        }
    }

    fn evaluate(&self, session: &Session, range: Range, event: BreakoutEvent) -> BreakoutReport {
        let ctx = EventContext {
            session,
            range: &range,
            event: &event,
            horizon: &self.horizon,
            reference: &self.config.reference,
        };
        let revisit = self.revisit.as_ref().map(|p| p.evaluate(&ctx));
        let stairstep = self.stairstep.as_ref().map(|p| p.evaluate(&ctx));
        let trade = self.trade.as_ref().map(|p| p.evaluate(&ctx));
        let extension = self.extension.as_ref().map(|p| p.evaluate(&ctx));
        let midpoint = self.midpoint.as_ref().map(|p| p.evaluate(&ctx));
        let retrace_race = self.retrace_race.as_ref().map(|p| p.evaluate(&ctx));
        BreakoutReport {
            range,
            event,
            revisit,
            stairstep,
            trade,
            extension,
            midpoint,
            retrace_race,
        }
    }
}
