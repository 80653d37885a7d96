//! Run results and their flat per-session summaries.

use crate::config::AnalysisConfig;
use chrono::NaiveDate;
use rangelab_core::domain::clock;
use rangelab_core::outcome::{MidpointRecord, RaceRecord, TierOutcome, TradeRecord};
use rangelab_core::{AggregateStats, Confirmation, Direction, SessionOutcome, SessionReport};
use serde::{Deserialize, Serialize};

/// Current schema version for serialized results.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// One session flattened to scalar columns. Timestamps are RFC 3339
/// strings in the configured zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub date: NaiveDate,
    pub outcome: String,
    pub range_high: Option<f64>,
    pub range_low: Option<f64>,
    pub direction: Option<Direction>,
    pub confirmation: Option<Confirmation>,
    pub breakout_at: Option<String>,
    /// `cutoff:held|broken` pairs joined with `;`.
    pub revisit: Option<String>,
    /// Consecutive held steps from step 1.
    pub stairstep_held: Option<usize>,
    /// `filled`, `no_entry_fill` or `degenerate_risk`.
    pub trade: Option<String>,
    pub trade_entry: Option<f64>,
    pub trade_stop: Option<f64>,
    /// `target:win|loss|open` pairs joined with `;`; `*` marks ambiguity.
    pub trade_tiers: Option<String>,
    pub extension_bucket: Option<usize>,
    pub extension_excursion: Option<f64>,
    /// First level revisited, or why the race was skipped; `*` marks a
    /// same-bar tie.
    pub midpoint: Option<String>,
    /// `fraction:retrace|target|neither` pairs joined with `;`, or why the
    /// race was skipped; `*` marks a same-bar tie.
    pub retrace_race: Option<String>,
}

impl SessionSummary {
    pub fn from_report(report: &SessionReport) -> Self {
        let mut row = Self {
            date: report.date,
            outcome: report.outcome.label().to_string(),
            range_high: None,
            range_low: None,
            direction: None,
            confirmation: None,
            breakout_at: None,
            revisit: None,
            stairstep_held: None,
            trade: None,
            trade_entry: None,
            trade_stop: None,
            trade_tiers: None,
            extension_bucket: None,
            extension_excursion: None,
            midpoint: None,
            retrace_race: None,
        };

        let b = match &report.outcome {
            SessionOutcome::NoRange => return row,
            SessionOutcome::NoBreakout { range } => {
                row.range_high = Some(range.high);
                row.range_low = Some(range.low);
                return row;
            }
            SessionOutcome::Ambiguous { range, timestamp } => {
                row.range_high = Some(range.high);
                row.range_low = Some(range.low);
                row.breakout_at = Some(timestamp.to_rfc3339());
                return row;
            }
            SessionOutcome::Breakout(b) => b,
        };

        row.range_high = Some(b.range.high);
        row.range_low = Some(b.range.low);
        row.direction = Some(b.event.direction);
        row.confirmation = Some(b.event.confirmation);
        row.breakout_at = Some(b.event.timestamp.to_rfc3339());

        row.revisit = b.revisit.as_ref().map(|cutoffs| {
            cutoffs
                .iter()
                .map(|c| {
                    let state = if c.held { "held" } else { "broken" };
                    format!("{}:{state}", clock::format(c.cutoff))
                })
                .collect::<Vec<_>>()
                .join(";")
        });

        row.stairstep_held = b
            .stairstep
            .as_ref()
            .and_then(|r| r.as_ref().map(|r| r.held_run()));

        match &b.trade {
            Some(TradeRecord::Filled(fill)) => {
                row.trade = Some("filled".to_string());
                row.trade_entry = Some(fill.entry);
                row.trade_stop = Some(fill.stop);
                row.trade_tiers = Some(
                    fill.tiers
                        .iter()
                        .map(|t| {
                            let state = match t.outcome {
                                TierOutcome::Win => "win",
                                TierOutcome::Loss => "loss",
                                TierOutcome::Unresolved => "open",
                            };
                            let mark = if t.ambiguous { "*" } else { "" };
                            format!("{}:{state}{mark}", t.target_r)
                        })
                        .collect::<Vec<_>>()
                        .join(";"),
                );
            }
            Some(TradeRecord::NoEntryFill) => row.trade = Some("no_entry_fill".to_string()),
            Some(TradeRecord::DegenerateRisk) => row.trade = Some("degenerate_risk".to_string()),
            None => {}
        }

        if let Some(Some(ext)) = &b.extension {
            row.extension_bucket = Some(ext.bucket);
            row.extension_excursion = Some(ext.excursion);
        }

        row.midpoint = b.midpoint.as_ref().map(|m| match m {
            MidpointRecord::Touched { level, same_bar, .. } => {
                let mark = if *same_bar { "*" } else { "" };
                format!("{}{mark}", level.as_str())
            }
            MidpointRecord::Neither => "neither".to_string(),
            MidpointRecord::RangeTooWide => "range_too_wide".to_string(),
            MidpointRecord::Unconfirmed => "unconfirmed".to_string(),
        });

        row.retrace_race = b.retrace_race.as_ref().map(|r| match r {
            RaceRecord::Raced(run) => run
                .legs
                .iter()
                .map(|leg| {
                    let mark = if leg.same_bar { "*" } else { "" };
                    format!("{}:{}{mark}", leg.fraction, leg.outcome.as_str())
                })
                .collect::<Vec<_>>()
                .join(";"),
            RaceRecord::NoForwardBar => "no_forward_bar".to_string(),
            RaceRecord::DegenerateRisk => "degenerate_risk".to_string(),
        });

        row
    }
}

/// Complete, self-describing result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub name: String,
    pub config: AnalysisConfig,
    pub config_hash: String,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub session_count: usize,
    pub stats: AggregateStats,
    pub reports: Vec<SessionSummary>,
}

impl AnalysisResult {
    /// Identity of this (config, dataset) pair.
    pub fn run_id(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.config_hash.as_bytes());
        hasher.update(self.dataset_hash.as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}
