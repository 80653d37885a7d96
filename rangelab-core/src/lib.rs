//! RangeLab Core: intraday range/breakout event analysis.
//!
//! This crate contains the analysis engine:
//! - Domain types (bars, directions, clock windows)
//! - Clean-series input (validated `BarSeries`, CSV/Parquet, synthetic data)
//! - Session partitioning with rollover and wrap-around windows
//! - Reference range detection and first-breakout scanning
//! - Outcome policies (revisit survival, stairstep chain, R-multiple trades,
//!   range extension, midpoint and retrace races)
//! - Aggregation into mergeable counts with a skip tally
//!
//! The core is synchronous, deterministic and free of logging side effects.

pub mod analyzer;
pub mod breakout;
pub mod data;
pub mod domain;
pub mod outcome;
pub mod range;
pub mod scan;
pub mod session;
pub mod stats;

pub use analyzer::{
    AnalyzerConfig, BreakoutReport, ConfigError, ScanParams, SessionAnalyzer, SessionOutcome,
    SessionReport,
};
pub use breakout::{BreakoutEvent, BreakoutScanner, CrossRule, ScanOutcome, Trigger};
pub use data::{BarSeries, DataError};
pub use domain::{Bar, Confirmation, Direction, Window};
pub use range::{Range, RangeDetector};
pub use session::{partition, Session, SessionRule};
pub use stats::AggregateStats;
