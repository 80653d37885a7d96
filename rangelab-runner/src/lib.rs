//! RangeLab Runner: analysis orchestration, sweeps, artifacts.
//!
//! This crate builds on `rangelab-core` to provide:
//! - TOML analysis configurations with content hashing
//! - Data loading from CSV/Parquet with a tagged synthetic fallback
//! - Parallel per-session analysis and associative stat merging
//! - Multi-configuration sweeps over one series
//! - JSON/CSV/Markdown artifacts with schema versioning

pub mod config;
pub mod data_loader;
pub mod export;
pub mod result;
pub mod runner;
pub mod sweep;

pub use config::{AnalysisConfig, ConfigError};
pub use data_loader::{
    compute_dataset_hash, load_series, DataSource, LoadError, LoadOptions, LoadedData,
};
pub use export::{
    export_json, export_sessions_csv, export_stats_csv, generate_report, import_json,
    load_artifacts, save_artifacts, stat_rows, StatRow,
};
pub use result::{AnalysisResult, SessionSummary, SCHEMA_VERSION};
pub use runner::{run_analysis, run_from_options, RunError};
pub use sweep::{run_sweep, SweepResults};
