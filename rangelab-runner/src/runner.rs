//! Analysis runner: wires together loading, partitioning, the per-session
//! pipeline and aggregation.
//!
//! Two entry points:
//! - `run_analysis()`: takes pre-loaded data. Used by sweeps and tests.
//! - `run_from_options()`: loads data first, then runs. Used by the CLI.

use rayon::prelude::*;
use thiserror::Error;
use tracing::info;

use rangelab_core::{partition, AggregateStats, SessionAnalyzer, SessionReport};

use crate::config::{AnalysisConfig, ConfigError};
use crate::data_loader::{load_series, LoadError, LoadOptions, LoadedData};
use crate::result::{AnalysisResult, SessionSummary, SCHEMA_VERSION};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
}

impl From<rangelab_core::ConfigError> for RunError {
    fn from(e: rangelab_core::ConfigError) -> Self {
        RunError::Config(ConfigError::Invalid(e))
    }
}

/// Run one configuration over pre-loaded data. No I/O.
///
/// Sessions are analyzed in parallel and their counts merged; the merge is
/// associative and commutative, so the result does not depend on how rayon
/// splits the work.
pub fn run_analysis(
    config: &AnalysisConfig,
    data: &LoadedData,
) -> Result<AnalysisResult, RunError> {
    config.validate()?;
    let tz = config.timezone()?;
    let analyzer = SessionAnalyzer::new(config.analyzer_config())?;

    let series = data.series.clone().with_timezone(tz);
    let sessions = partition(&series, &config.session);

    let reports: Vec<SessionReport> = sessions.par_iter().map(|s| analyzer.analyze(s)).collect();

    let stats = reports
        .par_iter()
        .fold(
            || AggregateStats::new(analyzer.config()),
            |mut acc, report| {
                acc.record(report);
                acc
            },
        )
        .reduce(|| AggregateStats::new(analyzer.config()), AggregateStats::merged);

    info!(
        name = %config.name,
        sessions = stats.sessions,
        up = stats.up.samples,
        down = stats.down.samples,
        no_range = stats.skips.no_range,
        no_breakout = stats.skips.no_breakout,
        ambiguous = stats.skips.ambiguous,
        synthetic = data.has_synthetic,
        "analysis complete"
    );

    Ok(AnalysisResult {
        schema_version: SCHEMA_VERSION,
        name: config.name.clone(),
        config: config.clone(),
        config_hash: config.config_hash()?,
        dataset_hash: data.dataset_hash.clone(),
        has_synthetic: data.has_synthetic,
        session_count: sessions.len(),
        stats,
        reports: reports.iter().map(SessionSummary::from_report).collect(),
    })
}

/// Load data per `opts`, then run.
pub fn run_from_options(
    config: &AnalysisConfig,
    opts: &LoadOptions,
) -> Result<AnalysisResult, RunError> {
    let data = load_series(opts)?;
    run_analysis(config, &data)
}
