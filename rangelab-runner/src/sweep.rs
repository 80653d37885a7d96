//! Multi-configuration sweeps over one bar series.

use rayon::prelude::*;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::data_loader::LoadedData;
use crate::result::AnalysisResult;
use crate::runner::{run_analysis, RunError};

/// Results from a sweep, in the order the configurations were given.
#[derive(Debug, Clone)]
pub struct SweepResults {
    results: Vec<AnalysisResult>,
}

impl SweepResults {
    pub fn all(&self) -> &[AnalysisResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&AnalysisResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Results ordered by breakout sample count, largest first.
    pub fn by_samples(&self) -> Vec<&AnalysisResult> {
        let mut sorted: Vec<&AnalysisResult> = self.results.iter().collect();
        sorted.sort_by(|a, b| b.stats.samples().cmp(&a.stats.samples()));
        sorted
    }

    pub fn into_results(self) -> Vec<AnalysisResult> {
        self.results
    }
}

/// Run every configuration over the same series in parallel.
///
/// Configurations are independent: each builds its own analyzer and stats,
/// nothing is shared but the read-only series.
pub fn run_sweep(configs: &[AnalysisConfig], data: &LoadedData) -> Result<SweepResults, RunError> {
    let results = configs
        .par_iter()
        .map(|config| {
            let result = run_analysis(config, data)?;
            debug!(
                name = %config.name,
                config_hash = %&result.config_hash[..8],
                samples = result.stats.samples(),
                "sweep configuration done"
            );
            Ok(result)
        })
        .collect::<Result<Vec<_>, RunError>>()?;

    Ok(SweepResults { results })
}
