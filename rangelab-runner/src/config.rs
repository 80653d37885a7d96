//! Serializable analysis configuration.
//!
//! One TOML file describes one hypothesis: the reference window, the forward
//! horizon, the session rollover and which outcome policies to evaluate.
//! Several files can be swept over the same bar series.

use chrono_tz::Tz;
use rangelab_core::outcome::{
    ExtensionParams, MidpointParams, RetraceRaceParams, RevisitParams, StairstepParams,
    TradeParams,
};
use rangelab_core::{AnalyzerConfig, ScanParams, SessionRule, Window};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("config name must not be empty")]
    EmptyName,

    #[error("invalid analysis parameters: {0}")]
    Invalid(#[from] rangelab_core::ConfigError),

    #[error("config serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Everything needed to reproduce one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub name: String,

    /// IANA zone name; bars are re-expressed in this zone before
    /// partitioning, so clock windows are read as exchange-local times.
    pub timezone: String,

    #[serde(default)]
    pub session: SessionRule,

    pub reference: Window,
    pub scan: ScanParams,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revisit: Option<RevisitParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stairstep: Option<StairstepParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade: Option<TradeParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<ExtensionParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midpoint: Option<MidpointParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrace_race: Option<RetraceRaceParams>,
}

impl AnalysisConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        self.timezone()?;
        self.analyzer_config().validate()?;
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(self.timezone.clone()))
    }

    /// The engine-facing part of the configuration.
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            reference: self.reference,
            scan: self.scan.clone(),
            revisit: self.revisit.clone(),
            stairstep: self.stairstep.clone(),
            trade: self.trade.clone(),
            extension: self.extension.clone(),
            midpoint: self.midpoint.clone(),
            retrace_race: self.retrace_race.clone(),
        }
    }

    /// Deterministic BLAKE3 hash of the canonical JSON form.
    ///
    /// Two runs with identical configs share a hash, which keys the artifact
    /// directory.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
