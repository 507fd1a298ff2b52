//! # Node Configuration
//!
//! One Publisher and one Sequencer per chain, plus the development
//! collaborators and drivers around them.
//!
//! Loaded from an optional JSON file named by `XT_CONFIG`, then overridden
//! by environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `XT_CHAINS` | `chains` (comma separated ids) |
//! | `XT_PROOF_WINDOW` | `publisher.proof_window` |
//! | `XT_PERIOD_SECS` | `publisher.period_duration_secs` |
//! | `XT_LOG_LEVEL` | `log_level` |

use serde::Deserialize;
use shared_types::ChainId;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use xt_publisher::PublisherConfig;
use xt_sequencer::SequencerConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete node configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Chains run by this node; also the chains whose proofs make up a
    /// superblock.
    pub chains: Vec<ChainId>,
    pub publisher: PublisherConfig,
    /// Applied to every sequencer; `chain_id` is filled in per chain.
    pub sequencer_defaults: SequencerDefaults,
    pub block_interval_ms: u64,
    /// Zero disables the demo workload.
    pub workload_interval_ms: u64,
    /// Delay between publishing a superblock proof and its finalization.
    pub l1_finality_delay_ms: u64,
    pub log_level: String,
}

/// Sequencer settings shared by all chains.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SequencerDefaults {
    pub instance_timeout_ms: u64,
    pub history_periods: u64,
}

impl Default for SequencerDefaults {
    fn default() -> Self {
        let base = SequencerConfig::default();
        Self {
            instance_timeout_ms: base.instance_timeout_ms,
            history_periods: base.history_periods,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            chains: vec![ChainId(1), ChainId(2), ChainId(3)],
            publisher: PublisherConfig::default(),
            sequencer_defaults: SequencerDefaults::default(),
            block_interval_ms: 2_000,
            workload_interval_ms: 1_500,
            l1_finality_delay_ms: 3_000,
            log_level: "info".to_string(),
        }
    }
}

impl NodeConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load from `XT_CONFIG` (if set) and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("XT_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (environment variables in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("XT_CHAINS") {
            self.chains = value
                .split(',')
                .map(|s| s.trim().parse::<u64>().map(ChainId))
                .collect::<Result<_, _>>()
                .map_err(|_| ConfigError::InvalidEnv {
                    var: "XT_CHAINS",
                    value: value.clone(),
                })?;
        }
        if let Some(value) = lookup("XT_PROOF_WINDOW") {
            self.publisher.proof_window =
                value.parse().map_err(|_| ConfigError::InvalidEnv {
                    var: "XT_PROOF_WINDOW",
                    value: value.clone(),
                })?;
        }
        if let Some(value) = lookup("XT_PERIOD_SECS") {
            self.publisher.period_duration_secs =
                value.parse().map_err(|_| ConfigError::InvalidEnv {
                    var: "XT_PERIOD_SECS",
                    value: value.clone(),
                })?;
        }
        if let Some(value) = lookup("XT_LOG_LEVEL") {
            self.log_level = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.publisher_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.block_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "block_interval_ms must be positive".into(),
            ));
        }
        let period_ms = self.publisher.period_duration_secs.saturating_mul(1_000);
        if self.l1_finality_delay_ms >= period_ms {
            return Err(ConfigError::Invalid(format!(
                "l1_finality_delay_ms ({}) must be shorter than a period ({period_ms} ms)",
                self.l1_finality_delay_ms
            )));
        }
        Ok(())
    }

    /// Publisher configuration over this node's chains.
    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            chains: self.chains.clone(),
            ..self.publisher.clone()
        }
    }

    pub fn sequencer_config(&self, chain_id: ChainId) -> SequencerConfig {
        SequencerConfig {
            chain_id,
            instance_timeout_ms: self.sequencer_defaults.instance_timeout_ms,
            genesis: self.publisher.genesis,
            history_periods: self.sequencer_defaults.history_periods,
        }
    }

    pub fn block_interval(&self) -> Duration {
        Duration::from_millis(self.block_interval_ms)
    }

    pub fn workload_interval(&self) -> Option<Duration> {
        (self.workload_interval_ms > 0).then(|| Duration::from_millis(self.workload_interval_ms))
    }

    pub fn l1_finality_delay(&self) -> Duration {
        Duration::from_millis(self.l1_finality_delay_ms)
    }
}
