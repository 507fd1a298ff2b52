//! Sequencer configuration

use crate::error::{SequencerError, SequencerResult};
use serde::Deserialize;
use shared_types::{ChainId, SuperblockRef};
use std::time::Duration;

/// Runtime configuration for one chain's sequencer
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Chain this sequencer owns
    pub chain_id: ChainId,

    /// Decision timer per instance (milliseconds)
    pub instance_timeout_ms: u64,

    /// Last finalized superblock at startup
    pub genesis: SuperblockRef,

    /// Periods of instance history kept for late messages
    pub history_periods: u64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            chain_id: ChainId(1),
            instance_timeout_ms: 3_000,
            genesis: SuperblockRef::default(),
            history_periods: 4,
        }
    }
}

impl SequencerConfig {
    /// Config for `chain_id` with defaults elsewhere
    pub fn for_chain(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            ..Self::default()
        }
    }

    pub fn instance_timeout(&self) -> Duration {
        Duration::from_millis(self.instance_timeout_ms)
    }

    pub fn validate(&self) -> SequencerResult<()> {
        if self.instance_timeout_ms == 0 {
            return Err(SequencerError::InvalidConfig(
                "instance_timeout_ms must be positive".into(),
            ));
        }
        if self.history_periods == 0 {
            return Err(SequencerError::InvalidConfig(
                "history_periods must be positive".into(),
            ));
        }
        Ok(())
    }
}
