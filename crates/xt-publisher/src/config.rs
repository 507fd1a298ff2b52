//! Publisher configuration
//!
//! Immutable once the Publisher is built.

use crate::error::{PublisherError, PublisherResult};
use serde::Deserialize;
use shared_types::{ChainId, SuperblockRef};
use std::collections::BTreeSet;
use std::time::Duration;

/// Runtime configuration for the Publisher
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Chains whose proofs make up a superblock
    pub chains: Vec<ChainId>,

    /// Superblocks allowed to run ahead of the last finalized one
    pub proof_window: u64,

    /// Unix time (seconds) at which period 0 starts
    pub genesis_time: u64,

    pub period_duration_secs: u64,

    /// Decision timer per instance (milliseconds)
    pub instance_timeout_ms: u64,

    /// Deadline for a superblock proof (seconds)
    pub proof_timeout_secs: u64,

    /// Last finalized superblock at startup
    pub genesis: SuperblockRef,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            chains: vec![ChainId(1), ChainId(2)],
            proof_window: 10,
            genesis_time: 0,
            period_duration_secs: 12,
            instance_timeout_ms: 4_000,
            proof_timeout_secs: 60,
            genesis: SuperblockRef::default(),
        }
    }
}

impl PublisherConfig {
    pub fn instance_timeout(&self) -> Duration {
        Duration::from_millis(self.instance_timeout_ms)
    }

    pub fn proof_timeout(&self) -> Duration {
        Duration::from_secs(self.proof_timeout_secs)
    }

    pub fn validate(&self) -> PublisherResult<()> {
        if self.proof_window == 0 {
            return Err(PublisherError::InvalidConfig(
                "proof_window must be positive".into(),
            ));
        }
        if self.period_duration_secs == 0 {
            return Err(PublisherError::InvalidConfig(
                "period_duration_secs must be positive".into(),
            ));
        }
        if self.instance_timeout_ms == 0 || self.proof_timeout_secs == 0 {
            return Err(PublisherError::InvalidConfig(
                "timeouts must be positive".into(),
            ));
        }
        let distinct: BTreeSet<_> = self.chains.iter().collect();
        if distinct.len() != self.chains.len() {
            return Err(PublisherError::InvalidConfig(
                "duplicate chain in chains".into(),
            ));
        }
        if distinct.len() < 2 {
            return Err(PublisherError::InvalidConfig(
                "at least two chains are required".into(),
            ));
        }
        Ok(())
    }
}
