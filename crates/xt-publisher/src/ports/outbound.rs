//! Driven ports (Outbound dependencies)

use crate::domain::PeriodClock;
use async_trait::async_trait;
use shared_types::{
    ChainId, Decided, Hash, PeriodId, Rollback, StartInstance, StartPeriod, SuperblockNumber,
};
use std::collections::BTreeMap;

/// Messages the Publisher sends to sequencers.
#[async_trait]
pub trait PublisherNetwork: Send + Sync {
    /// Broadcast to every sequencer.
    async fn broadcast_start_period(&self, start: StartPeriod) -> Result<(), String>;

    /// Broadcast to every sequencer.
    async fn broadcast_rollback(&self, rollback: Rollback) -> Result<(), String>;

    /// Deliver to exactly the sequencers of `participants`.
    async fn send_start_instance(
        &self,
        start: &StartInstance,
        participants: &[ChainId],
    ) -> Result<(), String>;

    async fn send_decided(&self, decided: Decided, participants: &[ChainId])
        -> Result<(), String>;
}

/// Aggregates per-chain settlement proofs into a superblock proof.
#[async_trait]
pub trait SuperblockProver: Send + Sync {
    async fn request_superblock_proof(
        &self,
        number: SuperblockNumber,
        last_finalized_hash: Hash,
        proofs: &BTreeMap<ChainId, Vec<u8>>,
    ) -> Result<Vec<u8>, String>;
}

/// Where superblock proofs are published for finalization.
#[async_trait]
pub trait SettlementLayer: Send + Sync {
    async fn publish_superblock_proof(
        &self,
        number: SuperblockNumber,
        proof: Vec<u8>,
    ) -> Result<(), String>;
}

/// Wall-clock time for the period ticker.
pub trait TimeSource: Send + Sync {
    /// Get current unix timestamp in seconds
    fn now(&self) -> u64;

    /// Get current period based on genesis time and period duration
    fn current_period(&self, clock: &PeriodClock) -> PeriodId {
        clock.period_at(self.now())
    }
}

/// Default time source using system time
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}
