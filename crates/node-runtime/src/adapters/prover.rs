//! # Development Prover
//!
//! Stands in for both proving services: per-chain settlement proofs and
//! aggregate superblock proofs are SHA-256 commitments over their inputs.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use shared_types::{BlockHeader, ChainId, Hash, PeriodId, SuperblockNumber};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use xt_publisher::SuperblockProver;
use xt_sequencer::SettlementProver;

#[derive(Debug, Clone, Default)]
pub struct DevProver {
    /// Simulated proving time.
    latency: Duration,
}

impl DevProver {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    async fn work(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl SettlementProver for DevProver {
    async fn request_settlement_proof(
        &self,
        period_id: PeriodId,
        target_superblock: SuperblockNumber,
        last_block: &BlockHeader,
    ) -> Result<Vec<u8>, String> {
        self.work().await;
        let mut hasher = Sha256::new();
        hasher.update(last_block.chain_id.0.to_be_bytes());
        hasher.update(period_id.to_be_bytes());
        hasher.update(target_superblock.to_be_bytes());
        hasher.update(last_block.hash);
        hasher.update(last_block.state_root);
        debug!(chain = %last_block.chain_id, period = period_id, "Settlement proof generated");
        Ok(hasher.finalize().to_vec())
    }
}

#[async_trait]
impl SuperblockProver for DevProver {
    async fn request_superblock_proof(
        &self,
        number: SuperblockNumber,
        last_finalized_hash: Hash,
        proofs: &BTreeMap<ChainId, Vec<u8>>,
    ) -> Result<Vec<u8>, String> {
        if proofs.is_empty() {
            return Err("no chain proofs".into());
        }
        self.work().await;
        let mut hasher = Sha256::new();
        hasher.update(number.to_be_bytes());
        hasher.update(last_finalized_hash);
        for (chain, proof) in proofs {
            hasher.update(chain.0.to_be_bytes());
            hasher.update(proof);
        }
        debug!(superblock = number, chains = proofs.len(), "Superblock proof generated");
        Ok(hasher.finalize().to_vec())
    }
}
