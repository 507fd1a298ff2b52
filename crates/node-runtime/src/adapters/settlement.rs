//! # Simulated Settlement Layer
//!
//! Accepts every superblock proof and, after a fixed finality delay,
//! broadcasts `SuperblockFinalized` to all actors. The superblock hash is the
//! SHA-256 of its proof.

use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use shared_bus::{EventPublisher, InMemoryEventBus, ProtocolEvent};
use shared_types::{SuperblockFinalized, SuperblockNumber, SuperblockRef};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use xt_publisher::SettlementLayer;

pub struct SimulatedL1 {
    bus: Arc<InMemoryEventBus>,
    finality_delay: Duration,
    finalized: Arc<RwLock<Vec<SuperblockRef>>>,
}

impl SimulatedL1 {
    pub fn new(bus: Arc<InMemoryEventBus>, finality_delay: Duration) -> Self {
        Self {
            bus,
            finality_delay,
            finalized: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Superblocks finalized so far, in order.
    pub fn finalized(&self) -> Vec<SuperblockRef> {
        self.finalized.read().clone()
    }
}

#[async_trait]
impl SettlementLayer for SimulatedL1 {
    async fn publish_superblock_proof(
        &self,
        number: SuperblockNumber,
        proof: Vec<u8>,
    ) -> Result<(), String> {
        let superblock = SuperblockRef::new(number, Sha256::digest(&proof).into());
        let bus = self.bus.clone();
        let finalized = self.finalized.clone();
        let delay = self.finality_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            finalized.write().push(superblock);
            info!(superblock = number, hash = %hex::encode(&superblock.hash[..6]), "Superblock finalized on L1");
            bus.publish(ProtocolEvent::SuperblockFinalized(SuperblockFinalized {
                superblock,
            }))
            .await;
        });
        Ok(())
    }
}
