//! Driven ports (Outbound dependencies)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{
    BlockHeader, ChainId, Hash, InstanceId, MailboxEnvelope, MailboxMessage,
    MailboxMessageHeader, PeriodId, Proof, SuperblockNumber, Transaction, Vote,
};

/// One transaction to simulate inside an instance.
#[derive(Debug, Clone)]
pub struct SimulationRequest {
    pub instance_id: InstanceId,
    /// State root snapshotted when the instance started.
    pub state_root: Hash,
    pub transaction: Transaction,
    /// Mailbox messages consumed so far by this instance.
    pub inbox: Vec<MailboxMessage>,
}

/// Result of simulating one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationOutcome {
    /// Executed; may have written mailbox messages for other chains.
    Success { writes: Vec<MailboxMessage> },
    /// Needs a mailbox message that is not in the inbox yet.
    ReadMiss {
        header: MailboxMessageHeader,
        /// Writes performed before the read blocked.
        writes: Vec<MailboxMessage>,
    },
    /// Any other failure.
    Failed { reason: String },
}

/// Chain execution engine.
///
/// Synchronous: simulation runs inside the sequencer's event handler.
pub trait ExecutionEngine: Send + Sync {
    fn chain_id(&self) -> ChainId;

    /// Current post-state root of the chain.
    fn state_root(&self) -> Hash;

    fn simulate(&self, request: &SimulationRequest) -> SimulationOutcome;
}

/// Messages a sequencer sends.
#[async_trait]
pub trait SequencerNetwork: Send + Sync {
    async fn send_vote(&self, vote: Vote) -> Result<(), String>;

    async fn send_mailbox_message(
        &self,
        destination: ChainId,
        envelope: MailboxEnvelope,
    ) -> Result<(), String>;

    async fn send_proof(&self, proof: Proof) -> Result<(), String>;
}

/// Produces per-chain settlement proofs.
#[async_trait]
pub trait SettlementProver: Send + Sync {
    async fn request_settlement_proof(
        &self,
        period_id: PeriodId,
        target_superblock: SuperblockNumber,
        last_block: &BlockHeader,
    ) -> Result<Vec<u8>, String>;
}
