//! Driving ports (Inbound API)

use crate::domain::BlockTag;
use crate::error::SequencerResult;
use crate::state::SequencerStatus;
use async_trait::async_trait;
use shared_types::{BlockHeader, Transaction};

/// Local block production, driven by the chain's block timer.
#[async_trait]
pub trait SequencerApi: Send + Sync {
    /// Open block `number`, tagged with the current period.
    async fn begin_block(&self, number: u64) -> SequencerResult<BlockTag>;

    /// Append a user transaction to the open block.
    async fn add_local_tx(&self, tx: Transaction) -> SequencerResult<()>;

    /// Seal the open block; may trigger the settlement pipeline.
    async fn seal_block(&self) -> SequencerResult<BlockHeader>;

    async fn status(&self) -> SequencerStatus;
}
