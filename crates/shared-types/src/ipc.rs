//! # Protocol Message Payloads
//!
//! Abstract field sets of the SBCP and SCP messages. Encoding on the wire is
//! the transport's business; these are the in-process forms.
//!
//! | Message | Sender | Receivers |
//! |---------|--------|-----------|
//! | `StartPeriod` | Publisher | all sequencers |
//! | `Rollback` | Publisher | all sequencers |
//! | `Proof` | Sequencer | Publisher |
//! | `StartInstance` | Publisher | participant sequencers |
//! | `Vote` | Sequencer | Publisher |
//! | `Decided` | Publisher | participant sequencers |
//! | `MailboxEnvelope` | Sequencer | destination sequencer |

use crate::entities::*;
use serde::{Deserialize, Serialize};

// =============================================================================
// SBCP: PERIODS, SETTLEMENT, ROLLBACK
// =============================================================================

/// Opens a new period targeting a superblock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPeriod {
    /// New period identifier.
    pub period_id: PeriodId,
    /// Superblock built during this period.
    pub target_superblock: SuperblockNumber,
}

/// Resets every sequencer to the last finalized superblock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rollback {
    /// Period sequencers continue in.
    pub period_id: PeriodId,
    /// Last finalized superblock number.
    pub superblock_number: SuperblockNumber,
    /// Last finalized superblock hash.
    pub superblock_hash: Hash,
}

impl Rollback {
    /// Rollback to `finalized`, continuing in `period_id`.
    pub fn to_finalized(period_id: PeriodId, finalized: SuperblockRef) -> Self {
        Self {
            period_id,
            superblock_number: finalized.number,
            superblock_hash: finalized.hash,
        }
    }

    /// The superblock sequencers build next.
    pub fn next_target(&self) -> SuperblockNumber {
        self.superblock_number + 1
    }
}

/// Settlement proof of one chain for one superblock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Period the proof covers.
    pub period_id: PeriodId,
    /// Superblock the proof contributes to.
    pub superblock_number: SuperblockNumber,
    /// Opaque proof bytes.
    pub proof_data: Vec<u8>,
}

/// Finalization event delivered by the settlement layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperblockFinalized {
    /// Finalized superblock.
    pub superblock: SuperblockRef,
}

// =============================================================================
// SCP: INSTANCES AND VOTING
// =============================================================================

/// Starts an instance on its participant sequencers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartInstance {
    /// Instance identifier.
    pub instance_id: InstanceId,
    /// Period the instance was admitted in.
    pub period_id: PeriodId,
    /// Position within the period, starting at 1.
    pub sequence_number: u64,
    /// The full request.
    pub xt_request: XtRequest,
}

impl StartInstance {
    /// Participant chains, ascending.
    pub fn participants(&self) -> Vec<ChainId> {
        self.xt_request.chains()
    }
}

/// A sequencer's vote on an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Instance voted on.
    pub instance_id: InstanceId,
    /// Voting chain.
    pub chain_id: ChainId,
    /// `true` commits, `false` aborts.
    pub vote: bool,
}

/// The Publisher's final outcome for an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decided {
    /// Instance decided.
    pub instance_id: InstanceId,
    /// `true` if every participant voted to commit.
    pub decision: bool,
}
