//! Published effects (Outgoing)
//!
//! The state machine never performs I/O; it returns these and the service
//! carries them out after releasing the state lock.

use shared_types::{
    BlockHeader, ChainId, InstanceId, MailboxEnvelope, PeriodId, Proof, SuperblockNumber, Vote,
};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerOutput {
    Vote(Vote),
    Mailbox {
        to: ChainId,
        envelope: MailboxEnvelope,
    },
    ScheduleTimeout {
        instance_id: InstanceId,
        after: Duration,
    },
    CancelTimeout(InstanceId),
    RequestSettlementProof {
        period_id: PeriodId,
        target_superblock: SuperblockNumber,
        last_block: BlockHeader,
    },
    Proof(Proof),
}
