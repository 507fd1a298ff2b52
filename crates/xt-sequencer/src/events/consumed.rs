//! Consumed events (Incoming)

use shared_bus::ProtocolEvent;
use shared_types::{
    ChainId, Decided, InstanceId, MailboxEnvelope, PeriodId, Rollback, StartInstance,
    StartPeriod, SuperblockNumber, SuperblockRef,
};

/// Everything that drives a sequencer, processed one at a time.
#[derive(Debug, Clone)]
pub enum SequencerEvent {
    StartPeriod(StartPeriod),
    Rollback(Rollback),
    SuperblockFinalized(SuperblockRef),
    StartInstance(StartInstance),
    Decided(Decided),
    Mailbox(MailboxEnvelope),
    /// Decision timer of an instance fired.
    InstanceTimeout(InstanceId),
    /// The settlement prover answered.
    SettlementProofReady {
        period_id: PeriodId,
        target_superblock: SuperblockNumber,
        result: Result<Vec<u8>, String>,
    },
}

impl SequencerEvent {
    /// Map a bus event addressed to `chain` into an inbox event.
    pub fn from_bus(event: ProtocolEvent, chain: ChainId) -> Option<Self> {
        match event {
            ProtocolEvent::StartPeriod(sp) => Some(Self::StartPeriod(sp)),
            ProtocolEvent::Rollback(rb) => Some(Self::Rollback(rb)),
            ProtocolEvent::SuperblockFinalized(f) => Some(Self::SuperblockFinalized(f.superblock)),
            ProtocolEvent::StartInstance { to, payload } if to == chain => {
                Some(Self::StartInstance(payload))
            }
            ProtocolEvent::Decided { to, payload } if to == chain => Some(Self::Decided(payload)),
            ProtocolEvent::Mailbox { to, payload } if to == chain => Some(Self::Mailbox(payload)),
            _ => None,
        }
    }
}
