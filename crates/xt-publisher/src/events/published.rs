//! Published effects (Outgoing)

use shared_types::{
    ChainId, Decided, Hash, InstanceId, Rollback, StartInstance, StartPeriod, SuperblockNumber,
};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublisherOutput {
    BroadcastStartPeriod(StartPeriod),
    BroadcastRollback(Rollback),
    SendStartInstance {
        start: StartInstance,
        participants: Vec<ChainId>,
    },
    SendDecided {
        decided: Decided,
        participants: Vec<ChainId>,
    },
    ScheduleTimeout {
        instance_id: InstanceId,
        after: Duration,
    },
    CancelTimeout(InstanceId),
    RequestSuperblockProof {
        number: SuperblockNumber,
        last_finalized_hash: Hash,
        proofs: BTreeMap<ChainId, Vec<u8>>,
    },
    PublishSuperblockProof {
        number: SuperblockNumber,
        proof: Vec<u8>,
    },
}
