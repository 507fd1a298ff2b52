//! Instance participation records

use shared_types::{Hash, InstanceId, MailboxMessageHeader, PeriodId, Transaction};
use std::collections::VecDeque;

/// Local view of an instance's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    /// Started locally, not yet decided.
    Pending,
    Accepted,
    Rejected,
    /// Wiped out by a rollback; late results are ignored.
    Cancelled,
}

/// What this sequencer knows about an instance it was addressed by.
#[derive(Debug, Clone)]
pub struct InstanceRecord {
    pub period_id: PeriodId,
    pub sequence_number: u64,
    pub voted: Option<bool>,
    pub status: InstanceStatus,
    /// Set once a `Decided` for this instance has been applied.
    pub decision_received: bool,
}

impl InstanceRecord {
    pub fn started(period_id: PeriodId, sequence_number: u64) -> Self {
        Self {
            period_id,
            sequence_number,
            voted: None,
            status: InstanceStatus::Pending,
            decision_received: false,
        }
    }

    /// Refused at admission with a `false` vote.
    pub fn refused(period_id: PeriodId, sequence_number: u64) -> Self {
        Self {
            period_id,
            sequence_number,
            voted: Some(false),
            status: InstanceStatus::Rejected,
            decision_received: false,
        }
    }
}

/// The single instance being simulated on this chain.
#[derive(Debug, Clone)]
pub struct ActiveInstance {
    pub id: InstanceId,
    pub period_id: PeriodId,
    /// State root when the instance started.
    pub pre_state_root: Hash,
    /// Transactions still to simulate, front first.
    pub queue: VecDeque<Transaction>,
    /// Transactions that simulated successfully, in order (relays included).
    pub executed: Vec<Transaction>,
    /// Header the simulation is suspended on.
    pub awaiting: Option<MailboxMessageHeader>,
    pub voted: Option<bool>,
}

impl ActiveInstance {
    pub fn new(
        id: InstanceId,
        period_id: PeriodId,
        pre_state_root: Hash,
        transactions: &[Transaction],
    ) -> Self {
        Self {
            id,
            period_id,
            pre_state_root,
            queue: transactions.iter().cloned().collect(),
            executed: Vec::new(),
            awaiting: None,
            voted: None,
        }
    }

    /// Simulation can make progress.
    pub fn is_runnable(&self) -> bool {
        self.voted.is_none() && self.awaiting.is_none()
    }
}
