//! # Development Execution Engine
//!
//! Interprets transaction bodies as JSON-encoded [`DevOp`]s so a node can
//! exercise mailbox traffic without a real chain behind it. Bodies that do
//! not parse execute as no-ops.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{
    Address, ChainId, Hash, MailboxMessage, MailboxMessageHeader, Transaction,
};
use xt_sequencer::{ExecutionEngine, SimulationOutcome, SimulationRequest};

/// What a development transaction does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DevOp {
    Noop,
    /// Write a mailbox message for `to`.
    Send {
        session_id: u64,
        to: ChainId,
        label: String,
        payload: Vec<u8>,
    },
    /// Read the message `from` wrote under `session_id` and `label`.
    Receive {
        session_id: u64,
        from: ChainId,
        label: String,
    },
    Fail {
        reason: String,
    },
}

impl DevOp {
    pub fn into_transaction(self) -> Transaction {
        // Serializing a plain enum to JSON cannot fail.
        Transaction::user(serde_json::to_vec(&self).unwrap_or_default())
    }
}

/// Address standing in for a chain's bridge contract.
pub fn chain_address(chain: ChainId) -> Address {
    let mut address = [0u8; 20];
    address[12..].copy_from_slice(&chain.0.to_be_bytes());
    address
}

pub struct DevExecutionEngine {
    chain_id: ChainId,
    /// Successful simulations so far; folded into the state root.
    executed: Mutex<u64>,
}

impl DevExecutionEngine {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            executed: Mutex::new(0),
        }
    }

    fn header(&self, session_id: u64, from: ChainId, to: ChainId, label: &str) -> MailboxMessageHeader {
        MailboxMessageHeader {
            session_id,
            source_chain: from,
            destination_chain: to,
            source: chain_address(from),
            receiver: chain_address(to),
            label: label.to_string(),
        }
    }

    fn succeed(&self, writes: Vec<MailboxMessage>) -> SimulationOutcome {
        *self.executed.lock() += 1;
        SimulationOutcome::Success { writes }
    }
}

impl ExecutionEngine for DevExecutionEngine {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    fn state_root(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.chain_id.0.to_be_bytes());
        hasher.update(self.executed.lock().to_be_bytes());
        hasher.finalize().into()
    }

    fn simulate(&self, request: &SimulationRequest) -> SimulationOutcome {
        let Ok(op) = serde_json::from_slice::<DevOp>(&request.transaction.data) else {
            return self.succeed(Vec::new());
        };
        match op {
            DevOp::Noop => self.succeed(Vec::new()),
            DevOp::Send {
                session_id,
                to,
                label,
                payload,
            } => {
                let header = self.header(session_id, self.chain_id, to, &label);
                self.succeed(vec![MailboxMessage { header, payload }])
            }
            DevOp::Receive {
                session_id,
                from,
                label,
            } => {
                let header = self.header(session_id, from, self.chain_id, &label);
                if request.inbox.iter().any(|m| m.matches(&header)) {
                    self.succeed(Vec::new())
                } else {
                    SimulationOutcome::ReadMiss {
                        header,
                        writes: Vec::new(),
                    }
                }
            }
            DevOp::Fail { reason } => SimulationOutcome::Failed { reason },
        }
    }
}
