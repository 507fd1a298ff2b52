//! # Mailbox Messages
//!
//! Cross-chain messages exchanged between sequencers while an instance is
//! being simulated. Identity for read-once matching is the header alone;
//! the payload is not part of it.

use crate::entities::{Address, ChainId, InstanceId};
use serde::{Deserialize, Serialize};

/// Header of a mailbox message.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MailboxMessageHeader {
    /// Session the message belongs to.
    pub session_id: u64,
    /// Chain that wrote the message.
    pub source_chain: ChainId,
    /// Chain that reads the message.
    pub destination_chain: ChainId,
    /// Writing account on the source chain.
    pub source: Address,
    /// Reading account on the destination chain.
    pub receiver: Address,
    /// Application label.
    pub label: String,
}

/// A mailbox message: header plus payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MailboxMessage {
    /// Matching identity.
    pub header: MailboxMessageHeader,
    /// Opaque payload.
    pub payload: Vec<u8>,
}

impl MailboxMessage {
    /// Whether this message satisfies an expectation for `header`.
    pub fn matches(&self, header: &MailboxMessageHeader) -> bool {
        &self.header == header
    }
}

/// A mailbox message tagged with the instance it was produced for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxEnvelope {
    /// Instance under simulation.
    pub instance_id: InstanceId,
    /// The message.
    pub message: MailboxMessage,
}
