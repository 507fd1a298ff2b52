//! # Mailbox
//!
//! Read-once store of cross-chain messages for the instance under simulation.
//!
//! A message lives in exactly one place:
//!
//! - **expected**: a header the engine asked for and did not find
//! - **pending**: received, not yet asked for (arrival order kept)
//! - **inbox**: matched and consumed; the engine reads from here
//!
//! Outbound writes are deduplicated by full message identity.

use shared_types::{InstanceId, MailboxEnvelope, MailboxMessage, MailboxMessageHeader};
use std::collections::{BTreeSet, HashSet, VecDeque};

/// What happened to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Satisfied an expectation of the active instance.
    Matched(MailboxMessage),
    /// Held until an expectation asks for it.
    Queued,
    /// Header already consumed or identical message already queued.
    Duplicate,
}

#[derive(Debug, Default)]
pub struct Mailbox {
    expected: BTreeSet<MailboxMessageHeader>,
    pending: VecDeque<(InstanceId, MailboxMessage)>,
    inbox: Vec<MailboxMessage>,
    consumed: HashSet<MailboxMessageHeader>,
    forwarded: HashSet<MailboxMessage>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset per-instance state for a newly started instance.
    pub fn begin(&mut self) {
        self.expected.clear();
        self.inbox.clear();
        self.consumed.clear();
        self.forwarded.clear();
    }

    /// Messages consumed by the active instance, in consumption order.
    pub fn inbox(&self) -> &[MailboxMessage] {
        &self.inbox
    }

    pub fn is_expecting(&self, header: &MailboxMessageHeader) -> bool {
        self.expected.contains(header)
    }

    pub fn expected_len(&self) -> usize {
        self.expected.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Register a read miss.
    pub fn expect(&mut self, header: MailboxMessageHeader) {
        self.expected.insert(header);
    }

    /// Consume the first queued message of `instance` matching `header`.
    pub fn take_pending(
        &mut self,
        instance: InstanceId,
        header: &MailboxMessageHeader,
    ) -> Option<MailboxMessage> {
        let index = self
            .pending
            .iter()
            .position(|(id, msg)| *id == instance && msg.matches(header))?;
        let (_, message) = self.pending.remove(index)?;
        self.consume(message.clone());
        Some(message)
    }

    /// Route an inbound message. `active` is the instance currently simulating.
    pub fn deliver(&mut self, active: Option<InstanceId>, envelope: MailboxEnvelope) -> Delivery {
        let MailboxEnvelope {
            instance_id,
            message,
        } = envelope;

        if active == Some(instance_id) {
            if self.consumed.contains(&message.header) {
                return Delivery::Duplicate;
            }
            if self.expected.contains(&message.header) {
                self.consume(message.clone());
                return Delivery::Matched(message);
            }
        }

        if self
            .pending
            .iter()
            .any(|(id, queued)| *id == instance_id && *queued == message)
        {
            return Delivery::Duplicate;
        }
        self.pending.push_back((instance_id, message));
        Delivery::Queued
    }

    /// Whether an outbound write is new for the active instance.
    pub fn record_outbound(&mut self, message: &MailboxMessage) -> bool {
        self.forwarded.insert(message.clone())
    }

    /// Forget the instance: its expectations, inbox and queued messages.
    pub fn end(&mut self, instance: InstanceId) {
        self.begin();
        self.pending.retain(|(id, _)| *id != instance);
    }

    /// Drop queued messages of an instance that is not the active one.
    pub fn discard(&mut self, instance: InstanceId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|(id, _)| *id != instance);
        before - self.pending.len()
    }

    pub fn clear(&mut self) {
        self.begin();
        self.pending.clear();
    }

    fn consume(&mut self, message: MailboxMessage) {
        self.expected.remove(&message.header);
        self.consumed.insert(message.header.clone());
        self.inbox.push(message);
    }
}
