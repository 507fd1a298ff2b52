//! # Protocol Events
//!
//! Every message that flows between the Publisher, the Sequencers and the
//! settlement layer. Payloads are defined in `shared-types/src/ipc.rs`.

use serde::{Deserialize, Serialize};
use shared_types::{
    ChainId, Decided, MailboxEnvelope, Proof, Rollback, StartInstance, StartPeriod,
    SuperblockFinalized, Vote,
};

/// All events that can be published to the bus.
///
/// Point-to-point events name their addressee; broadcast events reach every
/// sequencer subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProtocolEvent {
    // =========================================================================
    // SBCP (Publisher -> all sequencers)
    // =========================================================================
    /// A new period started.
    StartPeriod(StartPeriod),

    /// Sequencers must discard unfinalized work.
    Rollback(Rollback),

    // =========================================================================
    // SCP (Publisher <-> participants)
    // =========================================================================
    /// Start an instance on one participant.
    StartInstance {
        /// Addressee.
        to: ChainId,
        /// Instance description.
        payload: StartInstance,
    },

    /// A participant's vote.
    Vote(Vote),

    /// Final decision for one participant.
    Decided {
        /// Addressee.
        to: ChainId,
        /// Decision.
        payload: Decided,
    },

    // =========================================================================
    // MAILBOX (Sequencer -> Sequencer)
    // =========================================================================
    /// A mailbox message for the destination chain's sequencer.
    Mailbox {
        /// Addressee.
        to: ChainId,
        /// Instance-tagged message.
        payload: MailboxEnvelope,
    },

    // =========================================================================
    // SETTLEMENT
    // =========================================================================
    /// A sequencer's settlement proof.
    Proof {
        /// Chain that produced the proof.
        from: ChainId,
        /// The proof.
        payload: Proof,
    },

    /// The settlement layer finalized a superblock.
    SuperblockFinalized(SuperblockFinalized),
}

impl ProtocolEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::StartPeriod(_) | Self::Rollback(_) => EventTopic::Period,
            Self::StartInstance { .. } | Self::Vote(_) | Self::Decided { .. } => {
                EventTopic::Instance
            }
            Self::Mailbox { .. } => EventTopic::Mailbox,
            Self::Proof { .. } | Self::SuperblockFinalized(_) => EventTopic::Settlement,
        }
    }

    /// Whether `endpoint` should see this event.
    #[must_use]
    pub fn is_for(&self, endpoint: Endpoint) -> bool {
        match (self, endpoint) {
            (
                Self::Vote(_) | Self::Proof { .. } | Self::SuperblockFinalized(_),
                Endpoint::Publisher,
            ) => true,
            (Self::StartPeriod(_) | Self::Rollback(_), Endpoint::Sequencer(_)) => true,
            (
                Self::StartInstance { to, .. }
                | Self::Decided { to, .. }
                | Self::Mailbox { to, .. },
                Endpoint::Sequencer(chain),
            ) => *to == chain,
            _ => false,
        }
    }
}

/// An actor that consumes events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    /// The Publisher.
    Publisher,
    /// The sequencer of one chain.
    Sequencer(ChainId),
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Period and rollback broadcasts.
    Period,
    /// Instance start, votes and decisions.
    Instance,
    /// Cross-chain mailbox traffic.
    Mailbox,
    /// Proofs and finalization.
    Settlement,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Only events addressed to this endpoint. `None` means no restriction.
    pub endpoint: Option<Endpoint>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            endpoint: None,
        }
    }

    /// Everything the Publisher consumes.
    #[must_use]
    pub fn for_publisher() -> Self {
        Self {
            topics: Vec::new(),
            endpoint: Some(Endpoint::Publisher),
        }
    }

    /// Everything the sequencer of `chain` consumes.
    #[must_use]
    pub fn for_sequencer(chain: ChainId) -> Self {
        Self {
            topics: Vec::new(),
            endpoint: Some(Endpoint::Sequencer(chain)),
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &ProtocolEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let endpoint_match = self.endpoint.map_or(true, |e| event.is_for(e));

        topic_match && endpoint_match
    }
}
