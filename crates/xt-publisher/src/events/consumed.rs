//! Consumed events (Incoming)

use shared_bus::ProtocolEvent;
use shared_types::{ChainId, InstanceId, Proof, SuperblockNumber, SuperblockRef, Vote};
use std::fmt;

/// Why a superblock proof request produced no proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofFailure {
    Failed(String),
    TimedOut,
}

impl fmt::Display for ProofFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "proof request failed: {reason}"),
            Self::TimedOut => write!(f, "proof request timed out"),
        }
    }
}

/// Everything that drives the Publisher besides its API calls.
#[derive(Debug, Clone)]
pub enum PublisherEvent {
    Vote(Vote),
    Proof { from: ChainId, proof: Proof },
    SuperblockFinalized(SuperblockRef),
    /// Decision timer of an instance fired.
    DecisionTimeout(InstanceId),
    /// The superblock prover answered, failed or timed out.
    ProofResult {
        number: SuperblockNumber,
        result: Result<Vec<u8>, ProofFailure>,
    },
}

impl PublisherEvent {
    /// Map a bus event into an inbox event.
    pub fn from_bus(event: ProtocolEvent) -> Option<Self> {
        match event {
            ProtocolEvent::Vote(vote) => Some(Self::Vote(vote)),
            ProtocolEvent::Proof { from, payload } => Some(Self::Proof {
                from,
                proof: payload,
            }),
            ProtocolEvent::SuperblockFinalized(f) => Some(Self::SuperblockFinalized(f.superblock)),
            _ => None,
        }
    }
}
