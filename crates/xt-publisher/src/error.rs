//! Error types for the Publisher

use shared_types::{ChainId, InstanceId, SuperblockNumber};
use thiserror::Error;

/// Publisher errors
#[derive(Debug, Error)]
pub enum PublisherError {
    /// Fewer than two distinct chains
    #[error("invalid request: references {chains} chain(s), at least 2 required")]
    InvalidRequest { chains: usize },

    /// Some participant is locked by a pending instance; the request is queued
    #[error("can not start any instance: chains {busy:?} are busy")]
    CannotStartInstance { busy: Vec<ChainId> },

    #[error("unknown instance {0}")]
    UnknownInstance(InstanceId),

    #[error("vote from non-participant chain {chain}")]
    VoteFromNonParticipant { chain: ChainId },

    #[error("duplicated vote for chain {chain}")]
    DuplicatedVote { chain: ChainId },

    /// Liveness failure: too many superblocks outstanding
    #[error("proof window exceeded: target {new_target} > limit {limit}")]
    ProofWindowExceeded {
        new_target: SuperblockNumber,
        limit: SuperblockNumber,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Settlement error: {0}")]
    Settlement(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for publisher operations
pub type PublisherResult<T> = Result<T, PublisherError>;

impl PublisherError {
    /// Caller-visible rejection that left state unchanged
    pub fn is_admission_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. }
                | Self::CannotStartInstance { .. }
                | Self::UnknownInstance(_)
                | Self::VoteFromNonParticipant { .. }
                | Self::DuplicatedVote { .. }
        )
    }

    /// Handled by the rollback recovery path
    pub fn is_liveness_failure(&self) -> bool {
        matches!(self, Self::ProofWindowExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PublisherError::DuplicatedVote { chain: ChainId(7) }.to_string(),
            "duplicated vote for chain 7"
        );
        assert!(PublisherError::InvalidRequest { chains: 1 }
            .to_string()
            .starts_with("invalid request"));
        assert!(PublisherError::CannotStartInstance { busy: vec![] }
            .to_string()
            .starts_with("can not start any instance"));
    }

    #[test]
    fn test_error_classification() {
        assert!(PublisherError::InvalidRequest { chains: 0 }.is_admission_error());
        assert!(PublisherError::ProofWindowExceeded {
            new_target: 22,
            limit: 21
        }
        .is_liveness_failure());
        assert!(!PublisherError::Network("x".into()).is_admission_error());
    }
}
