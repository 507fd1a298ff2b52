//! Error types for the Sequencer

use shared_types::{CodecError, InstanceId};
use thiserror::Error;

/// Sequencer errors
#[derive(Debug, Error)]
pub enum SequencerError {
    /// `BeginBlock` with a number other than head + 1
    #[error("block number is not sequential: expected {expected}, got {got}")]
    BlockNotSequential { expected: u64, got: u64 },

    #[error("there is already an open block")]
    BlockAlreadyOpen,

    #[error("no open block")]
    NoOpenBlock,

    /// No StartPeriod (or Rollback) has been applied yet
    #[error("no period has started")]
    PeriodNotStarted,

    #[error("local transactions are disabled while an instance is active")]
    LocalTxsDisabled,

    #[error("there is already an active instance")]
    InstanceActive,

    /// StartInstance carried no transactions for this chain
    #[error("instance {instance} has no transactions for this chain")]
    NotAddressed { instance: InstanceId },

    #[error("decision true received without a prior vote")]
    DecisionWithoutVote,

    #[error("decision true contradicts a prior false vote")]
    DecisionContradictsVote,

    #[error("instance already decided")]
    InstanceAlreadyDecided,

    #[error("decision for {got} does not match the active instance {active:?}")]
    MismatchedInstance {
        active: Option<InstanceId>,
        got: InstanceId,
    },

    #[error("mismatched finalized state")]
    MismatchedFinalizedState,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for sequencer operations
pub type SequencerResult<T> = Result<T, SequencerError>;

impl SequencerError {
    /// Caller-visible failure that left state unchanged
    pub fn is_admission_error(&self) -> bool {
        matches!(
            self,
            Self::BlockNotSequential { .. }
                | Self::BlockAlreadyOpen
                | Self::NoOpenBlock
                | Self::PeriodNotStarted
                | Self::LocalTxsDisabled
                | Self::InstanceActive
        )
    }

    /// Fatal: the Publisher or a peer broke the protocol
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::NotAddressed { .. }
                | Self::DecisionWithoutVote
                | Self::DecisionContradictsVote
                | Self::InstanceAlreadyDecided
                | Self::MismatchedInstance { .. }
                | Self::MismatchedFinalizedState
        )
    }
}
