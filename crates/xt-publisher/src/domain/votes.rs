//! Vote collection for one pending instance.

use crate::error::{PublisherError, PublisherResult};
use shared_types::{ChainId, InstanceId, PeriodId};
use std::collections::BTreeMap;

/// Where an instance stands after a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally {
    Pending,
    Decided(bool),
}

#[derive(Debug, Clone)]
pub struct InstanceVotes {
    pub id: InstanceId,
    pub period_id: PeriodId,
    pub sequence_number: u64,
    participants: Vec<ChainId>,
    votes: BTreeMap<ChainId, bool>,
}

impl InstanceVotes {
    pub fn new(
        id: InstanceId,
        period_id: PeriodId,
        sequence_number: u64,
        participants: Vec<ChainId>,
    ) -> Self {
        Self {
            id,
            period_id,
            sequence_number,
            participants,
            votes: BTreeMap::new(),
        }
    }

    pub fn participants(&self) -> &[ChainId] {
        &self.participants
    }

    pub fn votes(&self) -> &BTreeMap<ChainId, bool> {
        &self.votes
    }

    /// Record `chain`'s vote. A `false` decides immediately; unanimity of
    /// `true` decides once the last participant has voted.
    pub fn record(&mut self, chain: ChainId, vote: bool) -> PublisherResult<Tally> {
        if !self.participants.contains(&chain) {
            return Err(PublisherError::VoteFromNonParticipant { chain });
        }
        if self.votes.contains_key(&chain) {
            return Err(PublisherError::DuplicatedVote { chain });
        }
        self.votes.insert(chain, vote);

        if !vote {
            return Ok(Tally::Decided(false));
        }
        if self.votes.len() == self.participants.len() {
            return Ok(Tally::Decided(true));
        }
        Ok(Tally::Pending)
    }
}
