//! Publisher state machine
//!
//! Processes one event or API call at a time and returns the effects to
//! carry out. Owns the period counter, the pending instances with their
//! votes, the active chain set and the proof cache.

use crate::config::PublisherConfig;
use crate::domain::{InstanceScheduler, InstanceVotes, PeriodLifecycle, ProofAggregator, Tally};
use crate::error::{PublisherError, PublisherResult};
use crate::events::{ProofFailure, PublisherEvent, PublisherOutput};
use crate::metrics;
use shared_types::{
    ChainId, Decided, InstanceId, PeriodId, Proof, StartInstance, StartPeriod, SuperblockNumber,
    SuperblockRef, Vote, XtRequest,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Point-in-time view of the Publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherStatus {
    pub period_id: PeriodId,
    pub target_superblock: SuperblockNumber,
    pub last_finalized: SuperblockRef,
    pub last_sequence: u64,
    pub pending_instances: usize,
    pub active_chains: Vec<ChainId>,
    pub queued_requests: usize,
    /// Superblock with an aggregate proof request in flight.
    pub proving: Option<SuperblockNumber>,
}

pub struct PublisherState {
    config: PublisherConfig,
    period: PeriodLifecycle,
    scheduler: InstanceScheduler,
    instances: HashMap<InstanceId, InstanceVotes>,
    /// Outcomes of recently decided instances, by period.
    decided: HashMap<InstanceId, (PeriodId, bool)>,
    proofs: ProofAggregator,
}

impl PublisherState {
    pub fn new(config: PublisherConfig) -> Self {
        let period = PeriodLifecycle::new(config.genesis, config.proof_window);
        Self::with_lifecycle(config, period)
    }

    /// Start from `current_period` targeting `target_superblock`, with
    /// `config.genesis` as the last finalized superblock.
    pub fn resume(
        config: PublisherConfig,
        current_period: PeriodId,
        target_superblock: SuperblockNumber,
    ) -> Self {
        let period = PeriodLifecycle::resume(
            current_period,
            target_superblock,
            config.genesis,
            config.proof_window,
        );
        Self::with_lifecycle(config, period)
    }

    fn with_lifecycle(config: PublisherConfig, period: PeriodLifecycle) -> Self {
        Self {
            config,
            period,
            scheduler: InstanceScheduler::new(),
            instances: HashMap::new(),
            decided: HashMap::new(),
            proofs: ProofAggregator::new(),
        }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub fn status(&self) -> PublisherStatus {
        PublisherStatus {
            period_id: self.period.current_period(),
            target_superblock: self.period.target_superblock(),
            last_finalized: self.period.last_finalized(),
            last_sequence: self.period.last_sequence(),
            pending_instances: self.instances.len(),
            active_chains: self.scheduler.active_chains(),
            queued_requests: self.scheduler.queued(),
            proving: self.proofs.proving(),
        }
    }

    pub fn instance(&self, id: &InstanceId) -> Option<&InstanceVotes> {
        self.instances.get(id)
    }

    /// Final outcome of a recently decided instance.
    pub fn decision_of(&self, id: &InstanceId) -> Option<bool> {
        self.decided.get(id).map(|(_, decision)| *decision)
    }

    pub fn queued_requests(&self) -> usize {
        self.scheduler.queued()
    }

    /// Apply one inbound event.
    pub fn apply(&mut self, event: PublisherEvent) -> PublisherResult<Vec<PublisherOutput>> {
        match event {
            PublisherEvent::Vote(vote) => self.on_vote(vote),
            PublisherEvent::Proof { from, proof } => Ok(self.on_proof(from, proof)),
            PublisherEvent::SuperblockFinalized(sb) => {
                self.on_superblock_finalized(sb);
                Ok(Vec::new())
            }
            PublisherEvent::DecisionTimeout(id) => Ok(self.on_decision_timeout(id)),
            PublisherEvent::ProofResult { number, result } => {
                Ok(self.on_proof_result(number, result))
            }
        }
    }

    // =========================================================================
    // PERIODS AND ROLLBACK
    // =========================================================================

    /// Advance to the next period.
    ///
    /// The outputs are returned on both paths: a proof-window violation
    /// yields the rollback broadcast alongside the error.
    pub fn start_period(&mut self) -> (PublisherResult<StartPeriod>, Vec<PublisherOutput>) {
        match self.period.advance() {
            Ok(start) => {
                info!(
                    period = start.period_id,
                    target = start.target_superblock,
                    "Period started"
                );
                self.prune_decided();
                let mut outputs = vec![PublisherOutput::BroadcastStartPeriod(start)];
                outputs.extend(self.retry_queued());
                (Ok(start), outputs)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    last_finalized = self.period.last_finalized().number,
                    "Proof window exceeded"
                );
                let next_period = self.period.current_period() + 1;
                let outputs = self.roll_back(next_period, "proof_window");
                (Err(e), outputs)
            }
        }
    }

    /// Broadcast a rollback to the last finalized superblock and drop all
    /// in-flight work.
    fn roll_back(&mut self, period_id: PeriodId, cause: &'static str) -> Vec<PublisherOutput> {
        let rollback = self.period.rollback(period_id);
        let mut outputs = vec![PublisherOutput::BroadcastRollback(rollback)];

        let mut cancelled: Vec<_> = self.instances.drain().collect();
        cancelled.sort_by_key(|(_, votes)| votes.sequence_number);
        for (id, votes) in cancelled {
            self.decided.insert(id, (votes.period_id, false));
            outputs.push(PublisherOutput::CancelTimeout(id));
        }
        self.scheduler.release_all();
        self.proofs.reset();

        metrics::record_rollback(cause);
        warn!(
            period = rollback.period_id,
            superblock = rollback.superblock_number,
            target = self.period.target_superblock(),
            cause,
            "Rollback broadcast"
        );
        outputs
    }

    pub fn on_superblock_finalized(&mut self, superblock: SuperblockRef) {
        if !self.period.finalize(superblock) {
            debug!(
                superblock = superblock.number,
                last_finalized = self.period.last_finalized().number,
                "Stale finalization ignored"
            );
            return;
        }
        self.proofs.prune(superblock.number);
        info!(superblock = superblock.number, "Superblock finalized");
    }

    /// Keep outcomes of the current and previous period only.
    fn prune_decided(&mut self) {
        let keep_from = self.period.current_period().saturating_sub(1);
        self.decided.retain(|_, (period, _)| *period >= keep_from);
    }

    // =========================================================================
    // INSTANCE SCHEDULING
    // =========================================================================

    /// Admit `request`, or queue it if a participant is busy.
    ///
    /// Queued requests that became admissible are started first. Their
    /// outputs are returned even when `request` itself is refused.
    pub fn submit_request(
        &mut self,
        request: XtRequest,
    ) -> (PublisherResult<InstanceId>, Vec<PublisherOutput>) {
        let chains = request.chains();
        if chains.len() < 2 {
            warn!(chains = chains.len(), "Invalid request");
            return (
                Err(PublisherError::InvalidRequest {
                    chains: chains.len(),
                }),
                Vec::new(),
            );
        }

        // Participants only; empty per-chain lists are not forwarded.
        let request = request.restricted_to(&chains);

        let mut outputs = self.retry_queued();
        let busy = self.scheduler.busy(&chains);
        if !busy.is_empty() {
            warn!(busy = ?busy, queued = self.scheduler.queued() + 1, "Chains busy, request queued");
            self.scheduler.enqueue(request);
            return (Err(PublisherError::CannotStartInstance { busy }), outputs);
        }

        let id = self.admit(request, &mut outputs);
        (Ok(id), outputs)
    }

    fn admit(&mut self, request: XtRequest, outputs: &mut Vec<PublisherOutput>) -> InstanceId {
        let period_id = self.period.current_period();
        let sequence_number = self.period.next_sequence();
        let instance_id = InstanceId::derive(period_id, sequence_number, &request);
        let participants = request.chains();

        self.scheduler.lock(&participants);
        self.instances.insert(
            instance_id,
            InstanceVotes::new(
                instance_id,
                period_id,
                sequence_number,
                participants.clone(),
            ),
        );
        metrics::record_instance_started();
        info!(
            instance = %instance_id,
            period = period_id,
            sequence = sequence_number,
            participants = ?participants,
            "Instance started"
        );

        outputs.push(PublisherOutput::SendStartInstance {
            start: StartInstance {
                instance_id,
                period_id,
                sequence_number,
                xt_request: request,
            },
            participants,
        });
        outputs.push(PublisherOutput::ScheduleTimeout {
            instance_id,
            after: self.config.instance_timeout(),
        });
        instance_id
    }

    fn retry_queued(&mut self) -> Vec<PublisherOutput> {
        let mut outputs = Vec::new();
        for request in self.scheduler.take_admissible() {
            let id = self.admit(request, &mut outputs);
            debug!(instance = %id, "Queued request admitted");
        }
        outputs
    }

    // =========================================================================
    // VOTES AND DECISIONS
    // =========================================================================

    pub fn on_vote(&mut self, vote: Vote) -> PublisherResult<Vec<PublisherOutput>> {
        let id = vote.instance_id;
        if self.decided.contains_key(&id) {
            debug!(instance = %id, chain = %vote.chain_id, "Vote after decision ignored");
            return Ok(Vec::new());
        }
        let Some(instance) = self.instances.get_mut(&id) else {
            return Err(PublisherError::UnknownInstance(id));
        };

        match instance.record(vote.chain_id, vote.vote)? {
            Tally::Pending => {
                debug!(instance = %id, chain = %vote.chain_id, vote = vote.vote, "Vote recorded");
                Ok(Vec::new())
            }
            Tally::Decided(decision) => Ok(self.decide(id, decision)),
        }
    }

    pub fn on_decision_timeout(&mut self, id: InstanceId) -> Vec<PublisherOutput> {
        let Some(instance) = self.instances.get(&id) else {
            debug!(instance = %id, "Timeout after decision ignored");
            return Vec::new();
        };
        let missing: Vec<ChainId> = instance
            .participants()
            .iter()
            .copied()
            .filter(|c| !instance.votes().contains_key(c))
            .collect();
        warn!(instance = %id, missing = ?missing, "Decision timeout, rejecting");
        self.decide(id, false)
    }

    fn decide(&mut self, id: InstanceId, decision: bool) -> Vec<PublisherOutput> {
        let Some(instance) = self.instances.remove(&id) else {
            return Vec::new();
        };
        self.scheduler.release(instance.participants());
        self.decided.insert(id, (instance.period_id, decision));
        metrics::record_decision(decision);
        info!(instance = %id, decision, "Instance decided");

        let mut outputs = vec![
            PublisherOutput::SendDecided {
                decided: Decided {
                    instance_id: id,
                    decision,
                },
                participants: instance.participants().to_vec(),
            },
            PublisherOutput::CancelTimeout(id),
        ];
        outputs.extend(self.retry_queued());
        outputs
    }

    // =========================================================================
    // PROOF AGGREGATION
    // =========================================================================

    pub fn on_proof(&mut self, from: ChainId, proof: Proof) -> Vec<PublisherOutput> {
        if !self.config.chains.contains(&from) {
            debug!(chain = %from, "Proof from unknown chain ignored");
            return Vec::new();
        }
        let next = self.period.next_to_prove();
        if let Err(reason) =
            self.proofs
                .offer(next, from, proof.superblock_number, proof.proof_data)
        {
            debug!(
                chain = %from,
                superblock = proof.superblock_number,
                next,
                reason = ?reason,
                "Proof ignored"
            );
            return Vec::new();
        }
        if !self.proofs.covers(&self.config.chains) {
            debug!(chain = %from, superblock = next, "Proof cached");
            return Vec::new();
        }

        let Some((number, proofs)) = self.proofs.start_proving() else {
            return Vec::new();
        };
        metrics::record_proof_requested();
        info!(superblock = number, chains = proofs.len(), "Requesting superblock proof");
        vec![PublisherOutput::RequestSuperblockProof {
            number,
            last_finalized_hash: self.period.last_finalized().hash,
            proofs,
        }]
    }

    pub fn on_proof_result(
        &mut self,
        number: SuperblockNumber,
        result: Result<Vec<u8>, ProofFailure>,
    ) -> Vec<PublisherOutput> {
        if !self.proofs.finish(number) {
            debug!(superblock = number, "Late proof result ignored");
            return Vec::new();
        }
        match result {
            Ok(proof) => {
                info!(superblock = number, "Superblock proof ready");
                vec![PublisherOutput::PublishSuperblockProof { number, proof }]
            }
            Err(failure) => {
                let cause = match &failure {
                    ProofFailure::TimedOut => {
                        warn!(
                            superblock = number,
                            active_chains = ?self.scheduler.active_chains(),
                            "Superblock proof timed out"
                        );
                        "proof_timeout"
                    }
                    ProofFailure::Failed(_) => {
                        warn!(superblock = number, error = %failure, "Superblock proof failed");
                        "proof_failure"
                    }
                };
                let period = self.period.current_period();
                self.roll_back(period, cause)
            }
        }
    }
}
