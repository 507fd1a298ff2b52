//! Sequencer state machine
//!
//! Single-threaded: every method processes one event to completion and
//! returns the effects to carry out. The service owns the lock and the I/O.

use crate::config::SequencerConfig;
use crate::domain::{
    ActiveInstance, BlockBuilder, BlockTag, Delivery, InstanceRecord, InstanceStatus, Mailbox,
    SettlementTracker,
};
use crate::error::{SequencerError, SequencerResult};
use crate::events::{SequencerEvent, SequencerOutput};
use crate::metrics;
use crate::ports::outbound::{ExecutionEngine, SimulationOutcome, SimulationRequest};
use shared_types::{
    BlockHeader, ChainId, Decided, Hash, InstanceId, MailboxEnvelope, MailboxMessage, PeriodId,
    Rollback, StartInstance, StartPeriod, SuperblockNumber, SuperblockRef, Transaction, Vote,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, info, warn};

/// Point-in-time view of a sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerStatus {
    pub chain_id: ChainId,
    /// Current period and target superblock.
    pub period: Option<BlockTag>,
    pub head: u64,
    pub open_block: Option<u64>,
    pub active_instance: Option<InstanceId>,
    pub finalized: SuperblockRef,
}

pub struct SequencerState {
    config: SequencerConfig,
    current: Option<BlockTag>,
    finalized: SuperblockRef,
    blocks: BlockBuilder,
    mailbox: Mailbox,
    active: Option<ActiveInstance>,
    instances: HashMap<InstanceId, InstanceRecord>,
    last_sequence: BTreeMap<PeriodId, u64>,
    settlement: SettlementTracker,
}

impl SequencerState {
    pub fn new(config: SequencerConfig) -> Self {
        Self {
            finalized: config.genesis,
            blocks: BlockBuilder::new(config.chain_id),
            config,
            current: None,
            mailbox: Mailbox::new(),
            active: None,
            instances: HashMap::new(),
            last_sequence: BTreeMap::new(),
            settlement: SettlementTracker::new(),
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.config.chain_id
    }

    pub fn status(&self) -> SequencerStatus {
        SequencerStatus {
            chain_id: self.config.chain_id,
            period: self.current,
            head: self.blocks.head(),
            open_block: self.blocks.open_block().map(|b| b.number),
            active_instance: self.active.as_ref().map(|a| a.id),
            finalized: self.finalized,
        }
    }

    pub fn blocks(&self) -> &BlockBuilder {
        &self.blocks
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn active(&self) -> Option<&ActiveInstance> {
        self.active.as_ref()
    }

    pub fn instance(&self, id: &InstanceId) -> Option<&InstanceRecord> {
        self.instances.get(id)
    }

    pub fn settlement(&self) -> &SettlementTracker {
        &self.settlement
    }

    /// Apply one inbound event.
    pub fn apply(
        &mut self,
        event: SequencerEvent,
        engine: &dyn ExecutionEngine,
    ) -> SequencerResult<Vec<SequencerOutput>> {
        match event {
            SequencerEvent::StartPeriod(sp) => Ok(self.on_start_period(sp)),
            SequencerEvent::Rollback(rb) => self.on_rollback(rb),
            SequencerEvent::SuperblockFinalized(sb) => {
                self.on_superblock_finalized(sb);
                Ok(Vec::new())
            }
            SequencerEvent::StartInstance(si) => self.on_start_instance(si, engine),
            SequencerEvent::Decided(d) => self.on_decided(d),
            SequencerEvent::Mailbox(envelope) => self.on_mailbox(envelope, engine),
            SequencerEvent::InstanceTimeout(id) => Ok(self.on_timeout(id)),
            SequencerEvent::SettlementProofReady {
                period_id,
                target_superblock,
                result,
            } => Ok(self.on_settlement_proof(period_id, target_superblock, result)),
        }
    }

    // =========================================================================
    // PERIODS, SETTLEMENT, ROLLBACK
    // =========================================================================

    pub fn on_start_period(&mut self, sp: StartPeriod) -> Vec<SequencerOutput> {
        if let Some(current) = self.current {
            if sp.period_id <= current.period_id {
                debug!(chain = %self.config.chain_id, period = sp.period_id, current = current.period_id, "Stale StartPeriod ignored");
                return Vec::new();
            }
        }

        let previous = self.current.replace(BlockTag {
            period_id: sp.period_id,
            target_superblock: sp.target_superblock,
        });
        self.settlement
            .record_period(sp.period_id, sp.target_superblock);
        info!(
            chain = %self.config.chain_id,
            period = sp.period_id,
            target = sp.target_superblock,
            "Period started"
        );

        let outputs = match previous {
            Some(prev) => self.settle_ended(prev.period_id),
            None => Vec::new(),
        };
        self.prune_history();
        outputs
    }

    /// Settle ended periods from `from` onwards, in period order. A period
    /// whose block is still open holds back every later one.
    fn settle_ended(&mut self, from: PeriodId) -> Vec<SequencerOutput> {
        let Some(current) = self.current else {
            return Vec::new();
        };
        let mut outputs = Vec::new();
        for period_id in self.settlement.periods_between(from, current.period_id) {
            if let Some(open) = self.blocks.open_tag().filter(|tag| tag.period_id <= period_id) {
                debug!(
                    chain = %self.config.chain_id,
                    period = period_id,
                    open_period = open.period_id,
                    "Settlement deferred until the open block seals"
                );
                break;
            }
            outputs.extend(self.settle_period(period_id));
        }
        outputs
    }

    /// Settlement trigger for an ended period.
    fn settle_period(&mut self, period_id: PeriodId) -> Vec<SequencerOutput> {
        if let Some(header) = self.blocks.last_sealed_in_period(period_id).cloned() {
            let target = header.target_superblock;
            if !self.settlement.begin_request(period_id, target) {
                return Vec::new();
            }
            info!(chain = %self.config.chain_id, period = period_id, target, block = header.number, "Requesting settlement proof");
            return vec![SequencerOutput::RequestSettlementProof {
                period_id,
                target_superblock: target,
                last_block: header,
            }];
        }

        // Quiescent period.
        let Some(target) = self.settlement.target_of(period_id) else {
            return Vec::new();
        };
        if self.settlement.awaiting_before(period_id) {
            debug!(chain = %self.config.chain_id, period = period_id, "No blocks in period, waiting for an earlier proof");
            return Vec::new();
        }
        match self.settlement.resend_for(period_id) {
            Some(proof) if self.settlement.begin_request(period_id, target) => {
                info!(chain = %self.config.chain_id, period = period_id, target, "No blocks in period, resending cached proof");
                vec![SequencerOutput::Proof(proof)]
            }
            Some(_) => Vec::new(),
            None => {
                debug!(chain = %self.config.chain_id, period = period_id, "No blocks in period and no cached proof");
                Vec::new()
            }
        }
    }

    pub fn on_settlement_proof(
        &mut self,
        period_id: PeriodId,
        target_superblock: SuperblockNumber,
        result: Result<Vec<u8>, String>,
    ) -> Vec<SequencerOutput> {
        let proof_data = match result {
            Ok(data) => data,
            Err(e) => {
                warn!(chain = %self.config.chain_id, period = period_id, error = %e, "Settlement proof request failed");
                return Vec::new();
            }
        };
        match self
            .settlement
            .complete(period_id, target_superblock, proof_data)
        {
            Some(proof) => {
                metrics::record_settlement_proof();
                info!(chain = %self.config.chain_id, period = period_id, superblock = target_superblock, "Settlement proof ready");
                let mut outputs = vec![SequencerOutput::Proof(proof)];
                // Quiescent periods that ended meanwhile reuse this proof.
                outputs.extend(self.settle_ended(period_id + 1));
                outputs
            }
            None => {
                debug!(chain = %self.config.chain_id, period = period_id, "Late settlement proof ignored");
                Vec::new()
            }
        }
    }

    pub fn on_rollback(&mut self, rb: Rollback) -> SequencerResult<Vec<SequencerOutput>> {
        if rb.superblock_number != self.finalized.number
            || rb.superblock_hash != self.finalized.hash
        {
            error!(
                chain = %self.config.chain_id,
                rollback_to = rb.superblock_number,
                finalized = self.finalized.number,
                "Rollback does not match finalized state"
            );
            return Err(SequencerError::MismatchedFinalizedState);
        }

        let mut outputs = Vec::new();
        if let Some(active) = self.active.take() {
            outputs.push(SequencerOutput::CancelTimeout(active.id));
        }
        for record in self.instances.values_mut() {
            if record.status == InstanceStatus::Pending {
                record.status = InstanceStatus::Cancelled;
            }
        }
        self.mailbox.clear();
        let removed = self.blocks.rollback(rb.superblock_number);
        self.settlement.rollback(rb.superblock_number);

        let tag = BlockTag {
            period_id: rb.period_id,
            target_superblock: rb.next_target(),
        };
        self.current = Some(tag);
        self.settlement
            .record_period(tag.period_id, tag.target_superblock);

        warn!(
            chain = %self.config.chain_id,
            period = tag.period_id,
            target = tag.target_superblock,
            removed_blocks = removed,
            head = self.blocks.head(),
            "Rolled back to last finalized superblock"
        );
        Ok(outputs)
    }

    pub fn on_superblock_finalized(&mut self, superblock: SuperblockRef) {
        if superblock.number <= self.finalized.number {
            debug!(chain = %self.config.chain_id, number = superblock.number, "Stale finalization ignored");
            return;
        }
        self.finalized = superblock;
        self.blocks.prune_finalized(superblock.number);
        info!(chain = %self.config.chain_id, number = superblock.number, "Superblock finalized");
    }

    // =========================================================================
    // BLOCK BUILDING
    // =========================================================================

    pub fn begin_block(&mut self, number: u64) -> SequencerResult<BlockTag> {
        let tag = self.current.ok_or(SequencerError::PeriodNotStarted)?;
        self.blocks.begin(number, tag)?;
        debug!(chain = %self.config.chain_id, block = number, period = tag.period_id, "Block opened");
        Ok(tag)
    }

    pub fn add_local_tx(&mut self, tx: Transaction) -> SequencerResult<()> {
        if self.active.is_some() {
            return Err(SequencerError::LocalTxsDisabled);
        }
        self.blocks.push(tx)
    }

    pub fn seal_block(
        &mut self,
        state_root: Hash,
    ) -> SequencerResult<(BlockHeader, Vec<SequencerOutput>)> {
        if self.active.is_some() {
            return Err(SequencerError::InstanceActive);
        }
        let header = self.blocks.seal(state_root)?;
        metrics::record_block_sealed();
        debug!(chain = %self.config.chain_id, block = header.number, period = header.period_id, "Block sealed");

        let ended = self
            .current
            .is_some_and(|current| header.period_id < current.period_id);
        let outputs = if ended {
            self.settle_ended(header.period_id)
        } else {
            Vec::new()
        };
        Ok((header, outputs))
    }

    // =========================================================================
    // INSTANCES
    // =========================================================================

    pub fn on_start_instance(
        &mut self,
        start: StartInstance,
        engine: &dyn ExecutionEngine,
    ) -> SequencerResult<Vec<SequencerOutput>> {
        let id = start.instance_id;
        let local = start.xt_request.transactions_for(self.config.chain_id);
        if local.is_empty() {
            error!(chain = %self.config.chain_id, instance = %id, "Addressed by an instance without local transactions");
            return Err(SequencerError::NotAddressed { instance: id });
        }
        if self.instances.contains_key(&id) {
            debug!(chain = %self.config.chain_id, instance = %id, "Duplicate StartInstance ignored");
            return Ok(Vec::new());
        }

        let last_sequence = self
            .last_sequence
            .get(&start.period_id)
            .copied()
            .unwrap_or(0);
        let refusal = match self.blocks.open_tag() {
            None => Some("no open block"),
            Some(tag) if tag.period_id != start.period_id => Some("period mismatch"),
            Some(_) if start.sequence_number <= last_sequence => Some("sequence not increasing"),
            Some(_) if self.active.is_some() => Some("another instance is active"),
            Some(_) => None,
        };
        if let Some(reason) = refusal {
            warn!(
                chain = %self.config.chain_id,
                instance = %id,
                period = start.period_id,
                sequence = start.sequence_number,
                reason,
                "Refusing instance"
            );
            self.instances.insert(
                id,
                InstanceRecord::refused(start.period_id, start.sequence_number),
            );
            self.mailbox.discard(id);
            return Ok(vec![self.vote(id, false)]);
        }

        self.last_sequence
            .insert(start.period_id, start.sequence_number);
        self.instances.insert(
            id,
            InstanceRecord::started(start.period_id, start.sequence_number),
        );
        self.mailbox.begin();
        self.active = Some(ActiveInstance::new(
            id,
            start.period_id,
            engine.state_root(),
            local,
        ));
        info!(
            chain = %self.config.chain_id,
            instance = %id,
            sequence = start.sequence_number,
            txs = local.len(),
            "Instance started"
        );

        let mut outputs = vec![SequencerOutput::ScheduleTimeout {
            instance_id: id,
            after: self.config.instance_timeout(),
        }];
        outputs.extend(self.simulate(engine)?);
        Ok(outputs)
    }

    /// Run the active instance until it votes or suspends on a read miss.
    fn simulate(&mut self, engine: &dyn ExecutionEngine) -> SequencerResult<Vec<SequencerOutput>> {
        let mut outputs = Vec::new();
        loop {
            let Some(active) = self.active.as_mut() else {
                break;
            };
            if !active.is_runnable() {
                break;
            }
            let id = active.id;
            let Some(tx) = active.queue.pop_front() else {
                active.voted = Some(true);
                outputs.push(self.vote(id, true));
                break;
            };

            let request = SimulationRequest {
                instance_id: id,
                state_root: active.pre_state_root,
                transaction: tx.clone(),
                inbox: self.mailbox.inbox().to_vec(),
            };
            match engine.simulate(&request) {
                SimulationOutcome::Success { writes } => {
                    active.executed.push(tx);
                    outputs.extend(self.forward_writes(id, writes));
                }
                SimulationOutcome::ReadMiss { header, writes } => {
                    active.queue.push_front(tx);
                    outputs.extend(self.forward_writes(id, writes));

                    if let Some(message) = self.mailbox.take_pending(id, &header) {
                        debug!(chain = %self.config.chain_id, instance = %id, label = %header.label, "Read miss satisfied from queue");
                        metrics::record_mailbox("matched");
                        let relay = Transaction::mailbox_relay(&message)?;
                        if let Some(active) = self.active.as_mut() {
                            active.queue.push_front(relay);
                        }
                        continue;
                    }

                    debug!(chain = %self.config.chain_id, instance = %id, label = %header.label, source = %header.source_chain, "Simulation suspended on read miss");
                    self.mailbox.expect(header.clone());
                    if let Some(active) = self.active.as_mut() {
                        active.awaiting = Some(header);
                    }
                    break;
                }
                SimulationOutcome::Failed { reason } => {
                    warn!(chain = %self.config.chain_id, instance = %id, reason = %reason, "Simulation failed");
                    active.voted = Some(false);
                    outputs.push(self.vote(id, false));
                    break;
                }
            }
        }
        Ok(outputs)
    }

    fn forward_writes(
        &mut self,
        instance_id: InstanceId,
        writes: Vec<MailboxMessage>,
    ) -> Vec<SequencerOutput> {
        let mut outputs = Vec::new();
        for message in writes {
            if !self.mailbox.record_outbound(&message) {
                continue;
            }
            outputs.push(SequencerOutput::Mailbox {
                to: message.header.destination_chain,
                envelope: MailboxEnvelope {
                    instance_id,
                    message,
                },
            });
        }
        outputs
    }

    fn vote(&mut self, instance_id: InstanceId, vote: bool) -> SequencerOutput {
        if let Some(record) = self.instances.get_mut(&instance_id) {
            record.voted = Some(vote);
        }
        metrics::record_vote(vote);
        info!(chain = %self.config.chain_id, instance = %instance_id, vote, "Vote cast");
        SequencerOutput::Vote(Vote {
            instance_id,
            chain_id: self.config.chain_id,
            vote,
        })
    }

    pub fn on_mailbox(
        &mut self,
        envelope: MailboxEnvelope,
        engine: &dyn ExecutionEngine,
    ) -> SequencerResult<Vec<SequencerOutput>> {
        let header = &envelope.message.header;
        if header.destination_chain != self.config.chain_id {
            warn!(chain = %self.config.chain_id, destination = %header.destination_chain, "Misrouted mailbox message dropped");
            return Ok(Vec::new());
        }

        let active_id = self.active.as_ref().map(|a| a.id);
        if active_id != Some(envelope.instance_id)
            && self.instances.contains_key(&envelope.instance_id)
        {
            debug!(chain = %self.config.chain_id, instance = %envelope.instance_id, "Mailbox message for finished instance dropped");
            metrics::record_mailbox("stale");
            return Ok(Vec::new());
        }

        let instance_id = envelope.instance_id;
        match self.mailbox.deliver(active_id, envelope) {
            Delivery::Matched(message) => {
                metrics::record_mailbox("matched");
                debug!(chain = %self.config.chain_id, instance = %instance_id, label = %message.header.label, "Mailbox message matched, resuming");
                let relay = Transaction::mailbox_relay(&message)?;
                if let Some(active) = self.active.as_mut() {
                    active.queue.push_front(relay);
                    if active.awaiting.as_ref() == Some(&message.header) {
                        active.awaiting = None;
                    }
                }
                self.simulate(engine)
            }
            Delivery::Queued => {
                metrics::record_mailbox("queued");
                debug!(chain = %self.config.chain_id, instance = %instance_id, pending = self.mailbox.pending_len(), "Mailbox message queued");
                Ok(Vec::new())
            }
            Delivery::Duplicate => {
                metrics::record_mailbox("duplicate");
                debug!(chain = %self.config.chain_id, instance = %instance_id, "Duplicate mailbox message absorbed");
                Ok(Vec::new())
            }
        }
    }

    pub fn on_timeout(&mut self, instance_id: InstanceId) -> Vec<SequencerOutput> {
        let expired = self
            .active
            .as_ref()
            .is_some_and(|a| a.id == instance_id && a.voted.is_none());
        if !expired {
            debug!(chain = %self.config.chain_id, instance = %instance_id, "Timer fired after vote, ignored");
            return Vec::new();
        }

        warn!(chain = %self.config.chain_id, instance = %instance_id, "Instance timed out before voting");
        let vote = self.vote(instance_id, false);
        if let Some(record) = self.instances.get_mut(&instance_id) {
            record.status = InstanceStatus::Rejected;
        }
        self.active = None;
        self.mailbox.end(instance_id);
        vec![vote]
    }

    pub fn on_decided(&mut self, decided: Decided) -> SequencerResult<Vec<SequencerOutput>> {
        let id = decided.instance_id;

        if !self.instances.contains_key(&id) {
            if decided.decision {
                error!(chain = %self.config.chain_id, instance = %id, "Accepted decision for an instance never voted on");
                return Err(SequencerError::DecisionWithoutVote);
            }
            debug!(chain = %self.config.chain_id, instance = %id, "Rejection for unseen instance recorded");
            let period = self.current.map(|c| c.period_id).unwrap_or(0);
            let mut record = InstanceRecord::started(period, 0);
            record.status = InstanceStatus::Rejected;
            record.decision_received = true;
            self.instances.insert(id, record);
            self.mailbox.discard(id);
            return Ok(Vec::new());
        }

        let active_id = self.active.as_ref().map(|a| a.id);
        if let Some(record) = self.instances.get(&id) {
            if record.decision_received {
                error!(chain = %self.config.chain_id, instance = %id, "Second decision for instance");
                return Err(SequencerError::InstanceAlreadyDecided);
            }
            if record.status == InstanceStatus::Cancelled {
                debug!(chain = %self.config.chain_id, instance = %id, "Decision for cancelled instance ignored");
                return Ok(Vec::new());
            }
            if decided.decision {
                match record.voted {
                    Some(true) => {}
                    Some(false) => {
                        error!(chain = %self.config.chain_id, instance = %id, "Accepted decision contradicts our false vote");
                        return Err(SequencerError::DecisionContradictsVote);
                    }
                    None => {
                        error!(chain = %self.config.chain_id, instance = %id, "Accepted decision before our vote");
                        return Err(SequencerError::DecisionWithoutVote);
                    }
                }
                if active_id != Some(id) {
                    error!(chain = %self.config.chain_id, instance = %id, "Accepted decision for a non-active instance");
                    return Err(SequencerError::MismatchedInstance {
                        active: active_id,
                        got: id,
                    });
                }
                if self.blocks.open_block().is_none() {
                    return Err(SequencerError::NoOpenBlock);
                }
            }
        }

        if let Some(record) = self.instances.get_mut(&id) {
            record.decision_received = true;
            record.status = if decided.decision {
                InstanceStatus::Accepted
            } else {
                InstanceStatus::Rejected
            };
        }

        let mut outputs = Vec::new();
        if active_id == Some(id) {
            if let Some(active) = self.active.take() {
                outputs.push(SequencerOutput::CancelTimeout(id));
                self.mailbox.end(id);
                if decided.decision {
                    let included = active.executed.len();
                    self.blocks.extend(active.executed)?;
                    info!(chain = %self.config.chain_id, instance = %id, included, "Instance accepted");
                } else {
                    info!(chain = %self.config.chain_id, instance = %id, "Instance rejected, transactions discarded");
                }
            }
        } else {
            self.mailbox.discard(id);
            debug!(chain = %self.config.chain_id, instance = %id, decision = decided.decision, "Decision recorded");
        }
        Ok(outputs)
    }

    fn prune_history(&mut self) {
        let Some(current) = self.current else {
            return;
        };
        let oldest = current
            .period_id
            .saturating_sub(self.config.history_periods);
        let active_id = self.active.as_ref().map(|a| a.id);
        let expired: Vec<InstanceId> = self
            .instances
            .iter()
            .filter(|(id, record)| record.period_id < oldest && Some(**id) != active_id)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            self.instances.remove(&id);
            self.mailbox.discard(id);
        }
        self.last_sequence = self.last_sequence.split_off(&oldest);
        self.settlement.prune_before(oldest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{MailboxMessageHeader, XtRequest};
    use std::collections::HashMap as Map;

    /// Scripted behaviour per transaction body.
    #[derive(Default, Clone)]
    struct Script {
        reads: Option<MailboxMessageHeader>,
        writes: Vec<MailboxMessage>,
        fail: bool,
    }

    #[derive(Default)]
    struct ScriptedEngine {
        scripts: Map<Vec<u8>, Script>,
    }

    impl ScriptedEngine {
        fn with(mut self, body: &[u8], script: Script) -> Self {
            self.scripts.insert(body.to_vec(), script);
            self
        }
    }

    impl ExecutionEngine for ScriptedEngine {
        fn chain_id(&self) -> ChainId {
            ChainId(1)
        }

        fn state_root(&self) -> Hash {
            [0xEE; 32]
        }

        fn simulate(&self, request: &SimulationRequest) -> SimulationOutcome {
            if request.transaction.kind == shared_types::TxKind::MailboxRelay {
                return SimulationOutcome::Success { writes: vec![] };
            }
            let script = self
                .scripts
                .get(&request.transaction.data)
                .cloned()
                .unwrap_or_default();
            if script.fail {
                return SimulationOutcome::Failed {
                    reason: "reverted".into(),
                };
            }
            match script.reads {
                Some(header) if !request.inbox.iter().any(|m| m.matches(&header)) => {
                    SimulationOutcome::ReadMiss {
                        header,
                        writes: script.writes,
                    }
                }
                _ => SimulationOutcome::Success {
                    writes: script.writes,
                },
            }
        }
    }

    fn header(from: u64, to: u64, label: &str) -> MailboxMessageHeader {
        MailboxMessageHeader {
            session_id: 1,
            source_chain: ChainId(from),
            destination_chain: ChainId(to),
            source: [from as u8; 20],
            receiver: [to as u8; 20],
            label: label.into(),
        }
    }

    fn message(from: u64, to: u64, label: &str) -> MailboxMessage {
        MailboxMessage {
            header: header(from, to, label),
            payload: vec![1, 2, 3],
        }
    }

    fn state() -> SequencerState {
        SequencerState::new(SequencerConfig::for_chain(ChainId(1)))
    }

    fn started(period: PeriodId, target: SuperblockNumber) -> SequencerState {
        let mut s = state();
        s.on_start_period(StartPeriod {
            period_id: period,
            target_superblock: target,
        });
        s
    }

    fn start_instance(id: u8, period: PeriodId, seq: u64, bodies: &[&[u8]]) -> StartInstance {
        let txs = bodies.iter().map(|b| Transaction::user(b.to_vec())).collect();
        StartInstance {
            instance_id: InstanceId([id; 32]),
            period_id: period,
            sequence_number: seq,
            xt_request: XtRequest::new()
                .with_chain(ChainId(1), txs)
                .with_chain(ChainId(2), vec![Transaction::user(vec![0])]),
        }
    }

    fn votes(outputs: &[SequencerOutput]) -> Vec<bool> {
        outputs
            .iter()
            .filter_map(|o| match o {
                SequencerOutput::Vote(v) => Some(v.vote),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_begin_block_requires_period() {
        let mut s = state();
        assert!(matches!(
            s.begin_block(1),
            Err(SequencerError::PeriodNotStarted)
        ));
    }

    #[test]
    fn test_no_open_block_votes_false() {
        let mut s = started(1, 1);
        let engine = ScriptedEngine::default();

        let out = s
            .on_start_instance(start_instance(1, 1, 1, &[b"a"]), &engine)
            .unwrap();

        assert_eq!(votes(&out), vec![false]);
        assert!(s.active().is_none());
    }

    #[test]
    fn test_not_addressed_is_error() {
        let mut s = started(1, 1);
        let mut si = start_instance(1, 1, 1, &[b"a"]);
        si.xt_request = XtRequest::new()
            .with_chain(ChainId(2), vec![Transaction::user(vec![0])])
            .with_chain(ChainId(3), vec![Transaction::user(vec![0])]);
        let err = s
            .on_start_instance(si, &ScriptedEngine::default())
            .unwrap_err();
        assert!(err.is_protocol_violation());
    }

    #[test]
    fn test_successful_simulation_votes_true_and_locks() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();
        let engine = ScriptedEngine::default();

        let out = s
            .on_start_instance(start_instance(1, 1, 1, &[b"a", b"b"]), &engine)
            .unwrap();

        assert!(matches!(
            out[0],
            SequencerOutput::ScheduleTimeout { .. }
        ));
        assert_eq!(votes(&out), vec![true]);
        assert!(matches!(
            s.add_local_tx(Transaction::user(vec![9])),
            Err(SequencerError::LocalTxsDisabled)
        ));
        assert!(matches!(
            s.seal_block([0; 32]),
            Err(SequencerError::InstanceActive)
        ));
        assert_eq!(s.active().unwrap().pre_state_root, [0xEE; 32]);
    }

    #[test]
    fn test_period_mismatch_and_sequence_checks() {
        let mut s = started(2, 2);
        s.begin_block(1).unwrap();
        let engine = ScriptedEngine::default();

        let out = s
            .on_start_instance(start_instance(1, 1, 1, &[b"a"]), &engine)
            .unwrap();
        assert_eq!(votes(&out), vec![false]);

        s.on_start_instance(start_instance(2, 2, 3, &[b"a"]), &engine)
            .unwrap();
        s.on_decided(Decided {
            instance_id: InstanceId([2; 32]),
            decision: true,
        })
        .unwrap();

        // Sequence 3 was already used in period 2.
        let out = s
            .on_start_instance(start_instance(3, 2, 3, &[b"a"]), &engine)
            .unwrap();
        assert_eq!(votes(&out), vec![false]);
    }

    #[test]
    fn test_exclusivity_votes_false() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();
        let engine = ScriptedEngine::default();
        s.on_start_instance(start_instance(1, 1, 1, &[b"a"]), &engine)
            .unwrap();

        let out = s
            .on_start_instance(start_instance(2, 1, 2, &[b"a"]), &engine)
            .unwrap();
        assert_eq!(votes(&out), vec![false]);
        assert_eq!(s.active().unwrap().id, InstanceId([1; 32]));
    }

    #[test]
    fn test_failure_votes_false_and_stops() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();
        let engine = ScriptedEngine::default().with(
            b"bad",
            Script {
                fail: true,
                ..Script::default()
            },
        );

        let out = s
            .on_start_instance(start_instance(1, 1, 1, &[b"bad", b"never"]), &engine)
            .unwrap();

        assert_eq!(votes(&out), vec![false]);
        assert_eq!(s.active().unwrap().queue.len(), 1);
    }

    #[test]
    fn test_read_miss_suspends_then_resumes_on_match() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();
        let engine = ScriptedEngine::default().with(
            b"read",
            Script {
                reads: Some(header(2, 1, "ack")),
                writes: vec![message(1, 2, "req")],
                ..Script::default()
            },
        );

        let out = s
            .on_start_instance(start_instance(1, 1, 1, &[b"read"]), &engine)
            .unwrap();
        assert!(votes(&out).is_empty());
        assert!(out.iter().any(|o| matches!(
            o,
            SequencerOutput::Mailbox { to: ChainId(2), .. }
        )));
        assert!(s.mailbox().is_expecting(&header(2, 1, "ack")));

        // Unrelated message is queued, nothing restarts.
        let out = s
            .on_mailbox(
                MailboxEnvelope {
                    instance_id: InstanceId([1; 32]),
                    message: message(2, 1, "other"),
                },
                &engine,
            )
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(s.mailbox().pending_len(), 1);

        let out = s
            .on_mailbox(
                MailboxEnvelope {
                    instance_id: InstanceId([1; 32]),
                    message: message(2, 1, "ack"),
                },
                &engine,
            )
            .unwrap();
        assert_eq!(votes(&out), vec![true]);
        // The re-run wrote the same request again; it is not re-sent.
        assert!(!out
            .iter()
            .any(|o| matches!(o, SequencerOutput::Mailbox { .. })));

        let executed = &s.active().unwrap().executed;
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0].kind, shared_types::TxKind::MailboxRelay);
    }

    #[test]
    fn test_early_message_satisfies_read_miss_immediately() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();
        let engine = ScriptedEngine::default().with(
            b"read",
            Script {
                reads: Some(header(2, 1, "ack")),
                ..Script::default()
            },
        );

        s.on_mailbox(
            MailboxEnvelope {
                instance_id: InstanceId([1; 32]),
                message: message(2, 1, "ack"),
            },
            &engine,
        )
        .unwrap();

        let out = s
            .on_start_instance(start_instance(1, 1, 1, &[b"read"]), &engine)
            .unwrap();
        assert_eq!(votes(&out), vec![true]);
    }

    #[test]
    fn test_messages_for_instances_that_never_run_are_dropped() {
        let mut s = started(1, 1);
        let engine = ScriptedEngine::default();

        // No open block: every instance is refused, then rejected.
        for id in 10..60u8 {
            s.on_mailbox(
                MailboxEnvelope {
                    instance_id: InstanceId([id; 32]),
                    message: message(2, 1, "transfer"),
                },
                &engine,
            )
            .unwrap();
            let out = s
                .on_start_instance(start_instance(id, 1, id as u64, &[b"a"]), &engine)
                .unwrap();
            assert_eq!(votes(&out), vec![false]);
            s.on_decided(Decided {
                instance_id: InstanceId([id; 32]),
                decision: false,
            })
            .unwrap();
        }
        assert_eq!(s.mailbox().pending_len(), 0);

        // Rejected before its StartInstance ever arrived.
        s.on_mailbox(
            MailboxEnvelope {
                instance_id: InstanceId([70; 32]),
                message: message(2, 1, "transfer"),
            },
            &engine,
        )
        .unwrap();
        assert_eq!(s.mailbox().pending_len(), 1);
        s.on_decided(Decided {
            instance_id: InstanceId([70; 32]),
            decision: false,
        })
        .unwrap();
        assert_eq!(s.mailbox().pending_len(), 0);
    }

    #[test]
    fn test_rejecting_other_instance_keeps_active_mailbox() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();
        let engine = ScriptedEngine::default().with(
            b"read",
            Script {
                reads: Some(header(2, 1, "ack")),
                ..Script::default()
            },
        );
        s.on_start_instance(start_instance(1, 1, 1, &[b"read"]), &engine)
            .unwrap();

        s.on_mailbox(
            MailboxEnvelope {
                instance_id: InstanceId([2; 32]),
                message: message(2, 1, "other"),
            },
            &engine,
        )
        .unwrap();
        let out = s
            .on_start_instance(start_instance(2, 1, 2, &[b"a"]), &engine)
            .unwrap();
        assert_eq!(votes(&out), vec![false]);
        assert_eq!(s.mailbox().pending_len(), 0);

        // The active instance still resumes on its message.
        assert!(s.mailbox().is_expecting(&header(2, 1, "ack")));
        let out = s
            .on_mailbox(
                MailboxEnvelope {
                    instance_id: InstanceId([1; 32]),
                    message: message(2, 1, "ack"),
                },
                &engine,
            )
            .unwrap();
        assert_eq!(votes(&out), vec![true]);
    }

    #[test]
    fn test_timeout_without_vote_rejects_locally() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();
        let engine = ScriptedEngine::default().with(
            b"read",
            Script {
                reads: Some(header(2, 1, "ack")),
                ..Script::default()
            },
        );
        let id = InstanceId([1; 32]);
        s.on_start_instance(start_instance(1, 1, 1, &[b"read"]), &engine)
            .unwrap();

        let out = s.on_timeout(id);
        assert_eq!(votes(&out), vec![false]);
        assert!(s.active().is_none());
        assert_eq!(s.instance(&id).unwrap().status, InstanceStatus::Rejected);

        // Second expiry is a no-op; the publisher's rejection still applies.
        assert!(s.on_timeout(id).is_empty());
        assert!(s
            .on_decided(Decided {
                instance_id: id,
                decision: false
            })
            .is_ok());
    }

    #[test]
    fn test_timeout_after_vote_is_noop() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();
        let id = InstanceId([1; 32]);
        s.on_start_instance(start_instance(1, 1, 1, &[b"a"]), &ScriptedEngine::default())
            .unwrap();
        assert!(s.on_timeout(id).is_empty());
        assert!(s.active().is_some());
    }

    #[test]
    fn test_accept_includes_transactions() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();
        s.add_local_tx(Transaction::user(vec![7])).unwrap();
        let id = InstanceId([1; 32]);
        s.on_start_instance(start_instance(1, 1, 1, &[b"a", b"b"]), &ScriptedEngine::default())
            .unwrap();

        let out = s
            .on_decided(Decided {
                instance_id: id,
                decision: true,
            })
            .unwrap();

        assert_eq!(out, vec![SequencerOutput::CancelTimeout(id)]);
        assert_eq!(s.blocks().open_block().unwrap().transactions.len(), 3);
        assert!(s.add_local_tx(Transaction::user(vec![8])).is_ok());
        assert_eq!(s.instance(&id).unwrap().status, InstanceStatus::Accepted);
    }

    #[test]
    fn test_reject_discards_transactions() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();
        let id = InstanceId([1; 32]);
        s.on_start_instance(start_instance(1, 1, 1, &[b"a"]), &ScriptedEngine::default())
            .unwrap();

        s.on_decided(Decided {
            instance_id: id,
            decision: false,
        })
        .unwrap();

        assert!(s.blocks().open_block().unwrap().transactions.is_empty());
        assert!(s.active().is_none());
    }

    #[test]
    fn test_decision_protocol_violations() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();
        let engine = ScriptedEngine::default().with(
            b"bad",
            Script {
                fail: true,
                ..Script::default()
            },
        );

        // True for an instance never seen.
        let err = s
            .on_decided(Decided {
                instance_id: InstanceId([9; 32]),
                decision: true,
            })
            .unwrap_err();
        assert!(matches!(err, SequencerError::DecisionWithoutVote));

        // True contradicting a false vote.
        s.on_start_instance(start_instance(1, 1, 1, &[b"bad"]), &engine)
            .unwrap();
        let err = s
            .on_decided(Decided {
                instance_id: InstanceId([1; 32]),
                decision: true,
            })
            .unwrap_err();
        assert!(matches!(err, SequencerError::DecisionContradictsVote));

        // Second decision.
        s.on_decided(Decided {
            instance_id: InstanceId([1; 32]),
            decision: false,
        })
        .unwrap();
        let err = s
            .on_decided(Decided {
                instance_id: InstanceId([1; 32]),
                decision: false,
            })
            .unwrap_err();
        assert!(matches!(err, SequencerError::InstanceAlreadyDecided));
    }

    #[test]
    fn test_decision_true_while_suspended_is_violation() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();
        let engine = ScriptedEngine::default().with(
            b"read",
            Script {
                reads: Some(header(2, 1, "ack")),
                ..Script::default()
            },
        );
        s.on_start_instance(start_instance(1, 1, 1, &[b"read"]), &engine)
            .unwrap();
        let err = s
            .on_decided(Decided {
                instance_id: InstanceId([1; 32]),
                decision: true,
            })
            .unwrap_err();
        assert!(matches!(err, SequencerError::DecisionWithoutVote));
        assert!(s.active().is_some());
    }

    #[test]
    fn test_settlement_deferred_until_seal() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();

        let out = s.on_start_period(StartPeriod {
            period_id: 2,
            target_superblock: 2,
        });
        assert!(out.is_empty());

        let (header, out) = s.seal_block([1; 32]).unwrap();
        assert_eq!(header.period_id, 1);
        assert!(matches!(
            &out[..],
            [SequencerOutput::RequestSettlementProof {
                period_id: 1,
                target_superblock: 1,
                ..
            }]
        ));

        let out = s.on_settlement_proof(1, 1, Ok(vec![0xAB]));
        assert!(matches!(&out[..], [SequencerOutput::Proof(p)] if p.superblock_number == 1));
    }

    #[test]
    fn test_settlement_requested_at_period_start_when_sealed() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();
        s.seal_block([1; 32]).unwrap();
        s.begin_block(2).unwrap();
        s.seal_block([2; 32]).unwrap();

        let out = s.on_start_period(StartPeriod {
            period_id: 2,
            target_superblock: 2,
        });
        match &out[..] {
            [SequencerOutput::RequestSettlementProof { last_block, .. }] => {
                assert_eq!(last_block.number, 2)
            }
            other => panic!("unexpected outputs: {other:?}"),
        }
    }

    #[test]
    fn test_quiescent_period_resends_cached_proof() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();
        s.seal_block([1; 32]).unwrap();
        s.on_start_period(StartPeriod {
            period_id: 2,
            target_superblock: 2,
        });
        s.on_settlement_proof(1, 1, Ok(vec![0xCD]));

        let out = s.on_start_period(StartPeriod {
            period_id: 3,
            target_superblock: 3,
        });
        match &out[..] {
            [SequencerOutput::Proof(p)] => {
                assert_eq!(p.period_id, 2);
                assert_eq!(p.superblock_number, 2);
                assert_eq!(p.proof_data, vec![0xCD]);
            }
            other => panic!("unexpected outputs: {other:?}"),
        }
    }

    #[test]
    fn test_later_periods_settle_after_open_block_seals() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();
        s.seal_block([1; 32]).unwrap();
        s.on_start_period(StartPeriod {
            period_id: 2,
            target_superblock: 2,
        });
        s.on_settlement_proof(1, 1, Ok(vec![0xCD]));

        // Period 2 keeps its block open across two period starts.
        s.begin_block(2).unwrap();
        for period in [3, 4] {
            let out = s.on_start_period(StartPeriod {
                period_id: period,
                target_superblock: period,
            });
            assert!(out.is_empty(), "period {period}: {out:?}");
        }

        let (_, out) = s.seal_block([2; 32]).unwrap();
        match &out[..] {
            [SequencerOutput::RequestSettlementProof { period_id: 2, .. }] => {}
            other => panic!("unexpected outputs: {other:?}"),
        }

        // Period 3 produced no blocks and goes out right after period 2.
        let out = s.on_settlement_proof(2, 2, Ok(vec![0xEF]));
        let proven: Vec<_> = out
            .iter()
            .map(|o| match o {
                SequencerOutput::Proof(p) => (p.period_id, p.superblock_number, p.proof_data.clone()),
                other => panic!("unexpected output: {other:?}"),
            })
            .collect();
        assert_eq!(proven, vec![(2, 2, vec![0xEF]), (3, 3, vec![0xEF])]);
    }

    #[test]
    fn test_rollback_deletes_unfinalized_blocks() {
        let mut s = started(1, 1);
        s.on_superblock_finalized(SuperblockRef::new(1, [1; 32]));
        s.begin_block(1).unwrap();
        s.seal_block([1; 32]).unwrap();
        s.on_start_period(StartPeriod {
            period_id: 2,
            target_superblock: 2,
        });
        s.begin_block(2).unwrap();
        s.seal_block([2; 32]).unwrap();
        s.begin_block(3).unwrap();
        s.on_start_instance(start_instance(1, 2, 1, &[b"a"]), &ScriptedEngine::default())
            .unwrap();

        let out = s
            .on_rollback(Rollback {
                period_id: 3,
                superblock_number: 1,
                superblock_hash: [1; 32],
            })
            .unwrap();

        assert_eq!(out, vec![SequencerOutput::CancelTimeout(InstanceId([1; 32]))]);
        let status = s.status();
        assert_eq!(status.head, 1);
        assert_eq!(status.open_block, None);
        assert_eq!(status.active_instance, None);
        assert_eq!(
            status.period,
            Some(BlockTag {
                period_id: 3,
                target_superblock: 2
            })
        );
        assert_eq!(
            s.instance(&InstanceId([1; 32])).unwrap().status,
            InstanceStatus::Cancelled
        );
        // A late decision for the cancelled instance is ignored.
        assert!(s
            .on_decided(Decided {
                instance_id: InstanceId([1; 32]),
                decision: true
            })
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_rollback_with_mismatched_state_changes_nothing() {
        let mut s = started(1, 1);
        s.begin_block(1).unwrap();
        let before = s.status();

        let err = s
            .on_rollback(Rollback {
                period_id: 5,
                superblock_number: 3,
                superblock_hash: [3; 32],
            })
            .unwrap_err();

        assert!(matches!(err, SequencerError::MismatchedFinalizedState));
        assert_eq!(s.status(), before);
    }

    #[test]
    fn test_finalization_is_monotonic() {
        let mut s = state();
        s.on_superblock_finalized(SuperblockRef::new(3, [3; 32]));
        s.on_superblock_finalized(SuperblockRef::new(2, [2; 32]));
        assert_eq!(s.status().finalized.number, 3);
    }
}
