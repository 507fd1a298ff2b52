//! Sequencer Service
//!
//! Owns the state machine behind a lock, an inbox of inbound events, the
//! per-instance decision timers and the in-flight prover calls.
//!
//! Each event is applied under the write lock; the resulting effects are
//! dispatched after the lock is released, so no guard is held across an
//! `.await`.

use crate::config::SequencerConfig;
use crate::domain::BlockTag;
use crate::error::{SequencerError, SequencerResult};
use crate::events::{SequencerEvent, SequencerOutput};
use crate::ports::{ExecutionEngine, SequencerApi, SequencerNetwork, SettlementProver};
use crate::state::{SequencerState, SequencerStatus};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{BlockHeader, ChainId, InstanceId, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Sequencer Service
pub struct SequencerService<E, N, P>
where
    E: ExecutionEngine,
    N: SequencerNetwork,
    P: SettlementProver,
{
    chain_id: ChainId,
    engine: Arc<E>,
    network: Arc<N>,
    prover: Arc<P>,
    state: Arc<RwLock<SequencerState>>,
    inbox_tx: mpsc::UnboundedSender<SequencerEvent>,
    inbox_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<SequencerEvent>>,
    timers: Mutex<HashMap<InstanceId, JoinHandle<()>>>,
}

/// Dependencies for SequencerService
pub struct SequencerDependencies<E, N, P> {
    pub engine: Arc<E>,
    pub network: Arc<N>,
    pub prover: Arc<P>,
    pub config: SequencerConfig,
}

impl<E, N, P> SequencerService<E, N, P>
where
    E: ExecutionEngine + 'static,
    N: SequencerNetwork + 'static,
    P: SettlementProver + 'static,
{
    pub fn new(deps: SequencerDependencies<E, N, P>) -> SequencerResult<Self> {
        deps.config.validate()?;
        if deps.engine.chain_id() != deps.config.chain_id {
            return Err(SequencerError::InvalidConfig(format!(
                "engine serves chain {} but sequencer is configured for {}",
                deps.engine.chain_id(),
                deps.config.chain_id
            )));
        }
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Ok(Self {
            chain_id: deps.config.chain_id,
            engine: deps.engine,
            network: deps.network,
            prover: deps.prover,
            state: Arc::new(RwLock::new(SequencerState::new(deps.config))),
            inbox_tx,
            inbox_rx: tokio::sync::Mutex::new(inbox_rx),
            timers: Mutex::new(HashMap::new()),
        })
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    /// Sender side of the inbox, for bus forwarders.
    pub fn inbox(&self) -> mpsc::UnboundedSender<SequencerEvent> {
        self.inbox_tx.clone()
    }

    /// Read access to the state machine (tests and diagnostics).
    pub fn state(&self) -> Arc<RwLock<SequencerState>> {
        self.state.clone()
    }

    /// Apply one event and carry out its effects.
    pub async fn handle(&self, event: SequencerEvent) -> SequencerResult<()> {
        let result = {
            let mut state = self.state.write();
            state.apply(event, self.engine.as_ref())
        };
        match result {
            Ok(outputs) => self.dispatch(outputs).await,
            Err(e) => {
                if e.is_protocol_violation() {
                    error!(chain = %self.chain_id, error = %e, "Protocol violation");
                } else {
                    warn!(chain = %self.chain_id, error = %e, "Event rejected");
                }
                Err(e)
            }
        }
    }

    /// Drain everything currently queued in the inbox.
    pub async fn process_pending(&self) -> usize {
        let mut processed = 0;
        loop {
            let next = self.inbox_rx.lock().await.try_recv();
            let Ok(event) = next else {
                break;
            };
            // Failures are logged in `handle`; keep draining.
            let _ = self.handle(event).await;
            processed += 1;
        }
        processed
    }

    /// Process inbox events until shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(chain = %self.chain_id, "Sequencer running");
        let mut inbox = self.inbox_rx.lock().await;
        loop {
            tokio::select! {
                event = inbox.recv() => {
                    let Some(event) = event else { break };
                    let _ = self.handle(event).await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        self.cancel_all_timers();
        info!(chain = %self.chain_id, "Sequencer stopped");
    }

    async fn dispatch(&self, outputs: Vec<SequencerOutput>) -> SequencerResult<()> {
        for output in outputs {
            match output {
                SequencerOutput::Vote(vote) => self
                    .network
                    .send_vote(vote)
                    .await
                    .map_err(SequencerError::Network)?,
                SequencerOutput::Mailbox { to, envelope } => self
                    .network
                    .send_mailbox_message(to, envelope)
                    .await
                    .map_err(SequencerError::Network)?,
                SequencerOutput::Proof(proof) => self
                    .network
                    .send_proof(proof)
                    .await
                    .map_err(SequencerError::Network)?,
                SequencerOutput::ScheduleTimeout { instance_id, after } => {
                    let inbox = self.inbox_tx.clone();
                    let handle = tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = inbox.send(SequencerEvent::InstanceTimeout(instance_id));
                    });
                    if let Some(previous) = self.timers.lock().insert(instance_id, handle) {
                        previous.abort();
                    }
                }
                SequencerOutput::CancelTimeout(instance_id) => {
                    if let Some(handle) = self.timers.lock().remove(&instance_id) {
                        handle.abort();
                    }
                }
                SequencerOutput::RequestSettlementProof {
                    period_id,
                    target_superblock,
                    last_block,
                } => {
                    let prover = self.prover.clone();
                    let inbox = self.inbox_tx.clone();
                    tokio::spawn(async move {
                        let result = prover
                            .request_settlement_proof(period_id, target_superblock, &last_block)
                            .await;
                        let _ = inbox.send(SequencerEvent::SettlementProofReady {
                            period_id,
                            target_superblock,
                            result,
                        });
                    });
                }
            }
        }
        Ok(())
    }

    fn cancel_all_timers(&self) {
        for (_, handle) in self.timers.lock().drain() {
            handle.abort();
        }
    }
}

#[async_trait]
impl<E, N, P> SequencerApi for SequencerService<E, N, P>
where
    E: ExecutionEngine + 'static,
    N: SequencerNetwork + 'static,
    P: SettlementProver + 'static,
{
    async fn begin_block(&self, number: u64) -> SequencerResult<BlockTag> {
        self.state.write().begin_block(number)
    }

    async fn add_local_tx(&self, tx: Transaction) -> SequencerResult<()> {
        self.state.write().add_local_tx(tx)
    }

    async fn seal_block(&self) -> SequencerResult<BlockHeader> {
        let (header, outputs) = {
            let mut state = self.state.write();
            state.seal_block(self.engine.state_root())?
        };
        self.dispatch(outputs).await?;
        Ok(header)
    }

    async fn status(&self) -> SequencerStatus {
        self.state.read().status()
    }
}
