//! Publisher Service
//!
//! Wraps the state machine with an inbox, the per-instance decision timers
//! and the superblock prover calls. Effects are dispatched after the state
//! lock is released.

use crate::config::PublisherConfig;
use crate::error::{PublisherError, PublisherResult};
use crate::events::{ProofFailure, PublisherEvent, PublisherOutput};
use crate::ports::{PublisherApi, PublisherNetwork, SettlementLayer, SuperblockProver};
use crate::state::{PublisherState, PublisherStatus};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{InstanceId, StartPeriod, XtRequest};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Publisher Service
pub struct PublisherService<N, P, L>
where
    N: PublisherNetwork,
    P: SuperblockProver,
    L: SettlementLayer,
{
    network: Arc<N>,
    prover: Arc<P>,
    settlement: Arc<L>,
    proof_timeout: Duration,
    state: Arc<RwLock<PublisherState>>,
    inbox_tx: mpsc::UnboundedSender<PublisherEvent>,
    inbox_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<PublisherEvent>>,
    timers: Mutex<HashMap<InstanceId, JoinHandle<()>>>,
}

/// Dependencies for PublisherService
pub struct PublisherDependencies<N, P, L> {
    pub network: Arc<N>,
    pub prover: Arc<P>,
    pub settlement: Arc<L>,
    pub config: PublisherConfig,
}

impl<N, P, L> PublisherService<N, P, L>
where
    N: PublisherNetwork + 'static,
    P: SuperblockProver + 'static,
    L: SettlementLayer + 'static,
{
    pub fn new(deps: PublisherDependencies<N, P, L>) -> PublisherResult<Self> {
        deps.config.validate()?;
        Ok(Self::with_state(
            deps.network,
            deps.prover,
            deps.settlement,
            PublisherState::new(deps.config),
        ))
    }

    /// Build around an existing state machine, e.g. one resumed mid-run.
    pub fn with_state(
        network: Arc<N>,
        prover: Arc<P>,
        settlement: Arc<L>,
        state: PublisherState,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            network,
            prover,
            settlement,
            proof_timeout: state.config().proof_timeout(),
            state: Arc::new(RwLock::new(state)),
            inbox_tx,
            inbox_rx: tokio::sync::Mutex::new(inbox_rx),
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Sender side of the inbox, for bus forwarders and the settlement layer.
    pub fn inbox(&self) -> mpsc::UnboundedSender<PublisherEvent> {
        self.inbox_tx.clone()
    }

    pub fn state(&self) -> Arc<RwLock<PublisherState>> {
        self.state.clone()
    }

    /// Apply one event and carry out its effects.
    pub async fn handle(&self, event: PublisherEvent) -> PublisherResult<()> {
        let result = {
            let mut state = self.state.write();
            state.apply(event)
        };
        match result {
            Ok(outputs) => self.dispatch(outputs).await,
            Err(e) => {
                warn!(error = %e, "Event rejected");
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
            let _ = self.handle(event).await;
            processed += 1;
        }
        processed
    }

    /// Process inbox events until shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Publisher running");
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
        for (_, handle) in self.timers.lock().drain() {
            handle.abort();
        }
        info!("Publisher stopped");
    }

    async fn dispatch(&self, outputs: Vec<PublisherOutput>) -> PublisherResult<()> {
        for output in outputs {
            match output {
                PublisherOutput::BroadcastStartPeriod(start) => self
                    .network
                    .broadcast_start_period(start)
                    .await
                    .map_err(PublisherError::Network)?,
                PublisherOutput::BroadcastRollback(rollback) => self
                    .network
                    .broadcast_rollback(rollback)
                    .await
                    .map_err(PublisherError::Network)?,
                PublisherOutput::SendStartInstance {
                    start,
                    participants,
                } => self
                    .network
                    .send_start_instance(&start, &participants)
                    .await
                    .map_err(PublisherError::Network)?,
                PublisherOutput::SendDecided {
                    decided,
                    participants,
                } => self
                    .network
                    .send_decided(decided, &participants)
                    .await
                    .map_err(PublisherError::Network)?,
                PublisherOutput::ScheduleTimeout { instance_id, after } => {
                    let inbox = self.inbox_tx.clone();
                    let handle = tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = inbox.send(PublisherEvent::DecisionTimeout(instance_id));
                    });
                    if let Some(previous) = self.timers.lock().insert(instance_id, handle) {
                        previous.abort();
                    }
                }
                PublisherOutput::CancelTimeout(instance_id) => {
                    if let Some(handle) = self.timers.lock().remove(&instance_id) {
                        handle.abort();
                    }
                }
                PublisherOutput::RequestSuperblockProof {
                    number,
                    last_finalized_hash,
                    proofs,
                } => {
                    let prover = self.prover.clone();
                    let inbox = self.inbox_tx.clone();
                    let deadline = self.proof_timeout;
                    tokio::spawn(async move {
                        let request =
                            prover.request_superblock_proof(number, last_finalized_hash, &proofs);
                        let result = match tokio::time::timeout(deadline, request).await {
                            Ok(Ok(proof)) => Ok(proof),
                            Ok(Err(reason)) => Err(ProofFailure::Failed(reason)),
                            Err(_) => Err(ProofFailure::TimedOut),
                        };
                        let _ = inbox.send(PublisherEvent::ProofResult { number, result });
                    });
                }
                PublisherOutput::PublishSuperblockProof { number, proof } => self
                    .settlement
                    .publish_superblock_proof(number, proof)
                    .await
                    .map_err(PublisherError::Settlement)?,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<N, P, L> PublisherApi for PublisherService<N, P, L>
where
    N: PublisherNetwork + 'static,
    P: SuperblockProver + 'static,
    L: SettlementLayer + 'static,
{
    async fn submit_request(&self, request: XtRequest) -> PublisherResult<InstanceId> {
        let (result, outputs) = self.state.write().submit_request(request);
        self.dispatch(outputs).await?;
        result
    }

    async fn start_period(&self) -> PublisherResult<StartPeriod> {
        let (result, outputs) = self.state.write().start_period();
        self.dispatch(outputs).await?;
        result
    }

    async fn status(&self) -> PublisherStatus {
        self.state.read().status()
    }
}
