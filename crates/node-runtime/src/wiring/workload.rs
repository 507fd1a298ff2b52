//! Demo workload: random two-chain XTs in which one chain sends a mailbox
//! message the other reads.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use shared_types::{ChainId, XtRequest};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use xt_publisher::{PublisherApi, PublisherError};

use crate::adapters::DevOp;

/// Share of requests whose reading side reverts.
const FAILURE_RATE: f64 = 0.1;

pub struct Workload {
    chains: Vec<ChainId>,
    rng: StdRng,
    next_session: u64,
}

impl Workload {
    pub fn new(chains: Vec<ChainId>) -> Self {
        Self::with_rng(chains, StdRng::from_entropy())
    }

    /// Deterministic workload for tests.
    pub fn seeded(chains: Vec<ChainId>, seed: u64) -> Self {
        Self::with_rng(chains, StdRng::seed_from_u64(seed))
    }

    fn with_rng(chains: Vec<ChainId>, rng: StdRng) -> Self {
        Self {
            chains,
            rng,
            next_session: 1,
        }
    }

    /// `None` with fewer than two chains.
    pub fn next_request(&mut self) -> Option<XtRequest> {
        let pair: Vec<ChainId> = self
            .chains
            .choose_multiple(&mut self.rng, 2)
            .copied()
            .collect();
        let [sender, receiver] = pair[..] else {
            return None;
        };

        let session_id = self.next_session;
        self.next_session += 1;

        let send = DevOp::Send {
            session_id,
            to: receiver,
            label: "ping".into(),
            payload: self.rng.gen::<[u8; 8]>().to_vec(),
        };
        let receive = if self.rng.gen_bool(FAILURE_RATE) {
            DevOp::Fail {
                reason: "insufficient balance".into(),
            }
        } else {
            DevOp::Receive {
                session_id,
                from: sender,
                label: "ping".into(),
            }
        };

        Some(
            XtRequest::new()
                .with_chain(sender, vec![send.into_transaction()])
                .with_chain(receiver, vec![receive.into_transaction()]),
        )
    }
}

pub async fn run_workload<P>(
    publisher: Arc<P>,
    mut workload: Workload,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    P: PublisherApi + ?Sized,
{
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => break,
        }
        let Some(request) = workload.next_request() else {
            warn!("Workload needs at least two chains");
            break;
        };
        match publisher.submit_request(request).await {
            Ok(id) => debug!(instance = %id, "XT submitted"),
            Err(PublisherError::CannotStartInstance { busy }) => {
                debug!(busy = ?busy, "XT queued")
            }
            Err(e) => warn!(error = %e, "XT rejected"),
        }
    }
    info!("Workload stopped");
}
