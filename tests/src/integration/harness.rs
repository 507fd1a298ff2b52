//! # Network Harness
//!
//! Builds a node container, subscribes every actor to the bus and spawns
//! their loops. Block production and period ticks are left to the test.

use std::time::Duration;

use node_runtime::container::{NodeConfig, NodeContainer, NodePublisher, NodeSequencer};
use shared_types::{BlockHeader, ChainId, InstanceId, StartPeriod, SuperblockRef, Transaction};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use xt_publisher::{PublisherApi, PublisherResult};
use xt_sequencer::SequencerApi;

/// Upper bound on (virtual) time any condition may take.
const SETTLE_LIMIT: Duration = Duration::from_secs(30);
const POLL: Duration = Duration::from_millis(10);

/// Three chains, no background workload, fast L1.
pub fn test_config() -> NodeConfig {
    let mut config = NodeConfig::default();
    config.chains = vec![ChainId(1), ChainId(2), ChainId(3)];
    config.workload_interval_ms = 0;
    config.l1_finality_delay_ms = 50;
    config.publisher.proof_window = 4;
    config
}

/// Poll `condition` until it holds, failing the test after `SETTLE_LIMIT`.
pub async fn eventually<F>(what: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + SETTLE_LIMIT;
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(POLL).await;
    }
}

pub struct Network {
    container: NodeContainer,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Network {
    /// Must be called inside a tokio runtime.
    pub fn start(config: NodeConfig) -> Self {
        let container = NodeContainer::new(config).expect("test config is valid");
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::new();

        tasks.push(tokio::spawn(xt_publisher::forward_bus_events(
            container.publisher_subscription(),
            container.publisher.inbox(),
        )));
        for (chain, sequencer) in &container.sequencers {
            tasks.push(tokio::spawn(xt_sequencer::forward_bus_events(
                container.sequencer_subscription(*chain),
                *chain,
                sequencer.inbox(),
            )));
        }

        let publisher = container.publisher.clone();
        let shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move { publisher.run(shutdown).await }));
        for sequencer in container.sequencers.values() {
            let sequencer = sequencer.clone();
            let shutdown = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move { sequencer.run(shutdown).await }));
        }

        Self {
            container,
            shutdown_tx,
            tasks,
        }
    }

    pub fn publisher(&self) -> &NodePublisher {
        &self.container.publisher
    }

    pub fn sequencer(&self, chain: ChainId) -> &NodeSequencer {
        &self.container.sequencers[&chain]
    }

    pub fn chains(&self) -> Vec<ChainId> {
        self.container.sequencers.keys().copied().collect()
    }

    /// Superblocks finalized by the simulated L1 so far.
    pub fn l1_finalized(&self) -> Vec<SuperblockRef> {
        self.container.l1.finalized()
    }

    /// Start the next period and wait until every sequencer follows. On a
    /// proof-window violation this waits for the rollback instead.
    pub async fn start_period(&self) -> PublisherResult<StartPeriod> {
        let result = self.publisher().start_period().await;
        let expected = self.publisher().state().read().status().period_id;
        eventually("sequencers to adopt the period", || {
            self.container.sequencers.values().all(|s| {
                s.state()
                    .read()
                    .status()
                    .period
                    .is_some_and(|tag| tag.period_id == expected)
            })
        })
        .await;
        result
    }

    /// Open the next block on every chain.
    pub async fn open_blocks(&self) {
        for (chain, sequencer) in &self.container.sequencers {
            let head = sequencer.status().await.head;
            sequencer
                .begin_block(head + 1)
                .await
                .unwrap_or_else(|e| panic!("chain {chain} could not open a block: {e}"));
        }
    }

    pub async fn seal(&self, chain: ChainId) -> BlockHeader {
        self.sequencer(chain)
            .seal_block()
            .await
            .unwrap_or_else(|e| panic!("chain {chain} could not seal: {e}"))
    }

    pub async fn seal_all(&self) -> Vec<BlockHeader> {
        let mut headers = Vec::new();
        for chain in self.chains() {
            headers.push(self.seal(chain).await);
        }
        headers
    }

    /// Transactions in the chain's sealed, unpruned blocks.
    pub fn sealed_transactions(&self, chain: ChainId) -> Vec<Transaction> {
        self.sequencer(chain)
            .state()
            .read()
            .blocks()
            .sealed()
            .iter()
            .flat_map(|block| block.transactions.clone())
            .collect()
    }

    pub fn decision(&self, id: &InstanceId) -> Option<bool> {
        self.publisher().state().read().decision_of(id)
    }

    /// Wait for the publisher's decision and for every participant to
    /// release its lock.
    pub async fn await_decision(&self, id: InstanceId) -> bool {
        eventually("publisher decision", || self.decision(&id).is_some()).await;
        eventually("sequencers to finish the instance", || {
            self.container
                .sequencers
                .values()
                .all(|s| s.state().read().active().map(|a| a.id) != Some(id))
        })
        .await;
        self.decision(&id).unwrap_or(false)
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        for task in &self.tasks {
            task.abort();
        }
    }
}
