//! # Cross-Chain Node Runtime
//!
//! Runs the publisher and every chain's sequencer in one process.
//!
//! ## Event Flow
//!
//! ```text
//!            StartPeriod / Rollback / StartInstance / Decided
//!   Publisher ─────────────────────────────────────────────→ Sequencers
//!       ↑                                                        │
//!       │            Vote / SettlementProof                      │
//!       └────────────────────────────────────────────────────────┘
//!                                                  Mailbox (peer to peer)
//!   Publisher ──superblock proof──→ Simulated L1 ──finalized──→ all
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file in `XT_CONFIG`, then env overrides)
//! 2. Build the actors
//! 3. Subscribe every actor to the bus before anything is published
//! 4. Spawn actor loops, then the ticker, block producers and workload

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use node_runtime::container::{NodeConfig, NodeContainer};
use node_runtime::wiring::{run_block_producer, run_period_ticker, run_workload, Workload};
use xt_publisher::{PeriodClock, SystemTimeSource};

/// The node runtime owning every actor task.
pub struct NodeRuntime {
    container: Arc<NodeContainer>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl NodeRuntime {
    pub fn new(config: NodeConfig) -> Result<Self> {
        let container = NodeContainer::new(config).context("Failed to build node container")?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            container: Arc::new(container),
            shutdown_tx,
            shutdown_rx,
            tasks: parking_lot::Mutex::new(Vec::new()),
        })
    }

    pub fn start(&self) {
        let container = &self.container;
        let config = &container.config;
        let mut tasks = self.tasks.lock();

        // Subscriptions first so the first StartPeriod reaches everyone.
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
        let shutdown = self.shutdown_rx.clone();
        tasks.push(tokio::spawn(async move { publisher.run(shutdown).await }));
        for sequencer in container.sequencers.values() {
            let sequencer = sequencer.clone();
            let shutdown = self.shutdown_rx.clone();
            tasks.push(tokio::spawn(async move { sequencer.run(shutdown).await }));
        }

        let clock = PeriodClock::new(
            config.publisher.genesis_time,
            config.publisher.period_duration_secs,
        );
        tasks.push(tokio::spawn(run_period_ticker(
            container.publisher.clone(),
            clock,
            SystemTimeSource,
            self.shutdown_rx.clone(),
        )));

        for (chain, sequencer) in &container.sequencers {
            tasks.push(tokio::spawn(run_block_producer(
                sequencer.clone(),
                *chain,
                config.block_interval(),
                self.shutdown_rx.clone(),
            )));
        }

        if let Some(interval) = config.workload_interval() {
            tasks.push(tokio::spawn(run_workload(
                container.publisher.clone(),
                Workload::new(config.chains.clone()),
                interval,
                self.shutdown_rx.clone(),
            )));
        }

        info!(
            chains = ?config.chains,
            period_secs = config.publisher.period_duration_secs,
            proof_window = config.publisher.proof_window,
            tasks = tasks.len(),
            "Node running"
        );
    }

    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        // Give the loops a moment to log their exit.
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Bus forwarders only stop when aborted.
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in &tasks {
            task.abort();
        }
        info!(
            finalized = self.container.l1.finalized().len(),
            "Shutdown complete"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::load().context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let runtime = NodeRuntime::new(config)?;
    runtime.start();

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
