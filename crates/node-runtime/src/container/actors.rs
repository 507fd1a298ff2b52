//! # Actor Container
//!
//! Builds the Publisher and one Sequencer per configured chain, all attached
//! to one in-memory bus.
//!
//! ```text
//!                ┌──────────────────────────────┐
//!                │      InMemoryEventBus        │
//!                └──────────────────────────────┘
//!                 ▲  │           ▲  │          ▲  │
//!                 │  ▼           │  ▼          │  ▼
//!            Publisher      Sequencer(1) … Sequencer(N)      SimulatedL1 ──▶ bus
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use shared_bus::{EventFilter, InMemoryEventBus, Subscription};
use shared_types::ChainId;
use thiserror::Error;
use tracing::{info, instrument};
use xt_publisher::{
    BusPublisherNetwork, PublisherDependencies, PublisherError, PublisherService,
};
use xt_sequencer::{
    BusSequencerNetwork, SequencerDependencies, SequencerError, SequencerService,
};

use crate::adapters::{DevExecutionEngine, DevProver, SimulatedL1};
use crate::container::config::{ConfigError, NodeConfig};

/// Publisher with the development collaborators.
pub type NodePublisher = PublisherService<BusPublisherNetwork, DevProver, SimulatedL1>;

/// Sequencer with the development collaborators.
pub type NodeSequencer = SequencerService<DevExecutionEngine, BusSequencerNetwork, DevProver>;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("publisher: {0}")]
    Publisher(#[from] PublisherError),

    #[error("sequencer: {0}")]
    Sequencer(#[from] SequencerError),
}

/// All actors of one node.
pub struct NodeContainer {
    pub bus: Arc<InMemoryEventBus>,
    pub publisher: Arc<NodePublisher>,
    pub sequencers: BTreeMap<ChainId, Arc<NodeSequencer>>,
    pub l1: Arc<SimulatedL1>,
    /// Immutable after initialization.
    pub config: NodeConfig,
}

impl NodeContainer {
    #[instrument(name = "container_init", skip(config))]
    pub fn new(config: NodeConfig) -> Result<Self, ContainerError> {
        config.validate()?;
        info!(chains = ?config.chains, "Initializing actors");

        let bus = Arc::new(InMemoryEventBus::new());
        let prover = Arc::new(DevProver::default());
        let l1 = Arc::new(SimulatedL1::new(bus.clone(), config.l1_finality_delay()));

        let publisher = Arc::new(PublisherService::new(PublisherDependencies {
            network: Arc::new(BusPublisherNetwork::new(bus.clone())),
            prover: prover.clone(),
            settlement: l1.clone(),
            config: config.publisher_config(),
        })?);

        let mut sequencers = BTreeMap::new();
        for chain in &config.chains {
            let sequencer = SequencerService::new(SequencerDependencies {
                engine: Arc::new(DevExecutionEngine::new(*chain)),
                network: Arc::new(BusSequencerNetwork::new(bus.clone(), *chain)),
                prover: prover.clone(),
                config: config.sequencer_config(*chain),
            })?;
            sequencers.insert(*chain, Arc::new(sequencer));
            info!(chain = %chain, "Sequencer initialized");
        }

        Ok(Self {
            bus,
            publisher,
            sequencers,
            l1,
            config,
        })
    }

    pub fn publisher_subscription(&self) -> Subscription {
        self.bus.subscribe(EventFilter::for_publisher())
    }

    pub fn sequencer_subscription(&self, chain: ChainId) -> Subscription {
        self.bus.subscribe(EventFilter::for_sequencer(chain))
    }
}
