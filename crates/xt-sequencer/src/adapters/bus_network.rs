//! Shared-bus adapter
//!
//! Implements `SequencerNetwork` by publishing onto the in-process bus, and
//! forwards bus events addressed to this chain into the sequencer inbox.

use crate::events::SequencerEvent;
use crate::ports::SequencerNetwork;
use async_trait::async_trait;
use shared_bus::{EventPublisher, InMemoryEventBus, ProtocolEvent, Subscription};
use shared_types::{ChainId, MailboxEnvelope, Proof, Vote};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

pub struct BusSequencerNetwork {
    bus: Arc<InMemoryEventBus>,
    chain_id: ChainId,
}

impl BusSequencerNetwork {
    pub fn new(bus: Arc<InMemoryEventBus>, chain_id: ChainId) -> Self {
        Self { bus, chain_id }
    }
}

#[async_trait]
impl SequencerNetwork for BusSequencerNetwork {
    async fn send_vote(&self, vote: Vote) -> Result<(), String> {
        self.bus.publish(ProtocolEvent::Vote(vote)).await;
        Ok(())
    }

    async fn send_mailbox_message(
        &self,
        destination: ChainId,
        envelope: MailboxEnvelope,
    ) -> Result<(), String> {
        if destination == self.chain_id {
            return Err(format!("mailbox message addressed to own chain {destination}"));
        }
        self.bus
            .publish(ProtocolEvent::Mailbox {
                to: destination,
                payload: envelope,
            })
            .await;
        Ok(())
    }

    async fn send_proof(&self, proof: Proof) -> Result<(), String> {
        self.bus
            .publish(ProtocolEvent::Proof {
                from: self.chain_id,
                payload: proof,
            })
            .await;
        Ok(())
    }
}

/// Pump events for `chain` from a bus subscription into a sequencer inbox
/// until either side closes.
pub async fn forward_bus_events(
    mut subscription: Subscription,
    chain: ChainId,
    inbox: mpsc::UnboundedSender<SequencerEvent>,
) {
    while let Some(event) = subscription.recv().await {
        let Some(event) = SequencerEvent::from_bus(event, chain) else {
            continue;
        };
        if inbox.send(event).is_err() {
            break;
        }
    }
    debug!(chain = %chain, "Bus forwarder stopped");
}
