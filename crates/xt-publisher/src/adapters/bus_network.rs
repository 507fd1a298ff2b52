//! Shared-bus adapter
//!
//! Implements `PublisherNetwork` on the in-process bus: broadcasts go out
//! once, point-to-point messages once per participant.

use crate::events::PublisherEvent;
use crate::ports::PublisherNetwork;
use async_trait::async_trait;
use shared_bus::{EventPublisher, InMemoryEventBus, ProtocolEvent, Subscription};
use shared_types::{ChainId, Decided, Rollback, StartInstance, StartPeriod};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

pub struct BusPublisherNetwork {
    bus: Arc<InMemoryEventBus>,
}

impl BusPublisherNetwork {
    pub fn new(bus: Arc<InMemoryEventBus>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl PublisherNetwork for BusPublisherNetwork {
    async fn broadcast_start_period(&self, start: StartPeriod) -> Result<(), String> {
        self.bus.publish(ProtocolEvent::StartPeriod(start)).await;
        Ok(())
    }

    async fn broadcast_rollback(&self, rollback: Rollback) -> Result<(), String> {
        self.bus.publish(ProtocolEvent::Rollback(rollback)).await;
        Ok(())
    }

    async fn send_start_instance(
        &self,
        start: &StartInstance,
        participants: &[ChainId],
    ) -> Result<(), String> {
        for chain in participants {
            self.bus
                .publish(ProtocolEvent::StartInstance {
                    to: *chain,
                    payload: start.clone(),
                })
                .await;
        }
        Ok(())
    }

    async fn send_decided(
        &self,
        decided: Decided,
        participants: &[ChainId],
    ) -> Result<(), String> {
        for chain in participants {
            self.bus
                .publish(ProtocolEvent::Decided {
                    to: *chain,
                    payload: decided,
                })
                .await;
        }
        Ok(())
    }
}

/// Pump Publisher-bound bus events into the Publisher inbox until either
/// side closes.
pub async fn forward_bus_events(
    mut subscription: Subscription,
    inbox: mpsc::UnboundedSender<PublisherEvent>,
) {
    while let Some(event) = subscription.recv().await {
        let Some(event) = PublisherEvent::from_bus(event) else {
            continue;
        };
        if inbox.send(event).is_err() {
            break;
        }
    }
    debug!("Publisher bus forwarder stopped");
}
