//! # Shared Bus - Event Bus for Protocol Messages
//!
//! Carries SBCP and SCP messages between the Publisher, the Sequencers and
//! the settlement layer inside one process.
//!
//! ```text
//! ┌──────────────┐   StartPeriod / Rollback / StartInstance / Decided   ┌──────────────┐
//! │  Publisher   │ ───────────────────────────────────────────────────▶ │  Sequencer   │
//! │              │ ◀─────────────────────────────────────────────────── │  (per chain) │
//! └──────────────┘               Vote / Proof                            └──────────────┘
//!                                                                        │  ▲
//!                                                               Mailbox  ▼  │
//!                                                                  other sequencers
//! ```
//!
//! Delivery is best-effort. Lagging subscribers drop events and the
//! protocol's timeouts recover.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{Endpoint, EventFilter, EventTopic, ProtocolEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
