//! # Sequencer Metrics
//!
//! Prometheus metrics, enabled with the `metrics` feature.
//!
//! - `sequencer_blocks_sealed_total`
//! - `sequencer_votes_total{vote}`
//! - `sequencer_mailbox_messages_total{disposition}`
//! - `sequencer_settlement_proofs_total`

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref BLOCKS_SEALED: IntCounter = register_int_counter!(
        "sequencer_blocks_sealed_total",
        "Total number of blocks sealed"
    )
    .expect("Failed to create BLOCKS_SEALED metric");

    pub static ref VOTES: IntCounterVec = register_int_counter_vec!(
        "sequencer_votes_total",
        "Votes cast, by value",
        &["vote"]
    )
    .expect("Failed to create VOTES metric");

    pub static ref MAILBOX_MESSAGES: IntCounterVec = register_int_counter_vec!(
        "sequencer_mailbox_messages_total",
        "Inbound mailbox messages, by disposition",
        &["disposition"]
    )
    .expect("Failed to create MAILBOX_MESSAGES metric");

    pub static ref SETTLEMENT_PROOFS: IntCounter = register_int_counter!(
        "sequencer_settlement_proofs_total",
        "Settlement proofs sent to the publisher"
    )
    .expect("Failed to create SETTLEMENT_PROOFS metric");
}

#[cfg(feature = "metrics")]
pub fn record_block_sealed() {
    BLOCKS_SEALED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_vote(vote: bool) {
    VOTES
        .with_label_values(&[if vote { "true" } else { "false" }])
        .inc();
}

#[cfg(feature = "metrics")]
pub fn record_mailbox(disposition: &str) {
    MAILBOX_MESSAGES.with_label_values(&[disposition]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_settlement_proof() {
    SETTLEMENT_PROOFS.inc();
}

#[cfg(not(feature = "metrics"))]
pub fn record_block_sealed() {}

#[cfg(not(feature = "metrics"))]
pub fn record_vote(_vote: bool) {}

#[cfg(not(feature = "metrics"))]
pub fn record_mailbox(_disposition: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_settlement_proof() {}
