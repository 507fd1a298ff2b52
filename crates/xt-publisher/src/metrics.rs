//! # Publisher Metrics
//!
//! Enable with the `metrics` feature.
//!
//! ## Metrics Exported
//!
//! - `publisher_instances_started_total` - Counter of admitted instances
//! - `publisher_decisions_total` - Decisions, by outcome
//! - `publisher_rollbacks_total` - Rollbacks, by cause
//! - `publisher_superblock_proofs_requested_total` - Aggregate proof requests

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Total instances admitted
    pub static ref INSTANCES_STARTED: IntCounter = register_int_counter!(
        "publisher_instances_started_total",
        "Total number of instances admitted"
    )
    .expect("Failed to create INSTANCES_STARTED metric");

    /// Decisions, labeled by outcome
    pub static ref DECISIONS: IntCounterVec = register_int_counter_vec!(
        "publisher_decisions_total",
        "Total number of instance decisions",
        &["outcome"]
    )
    .expect("Failed to create DECISIONS metric");

    /// Rollbacks, labeled by cause
    pub static ref ROLLBACKS: IntCounterVec = register_int_counter_vec!(
        "publisher_rollbacks_total",
        "Total number of rollbacks broadcast",
        &["cause"]
    )
    .expect("Failed to create ROLLBACKS metric");

    /// Aggregate proof requests
    pub static ref PROOFS_REQUESTED: IntCounter = register_int_counter!(
        "publisher_superblock_proofs_requested_total",
        "Total number of superblock proofs requested"
    )
    .expect("Failed to create PROOFS_REQUESTED metric");
}

#[cfg(feature = "metrics")]
pub fn record_instance_started() {
    INSTANCES_STARTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_decision(accepted: bool) {
    DECISIONS
        .with_label_values(&[if accepted { "accepted" } else { "rejected" }])
        .inc();
}

#[cfg(feature = "metrics")]
pub fn record_rollback(cause: &str) {
    ROLLBACKS.with_label_values(&[cause]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_proof_requested() {
    PROOFS_REQUESTED.inc();
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_instance_started() {}

#[cfg(not(feature = "metrics"))]
pub fn record_decision(_accepted: bool) {}

#[cfg(not(feature = "metrics"))]
pub fn record_rollback(_cause: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_proof_requested() {}
