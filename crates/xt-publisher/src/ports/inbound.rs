//! Driving ports (Inbound API)

use crate::error::PublisherResult;
use crate::state::PublisherStatus;
use async_trait::async_trait;
use shared_types::{InstanceId, StartPeriod, XtRequest};

/// Entry points for XT submission and the period ticker.
#[async_trait]
pub trait PublisherApi: Send + Sync {
    /// Admit `request` as a new instance.
    ///
    /// Fails with `InvalidRequest` for fewer than two chains. Fails with
    /// `CannotStartInstance` when a chain is busy; the request then stays
    /// queued and is retried after later decisions.
    async fn submit_request(&self, request: XtRequest) -> PublisherResult<InstanceId>;

    /// Advance to the next period. On a proof-window violation the rollback
    /// is broadcast before the error is returned.
    async fn start_period(&self) -> PublisherResult<StartPeriod>;

    async fn status(&self) -> PublisherStatus;
}
