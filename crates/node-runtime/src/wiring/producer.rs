//! Block producer: keeps one block open per chain and seals it on every
//! tick, unless an instance holds it open.

use std::sync::Arc;
use std::time::Duration;

use shared_types::{BlockHeader, ChainId, Transaction};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use xt_sequencer::{SequencerApi, SequencerError, SequencerResult};

pub async fn run_block_producer<S>(
    sequencer: Arc<S>,
    chain: ChainId,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    S: SequencerApi + ?Sized,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut nonce = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        match produce_once(sequencer.as_ref(), &mut nonce).await {
            Ok(Some(header)) => debug!(
                chain = %chain,
                block = header.number,
                period = header.period_id,
                hash = %hex::encode(&header.hash[..6]),
                "Block produced"
            ),
            Ok(None) => {}
            Err(e) => warn!(chain = %chain, error = %e, "Block production step failed"),
        }
    }
    info!(chain = %chain, "Block producer stopped");
}

/// Seal the open block (if any) and open the next one with a local
/// transaction. Returns the sealed header.
pub async fn produce_once<S>(sequencer: &S, nonce: &mut u64) -> SequencerResult<Option<BlockHeader>>
where
    S: SequencerApi + ?Sized,
{
    let status = sequencer.status().await;
    if status.period.is_none() {
        return Ok(None);
    }

    let mut sealed = None;
    if status.open_block.is_some() {
        match sequencer.seal_block().await {
            Ok(header) => sealed = Some(header),
            Err(SequencerError::InstanceActive) => {
                debug!(chain = %status.chain_id, "Seal postponed, instance active");
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
    }

    let head = sequencer.status().await.head;
    sequencer.begin_block(head + 1).await?;
    *nonce += 1;
    sequencer
        .add_local_tx(Transaction::user(nonce.to_be_bytes().to_vec()))
        .await?;
    Ok(sealed)
}
