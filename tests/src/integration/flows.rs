//! # End-to-End Protocol Flows
//!
//! ```text
//! submit ──→ Publisher ──StartInstance──→ Sequencer A ──Mailbox──→ Sequencer B
//!                ↑                             │                       │
//!                └──────────── Vote ───────────┴───────────────────────┘
//!                │
//!                └──Decided──→ participants ──seal──→ settlement ──→ L1
//! ```
//!
//! ## Test Categories
//!
//! 1. **Decisions**: accepted mailbox exchange, failed simulation, timeout
//! 2. **Scheduling**: conflicting requests queue behind the active instance
//! 3. **Settlement**: a period settles into a finalized superblock
//! 4. **Rollback**: proof-window violation discards unfinalized blocks

#[cfg(test)]
mod tests {
    use crate::integration::{test_config, Network};
    use node_runtime::adapters::DevOp;
    use shared_types::{ChainId, XtRequest};
    use xt_publisher::{PublisherApi, PublisherError};
    use xt_sequencer::{BlockTag, SequencerApi};

    const A: ChainId = ChainId(1);
    const B: ChainId = ChainId(2);
    const C: ChainId = ChainId(3);

    fn send(session_id: u64, to: ChainId, payload: &[u8]) -> DevOp {
        DevOp::Send {
            session_id,
            to,
            label: "transfer".into(),
            payload: payload.to_vec(),
        }
    }

    fn receive(session_id: u64, from: ChainId) -> DevOp {
        DevOp::Receive {
            session_id,
            from,
            label: "transfer".into(),
        }
    }

    fn request(ops: Vec<(ChainId, DevOp)>) -> XtRequest {
        ops.into_iter().fold(XtRequest::new(), |req, (chain, op)| {
            req.with_chain(chain, vec![op.into_transaction()])
        })
    }

    /// Network in period 1 with a block open on every chain.
    async fn ready_network() -> Network {
        let net = Network::start(test_config());
        let start = net.start_period().await.unwrap();
        assert_eq!((start.period_id, start.target_superblock), (1, 1));
        net.open_blocks().await;
        net
    }

    // =========================================================================
    // DECISIONS
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_mailbox_exchange_is_accepted_and_included() {
        let net = ready_network().await;

        let send_tx = send(1, B, b"100 tokens").into_transaction();
        let receive_tx = receive(1, A).into_transaction();
        let id = net
            .publisher()
            .submit_request(
                XtRequest::new()
                    .with_chain(A, vec![send_tx.clone()])
                    .with_chain(B, vec![receive_tx.clone()]),
            )
            .await
            .unwrap();

        assert!(net.await_decision(id).await);
        net.seal_all().await;

        assert_eq!(net.sealed_transactions(A), vec![send_tx]);

        let included = net.sealed_transactions(B);
        assert_eq!(included.last(), Some(&receive_tx));
        let relayed: Vec<_> = included
            .iter()
            .filter_map(|tx| tx.relayed_message().unwrap())
            .collect();
        assert_eq!(relayed.len(), 1);
        assert_eq!(relayed[0].payload, b"100 tokens".to_vec());
        assert_eq!(relayed[0].header.source_chain, A);

        assert!(net.sealed_transactions(C).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_simulation_rejects_on_every_chain() {
        let net = ready_network().await;

        let id = net
            .publisher()
            .submit_request(request(vec![
                (A, send(1, B, b"x")),
                (
                    B,
                    DevOp::Fail {
                        reason: "insufficient balance".into(),
                    },
                ),
            ]))
            .await
            .unwrap();

        assert!(!net.await_decision(id).await);
        net.seal_all().await;
        assert!(net.sealed_transactions(A).is_empty());
        assert!(net.sealed_transactions(B).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_read_times_out_and_rejects() {
        let net = ready_network().await;

        // A never writes the message B waits for.
        let id = net
            .publisher()
            .submit_request(request(vec![(A, DevOp::Noop), (B, receive(9, A))]))
            .await
            .unwrap();

        assert!(!net.await_decision(id).await);
        net.seal_all().await;
        assert!(net.sealed_transactions(A).is_empty());
        assert!(net.sealed_transactions(B).is_empty());
        assert!(net.publisher().status().await.active_chains.is_empty());
    }

    // =========================================================================
    // SCHEDULING
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_conflicting_request_waits_for_decision() {
        let net = ready_network().await;

        let first = net
            .publisher()
            .submit_request(request(vec![(A, send(1, B, b"x")), (B, receive(1, A))]))
            .await
            .unwrap();

        let err = net
            .publisher()
            .submit_request(request(vec![(B, DevOp::Noop), (C, DevOp::Noop)]))
            .await
            .unwrap_err();
        assert!(matches!(err, PublisherError::CannotStartInstance { ref busy } if busy == &vec![B]));
        assert_eq!(net.publisher().status().await.queued_requests, 1);

        assert!(net.await_decision(first).await);

        crate::integration::eventually("queued request to be decided", || {
            let status = net.publisher().state().read().status();
            status.queued_requests == 0 && status.pending_instances == 0 && status.last_sequence == 2
        })
        .await;

        net.seal_all().await;
        // B holds the first instance's two transactions plus the second's.
        assert_eq!(net.sealed_transactions(B).len(), 3);
        assert_eq!(net.sealed_transactions(C).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_chain_request_is_refused() {
        let net = ready_network().await;
        let err = net
            .publisher()
            .submit_request(request(vec![(A, DevOp::Noop)]))
            .await
            .unwrap_err();
        assert!(matches!(err, PublisherError::InvalidRequest { chains: 1 }));
        assert_eq!(net.publisher().status().await.last_sequence, 0);
    }

    // =========================================================================
    // SETTLEMENT
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_period_settles_into_finalized_superblock() {
        let net = ready_network().await;
        net.seal_all().await;

        let start = net.start_period().await.unwrap();
        assert_eq!((start.period_id, start.target_superblock), (2, 2));

        crate::integration::eventually("superblock 1 finalization", || {
            net.publisher().state().read().status().last_finalized.number == 1
                && net
                    .chains()
                    .iter()
                    .all(|c| net.sequencer(*c).state().read().status().finalized.number == 1)
        })
        .await;

        let finalized = net.l1_finalized();
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].number, 1);
        assert_eq!(
            net.publisher().status().await.last_finalized,
            finalized[0]
        );
    }

    // =========================================================================
    // ROLLBACK
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_proof_window_rollback_discards_unfinalized_blocks() {
        let mut config = test_config();
        config.publisher.proof_window = 1;
        let net = Network::start(config);

        net.start_period().await.unwrap();
        net.open_blocks().await;
        // C keeps its block open, so superblock 1 never gets all proofs.
        net.seal(A).await;
        net.seal(B).await;

        net.start_period().await.unwrap();
        let err = net.start_period().await.unwrap_err();
        assert!(matches!(
            err,
            PublisherError::ProofWindowExceeded {
                new_target: 3,
                limit: 2
            }
        ));

        for chain in net.chains() {
            let status = net.sequencer(chain).status().await;
            assert_eq!(
                status.period,
                Some(BlockTag {
                    period_id: 3,
                    target_superblock: 1
                })
            );
            assert_eq!(status.head, 0);
            assert!(status.open_block.is_none());
            assert!(net.sealed_transactions(chain).is_empty());
        }

        // Progress resumes from the last finalized superblock.
        let start = net.start_period().await.unwrap();
        assert_eq!((start.period_id, start.target_superblock), (4, 2));
    }
}
