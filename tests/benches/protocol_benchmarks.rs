//! # Cross-Chain Protocol Benchmarks
//!
//! | Area | Operation | Target |
//! |------|-----------|--------|
//! | Publisher | admit + two votes + decide | < 50µs |
//! | Instance ids | derive over N transactions | linear in N |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use shared_types::{ChainId, InstanceId, Transaction, Vote, XtRequest};
use std::time::Duration;
use xt_publisher::{PublisherConfig, PublisherEvent, PublisherOutput, PublisherState};

fn two_chain_request(a: ChainId, b: ChainId, nonce: u64) -> XtRequest {
    XtRequest::new()
        .with_chain(a, vec![Transaction::user(nonce.to_be_bytes().to_vec())])
        .with_chain(b, vec![Transaction::user(nonce.to_le_bytes().to_vec())])
}

fn started_id(outputs: &[PublisherOutput]) -> Option<InstanceId> {
    outputs.iter().find_map(|o| match o {
        PublisherOutput::SendStartInstance { start, .. } => Some(start.instance_id),
        _ => None,
    })
}

// ============================================================================
// Publisher: full instance lifecycle on the state machine
// ============================================================================

fn bench_publisher_instance_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("publisher-instance-cycle");
    group.measurement_time(Duration::from_secs(5));

    for chains in [2u64, 8, 32] {
        let config = PublisherConfig {
            chains: (1..=chains).map(ChainId).collect(),
            ..PublisherConfig::default()
        };
        let mut state = PublisherState::new(config);
        let _ = state.start_period();
        let mut rng = rand::thread_rng();
        let mut nonce = 0u64;

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("admit_vote_decide", chains), &chains, |b, &n| {
            b.iter(|| {
                nonce += 1;
                let a = ChainId(rng.gen_range(1..=n));
                let other = ChainId(a.0 % n + 1);
                let (result, outputs) = state.submit_request(two_chain_request(a, other, nonce));
                let Some(id) = result.ok().and(started_id(&outputs)) else {
                    return;
                };
                for chain in [a, other] {
                    let _ = state.apply(PublisherEvent::Vote(Vote {
                        instance_id: id,
                        chain_id: chain,
                        vote: true,
                    }));
                }
                black_box(state.decision_of(&id))
            })
        });
    }
    group.finish();
}

// ============================================================================
// Instance identifiers
// ============================================================================

fn bench_instance_id_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("instance-id-derivation");

    for txs in [1usize, 16, 256] {
        let body: Vec<Transaction> = (0..txs)
            .map(|i| Transaction::user(vec![i as u8; 128]))
            .collect();
        let request = XtRequest::new()
            .with_chain(ChainId(1), body.clone())
            .with_chain(ChainId(2), body);

        group.throughput(Throughput::Elements(txs as u64 * 2));
        group.bench_with_input(BenchmarkId::new("derive", txs), &request, |b, req| {
            b.iter(|| black_box(InstanceId::derive(7, 42, req)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_publisher_instance_cycle,
    bench_instance_id_derivation,
);

criterion_main!(benches);
