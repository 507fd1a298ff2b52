//! Instance admission over disjoint chain sets
//!
//! A chain is locked from the moment its instance is admitted until the
//! instance is decided. Requests that overlap a locked chain wait in a FIFO
//! queue; they are only ever admitted whole.

use shared_types::{ChainId, XtRequest};
use std::collections::{BTreeSet, VecDeque};

#[derive(Debug, Default)]
pub struct InstanceScheduler {
    active_chains: BTreeSet<ChainId>,
    queue: VecDeque<XtRequest>,
}

impl InstanceScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_chains(&self) -> Vec<ChainId> {
        self.active_chains.iter().copied().collect()
    }

    pub fn is_active(&self, chain: ChainId) -> bool {
        self.active_chains.contains(&chain)
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Chains of `chains` that are currently locked.
    pub fn busy(&self, chains: &[ChainId]) -> Vec<ChainId> {
        chains
            .iter()
            .copied()
            .filter(|c| self.active_chains.contains(c))
            .collect()
    }

    pub fn lock(&mut self, chains: &[ChainId]) {
        self.active_chains.extend(chains.iter().copied());
    }

    pub fn release(&mut self, chains: &[ChainId]) {
        for chain in chains {
            self.active_chains.remove(chain);
        }
    }

    pub fn release_all(&mut self) {
        self.active_chains.clear();
    }

    pub fn enqueue(&mut self, request: XtRequest) {
        self.queue.push_back(request);
    }

    /// Remove and return, in queue order, every queued request whose chains
    /// are free and disjoint from those taken earlier in the same pass.
    /// Returned requests are not locked; the caller locks on admission.
    pub fn take_admissible(&mut self) -> Vec<XtRequest> {
        let mut taken = BTreeSet::new();
        let mut admitted = Vec::new();
        let mut waiting = VecDeque::with_capacity(self.queue.len());

        while let Some(request) = self.queue.pop_front() {
            let chains = request.chains();
            let free = chains
                .iter()
                .all(|c| !self.active_chains.contains(c) && !taken.contains(c));
            if free {
                taken.extend(chains);
                admitted.push(request);
            } else {
                waiting.push_back(request);
            }
        }
        self.queue = waiting;
        admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Transaction;

    fn request(chains: &[u64]) -> XtRequest {
        chains.iter().fold(XtRequest::new(), |req, c| {
            req.with_chain(ChainId(*c), vec![Transaction::user(vec![*c as u8])])
        })
    }

    #[test]
    fn test_busy_reports_overlap() {
        let mut scheduler = InstanceScheduler::new();
        scheduler.lock(&[ChainId(1), ChainId(2)]);
        assert_eq!(
            scheduler.busy(&[ChainId(2), ChainId(3)]),
            vec![ChainId(2)]
        );
        assert!(scheduler.busy(&[ChainId(3), ChainId(4)]).is_empty());

        scheduler.release(&[ChainId(2)]);
        assert!(!scheduler.is_active(ChainId(2)));
        assert!(scheduler.is_active(ChainId(1)));
    }

    #[test]
    fn test_take_admissible_in_order_without_overlap() {
        let mut scheduler = InstanceScheduler::new();
        scheduler.lock(&[ChainId(1)]);
        scheduler.enqueue(request(&[1, 2]));
        scheduler.enqueue(request(&[2, 3]));
        scheduler.enqueue(request(&[3, 4]));
        scheduler.enqueue(request(&[5, 6]));

        let admitted = scheduler.take_admissible();
        let chains: Vec<_> = admitted.iter().map(|r| r.chains()).collect();
        assert_eq!(
            chains,
            vec![vec![ChainId(2), ChainId(3)], vec![ChainId(5), ChainId(6)]]
        );
        assert_eq!(scheduler.queued(), 2);
    }
}
