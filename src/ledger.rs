use std::collections::VecDeque;
use std::sync::RwLock;

use crate::types::Payout;

/// Bounded, newest-first collection of payouts. The ingestion worker is the
/// only writer; route handlers read snapshots.
pub struct PayoutLedger {
    capacity: usize,
    inner: RwLock<VecDeque<Payout>>,
}

impl PayoutLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Insert a payout unless its tx hash is already present. Returns
    /// whether the payout was actually added. Evicts the oldest entry once
    /// the capacity is exceeded.
    pub fn insert(&self, payout: Payout) -> bool {
        let mut inner = self.inner.write().expect("ledger lock poisoned");

        if inner.iter().any(|p| p.tx_hash == payout.tx_hash) {
            return false;
        }

        inner.push_front(payout);
        while inner.len() > self.capacity {
            inner.pop_back();
        }
        true
    }

    /// Snapshot of all payouts, newest first.
    pub fn list_all(&self) -> Vec<Payout> {
        self.inner
            .read()
            .expect("ledger lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("ledger lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
