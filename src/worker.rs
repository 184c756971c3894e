//! Ingestion engine: one-time historical backfill, then a recurring poll
//! over the block range since the last checked block. At-least-once
//! delivery; the ledger's tx-hash dedup makes re-processing safe.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::IngestError;
use crate::eth::client::ChainSource;
use crate::eth::decimals::DecimalSource;
use crate::ledger::PayoutLedger;
use crate::normalize::normalize;
use crate::offramp::OfframpClient;

pub struct IngestWorker<C, D> {
    chain: C,
    decimals: D,
    ledger: Arc<PayoutLedger>,
    offramp: Option<OfframpClient>,
    poll_interval: Duration,
    lookback_blocks: u64,
    last_checked_block: u64,
    stats: IngestStats,
}

/// Running totals, logged per tick and inspected by tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStats {
    pub ticks: u64,
    pub ingested: u64,
    pub skipped: u64,
}

impl<C: ChainSource, D: DecimalSource> IngestWorker<C, D> {
    pub fn new(
        chain: C,
        decimals: D,
        ledger: Arc<PayoutLedger>,
        offramp: Option<OfframpClient>,
        poll_interval: Duration,
        lookback_blocks: u64,
    ) -> Self {
        Self {
            chain,
            decimals,
            ledger,
            offramp,
            poll_interval,
            lookback_blocks,
            last_checked_block: 0,
            stats: IngestStats::default(),
        }
    }

    pub async fn run(mut self) {
        self.backfill().await;

        loop {
            tokio::time::sleep(self.poll_interval).await;

            if let Err(e) = self.tick().await {
                warn!(
                    error = %e,
                    last_checked_block = self.last_checked_block,
                    "poll tick failed, range will be retried"
                );
            }
        }
    }

    /// One-time historical scan over the lookback window. Provider errors
    /// here are logged, not fatal: polling starts from the observed head
    /// either way, and a failed backfill is not retried.
    async fn backfill(&mut self) {
        let latest = loop {
            match self.chain.latest_block_number().await {
                Ok(n) => break n,
                Err(e) => {
                    warn!(error = %e, "could not fetch chain head, retrying");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        };

        let from = latest.saturating_sub(self.lookback_blocks);
        info!(from, to = latest, "backfilling RentPaid events");

        match self.process_range(from, latest).await {
            Ok(inserted) => info!(inserted, "backfill complete"),
            Err(e) => warn!(error = %e, "backfill failed, continuing with live polling"),
        }

        self.last_checked_block = latest;
    }

    /// One poll cycle. The watermark only advances after the whole range
    /// has been processed; any provider failure leaves it untouched so the
    /// same range is retried on the next tick.
    async fn tick(&mut self) -> Result<(), IngestError> {
        self.stats.ticks += 1;

        let latest = self.chain.latest_block_number().await?;
        if latest <= self.last_checked_block {
            return Ok(());
        }

        let inserted = self
            .process_range(self.last_checked_block + 1, latest)
            .await?;
        if inserted > 0 {
            info!(
                inserted,
                from = self.last_checked_block + 1,
                to = latest,
                "ingested new rent payouts"
            );
        }

        self.last_checked_block = latest;
        Ok(())
    }

    /// Query one block range and push every event through decimals →
    /// normalize → ledger. A failure on a single event skips that event
    /// only; a failure of the range query aborts the whole range.
    async fn process_range(&mut self, from: u64, to: u64) -> Result<usize, IngestError> {
        let events = self.chain.rent_paid_in_range(from, to).await?;

        let mut inserted = 0;
        for raw in &events {
            let decimals = match self.decimals.decimals(raw.stablecoin).await {
                Ok(d) => d,
                Err(e) => {
                    self.stats.skipped += 1;
                    warn!(
                        tenant = ?raw.tenant,
                        tx = ?raw.tx_hash,
                        token = ?raw.stablecoin,
                        error = %e,
                        "skipping event, decimals lookup failed"
                    );
                    continue;
                }
            };

            let payout = match normalize(raw, decimals) {
                Ok(p) => p,
                Err(e) => {
                    self.stats.skipped += 1;
                    warn!(tx = ?raw.tx_hash, error = %e, "skipping malformed event");
                    continue;
                }
            };

            if self.ledger.insert(payout.clone()) {
                inserted += 1;
                self.stats.ingested += 1;

                if let Some(offramp) = &self.offramp {
                    if let Err(e) = offramp.create_order(&payout).await {
                        warn!(tx = %payout.tx_hash, error = %e, "off-ramp order failed");
                    }
                }
            }
        }

        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawRentPaid;
    use async_trait::async_trait;
    use ethers::types::{Address, TxHash, U256};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeChain {
        latest: Mutex<u64>,
        events: Mutex<Vec<RawRentPaid>>,
        queried_ranges: Mutex<Vec<(u64, u64)>>,
        fail_latest: Mutex<bool>,
        fail_range: Mutex<bool>,
    }

    impl FakeChain {
        fn set_latest(&self, n: u64) {
            *self.latest.lock().unwrap() = n;
        }

        fn add_event(&self, raw: RawRentPaid) {
            self.events.lock().unwrap().push(raw);
        }

        fn fail_next_range(&self, fail: bool) {
            *self.fail_range.lock().unwrap() = fail;
        }

        fn fail_latest(&self, fail: bool) {
            *self.fail_latest.lock().unwrap() = fail;
        }

        fn ranges(&self) -> Vec<(u64, u64)> {
            self.queried_ranges.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChainSource for Arc<FakeChain> {
        async fn latest_block_number(&self) -> Result<u64, IngestError> {
            if *self.fail_latest.lock().unwrap() {
                return Err(IngestError::Provider("head unavailable".to_string()));
            }
            Ok(*self.latest.lock().unwrap())
        }

        async fn rent_paid_in_range(
            &self,
            from: u64,
            to: u64,
        ) -> Result<Vec<RawRentPaid>, IngestError> {
            self.queried_ranges.lock().unwrap().push((from, to));
            if *self.fail_range.lock().unwrap() {
                return Err(IngestError::Provider("range rejected".to_string()));
            }
            if from > to {
                return Ok(Vec::new());
            }
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.block_number >= from && e.block_number <= to)
                .cloned()
                .collect())
        }
    }

    struct FakeDecimals {
        fail_for: Option<Address>,
    }

    #[async_trait]
    impl DecimalSource for FakeDecimals {
        async fn decimals(&self, token: Address) -> Result<u8, IngestError> {
            if self.fail_for == Some(token) {
                return Err(IngestError::TokenQuery {
                    token: format!("{token:?}"),
                    reason: "no decimals()".to_string(),
                });
            }
            Ok(6)
        }
    }

    fn usdt() -> Address {
        Address::from_low_u64_be(0x11)
    }

    fn bad_token() -> Address {
        Address::from_low_u64_be(0x66)
    }

    fn raw(block: u64, tx: u64, token: Address) -> RawRentPaid {
        RawRentPaid {
            tenant: Address::from_low_u64_be(0xa1),
            amount: U256::from(1_500_000u64),
            stablecoin: token,
            landlord_upi: "landlord@upi".to_string(),
            landlord_bank_details: String::new(),
            tx_hash: TxHash::from_low_u64_be(tx),
            block_number: block,
        }
    }

    fn worker(chain: Arc<FakeChain>) -> IngestWorker<Arc<FakeChain>, FakeDecimals> {
        worker_with_bad_token(chain, None)
    }

    fn worker_with_bad_token(
        chain: Arc<FakeChain>,
        fail_for: Option<Address>,
    ) -> IngestWorker<Arc<FakeChain>, FakeDecimals> {
        IngestWorker::new(
            chain,
            FakeDecimals { fail_for },
            Arc::new(PayoutLedger::new(100)),
            None,
            Duration::from_millis(1),
            100,
        )
    }

    #[tokio::test]
    async fn cold_start_backfill_covers_lookback_window() {
        let chain = Arc::new(FakeChain::default());
        chain.set_latest(1000);
        chain.add_event(raw(910, 1, usdt()));
        chain.add_event(raw(950, 2, usdt()));
        chain.add_event(raw(1000, 3, usdt()));
        // Outside the window, must not be picked up.
        chain.add_event(raw(899, 4, usdt()));

        let mut w = worker(chain.clone());
        w.backfill().await;

        assert_eq!(chain.ranges(), vec![(900, 1000)]);
        assert_eq!(w.ledger.len(), 3);
        assert_eq!(w.last_checked_block, 1000);
    }

    #[tokio::test]
    async fn empty_tick_makes_no_event_query() {
        let chain = Arc::new(FakeChain::default());
        chain.set_latest(1000);

        let mut w = worker(chain.clone());
        w.last_checked_block = 1000;

        w.tick().await.unwrap();

        assert!(chain.ranges().is_empty());
        assert!(w.ledger.is_empty());
        assert_eq!(w.last_checked_block, 1000);
    }

    #[tokio::test]
    async fn tick_ingests_only_the_new_range() {
        let chain = Arc::new(FakeChain::default());
        chain.set_latest(1010);
        chain.add_event(raw(1005, 7, usdt()));

        let mut w = worker(chain.clone());
        w.last_checked_block = 1000;

        w.tick().await.unwrap();

        assert_eq!(chain.ranges(), vec![(1001, 1010)]);
        assert_eq!(w.ledger.len(), 1);
        assert_eq!(w.last_checked_block, 1010);
    }

    #[tokio::test]
    async fn provider_error_leaves_watermark_and_range_is_retried() {
        let chain = Arc::new(FakeChain::default());
        chain.set_latest(1010);
        chain.add_event(raw(1005, 7, usdt()));
        chain.fail_next_range(true);

        let mut w = worker(chain.clone());
        w.last_checked_block = 1000;

        assert!(w.tick().await.is_err());
        assert_eq!(w.last_checked_block, 1000);
        assert!(w.ledger.is_empty());

        chain.fail_next_range(false);
        w.tick().await.unwrap();

        // Same range, queried verbatim: no gap, no overlap.
        assert_eq!(chain.ranges(), vec![(1001, 1010), (1001, 1010)]);
        assert_eq!(w.ledger.len(), 1);
        assert_eq!(w.last_checked_block, 1010);
    }

    #[tokio::test]
    async fn head_failure_leaves_watermark() {
        let chain = Arc::new(FakeChain::default());
        chain.set_latest(1010);
        chain.fail_latest(true);

        let mut w = worker(chain.clone());
        w.last_checked_block = 1000;

        assert!(w.tick().await.is_err());
        assert_eq!(w.last_checked_block, 1000);
        assert!(chain.ranges().is_empty());
    }

    #[tokio::test]
    async fn consecutive_ticks_cover_contiguous_ranges() {
        let chain = Arc::new(FakeChain::default());
        let mut w = worker(chain.clone());
        w.last_checked_block = 1000;

        for head in [1005, 1005, 1012, 1020] {
            chain.set_latest(head);
            w.tick().await.unwrap();
        }

        // The second tick at head 1005 is a no-op; the union of queried
        // ranges covers (1001..=1020) exactly.
        assert_eq!(chain.ranges(), vec![(1001, 1005), (1006, 1012), (1013, 1020)]);
        assert_eq!(w.last_checked_block, 1020);
    }

    #[tokio::test]
    async fn stale_head_is_a_noop() {
        let chain = Arc::new(FakeChain::default());
        // Head moves backwards, e.g. a lagging provider after a reorg.
        chain.set_latest(990);

        let mut w = worker(chain.clone());
        w.last_checked_block = 1000;

        w.tick().await.unwrap();

        assert!(chain.ranges().is_empty());
        assert_eq!(w.last_checked_block, 1000);
    }

    #[tokio::test]
    async fn duplicate_events_in_one_range_ingested_once() {
        let chain = Arc::new(FakeChain::default());
        chain.set_latest(1010);
        chain.add_event(raw(1005, 7, usdt()));
        chain.add_event(raw(1006, 7, usdt()));

        let mut w = worker(chain.clone());
        w.last_checked_block = 1000;

        w.tick().await.unwrap();

        assert_eq!(w.ledger.len(), 1);
        assert_eq!(w.stats.ingested, 1);
    }

    #[tokio::test]
    async fn decimals_failure_skips_event_but_advances_watermark() {
        let chain = Arc::new(FakeChain::default());
        chain.set_latest(1010);
        chain.add_event(raw(1005, 7, usdt()));
        chain.add_event(raw(1006, 8, bad_token()));

        let mut w = worker_with_bad_token(chain.clone(), Some(bad_token()));
        w.last_checked_block = 1000;

        w.tick().await.unwrap();

        assert_eq!(w.ledger.len(), 1);
        assert_eq!(w.last_checked_block, 1010);
        assert_eq!(w.stats.skipped, 1);
        assert_eq!(w.stats.ingested, 1);
    }

    #[tokio::test]
    async fn backfill_range_failure_still_enters_polling() {
        let chain = Arc::new(FakeChain::default());
        chain.set_latest(1000);
        chain.add_event(raw(950, 2, usdt()));
        chain.fail_next_range(true);

        let mut w = worker(chain.clone());
        w.backfill().await;

        // Backfill is best-effort: the window is lost but polling starts
        // from the observed head.
        assert!(w.ledger.is_empty());
        assert_eq!(w.last_checked_block, 1000);

        chain.fail_next_range(false);
        chain.set_latest(1010);
        w.tick().await.unwrap();
        assert_eq!(chain.ranges(), vec![(900, 1000), (1001, 1010)]);
    }
}
