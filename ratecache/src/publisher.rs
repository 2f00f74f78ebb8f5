use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use common::config::RateConfig;
use common::logger::{TraceId, root_span, warn_if_slow};
use common::time::Clock;
use tracing::Instrument;
use upstream::{TradingPair, UpstreamClient};

use crate::cache::RateCache;

/// Drives periodic refresh of the [`RateCache`] from the upstream source
/// (spec §4.2). One publisher per chain; it owns no public handle to its
/// background task beyond the `running` flag, matching the start/stop
/// contract in spec §4.2 ("stop halts the loop and clears the cache").
pub struct RatePublisher<C: UpstreamClient, Clk: Clock> {
    client: Arc<C>,
    cache: Arc<RateCache>,
    clock: Arc<Clk>,
    cfg: RateConfig,
    chain_id: u64,
    running: AtomicBool,
}

impl<C: UpstreamClient + 'static, Clk: Clock + 'static> RatePublisher<C, Clk> {
    pub fn new(client: Arc<C>, cache: Arc<RateCache>, clock: Arc<Clk>, cfg: RateConfig, chain_id: u64) -> Self {
        Self {
            client,
            cache,
            clock,
            cfg,
            chain_id,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Fetch the active pair list, perform one immediate refresh, then loop
    /// on `refresh_interval_ms` until [`stop`](Self::stop) is called.
    pub async fn run(self: &Arc<Self>) {
        self.running.store(true, Ordering::SeqCst);

        let pairs = match self.client.list_pairs(self.chain_id).await {
            Ok(p) => p.into_iter().filter(|p| p.active).collect::<Vec<_>>(),
            Err(e) => {
                tracing::error!(error = %e, chain_id = self.chain_id, "failed to list pairs, publisher idle");
                self.running.store(false, Ordering::SeqCst);
                return;
            }
        };

        self.refresh_all(&pairs).instrument(root_span("rate_publisher_tick", &TraceId::default())).await;

        let mut interval = tokio::time::interval(std::time::Duration::from_millis(self.cfg.refresh_interval_ms));
        interval.tick().await; // first tick fires immediately; already refreshed above

        while self.running.load(Ordering::SeqCst) {
            interval.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            self.refresh_all(&pairs).instrument(root_span("rate_publisher_tick", &TraceId::default())).await;
        }

        self.cache.clear();
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Refresh both directions of every pair concurrently. Each fetch is
    /// independent; one pair's failure does not cancel the others
    /// ("allSettled" semantics per spec §4.2).
    async fn refresh_all(&self, pairs: &[TradingPair]) {
        let mut legs = Vec::with_capacity(pairs.len() * 2);
        for pair in pairs {
            legs.push((pair.base_token.clone(), pair.quote_token.clone()));
            legs.push((pair.quote_token.clone(), pair.base_token.clone()));
        }

        let jobs = legs.into_iter().map(|(src, dst)| self.refresh_one(src, dst));
        futures::future::join_all(jobs).await;
    }

    async fn refresh_one(&self, src: String, dst: String) {
        let probe_amount_in = 1_000_000_000_000_000_000u128;
        let result = warn_if_slow(
            "rate_publisher.indicative",
            std::time::Duration::from_millis(500),
            self.client.indicative(self.chain_id, self.chain_id, &src, &dst, probe_amount_in, None),
        )
        .await;

        let key = crate::types::pair_key(&src, &dst);
        match result {
            Ok(mut quote) => {
                quote.amount_out = apply_markup(quote.amount_out, self.cfg.markup_bps);
                self.cache
                    .put(&src, &dst, quote, self.clock.now_ms(), self.cfg.refresh_interval_ms);
            }
            Err(e) => {
                tracing::warn!(pair = %key, error = %e, "rate refresh failed");
                self.cache.emit_error(key, e.to_string());
            }
        }
    }
}

/// Upstream quotes are reduced by `markup_bps` basis points before caching,
/// matching the teacher's bps-scaling idiom (see `planner::sizing`).
fn apply_markup(amount_out: u128, markup_bps: u32) -> u128 {
    if markup_bps == 0 {
        return amount_out;
    }
    let reduction = amount_out.saturating_mul(markup_bps as u128) / 10_000;
    amount_out.saturating_sub(reduction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::time::TestClock;
    use rust_decimal::Decimal;
    use std::sync::Mutex as StdMutex;
    use upstream::{FirmQuote, IndicativeQuote, Side, UpstreamError};

    struct MockClient {
        pairs: Vec<TradingPair>,
        calls: StdMutex<u32>,
    }

    #[async_trait]
    impl UpstreamClient for MockClient {
        async fn list_pairs(&self, _chain_id: u64) -> Result<Vec<TradingPair>, UpstreamError> {
            Ok(self.pairs.clone())
        }

        async fn indicative(
            &self,
            _src_chain: u64,
            _dst_chain: u64,
            token_in: &str,
            token_out: &str,
            amount_in: u128,
            _side: Option<Side>,
        ) -> Result<IndicativeQuote, UpstreamError> {
            *self.calls.lock().unwrap() += 1;
            Ok(IndicativeQuote {
                src_token: token_in.to_string(),
                dst_token: token_out.to_string(),
                amount_in,
                amount_out: amount_in * 2,
                price: Decimal::from(2),
                observed_at_ms: 0,
                valid_for_s: 30,
            })
        }

        async fn firm(
            &self,
            _from: &str,
            _to: &str,
            _src_chain: u64,
            _dst_chain: u64,
            _token_in: &str,
            _token_out: &str,
            _amount_in: u128,
            _slippage_pct: f64,
            _expiry_s: u64,
        ) -> Result<FirmQuote, UpstreamError> {
            unimplemented!("not exercised by publisher tests")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn initial_refresh_populates_both_directions() {
        let pairs = vec![TradingPair::new("p1", "USDC", "ETH", 1, true).unwrap()];
        let client = Arc::new(MockClient {
            pairs,
            calls: StdMutex::new(0),
        });
        let bus = Arc::new(common::EventBus::new());
        let cache = Arc::new(RateCache::new(bus));
        let clock = Arc::new(TestClock::new(0));
        let cfg = RateConfig {
            refresh_interval_ms: 1_000,
            markup_bps: 0,
        };

        let publisher = Arc::new(RatePublisher::new(client.clone(), cache.clone(), clock, cfg, 1));
        let p2 = publisher.clone();
        let handle = tokio::spawn(async move { p2.run().await });

        tokio::task::yield_now().await;
        tokio::time::advance(std::time::Duration::from_millis(10)).await;
        tokio::task::yield_now().await;

        assert_eq!(cache.len(), 2);
        publisher.stop();
        tokio::time::advance(std::time::Duration::from_millis(1_100)).await;
        let _ = handle.await;
        assert!(cache.is_empty());
    }

    #[test]
    fn markup_reduces_amount_out() {
        assert_eq!(apply_markup(1_000_000, 100), 990_000);
        assert_eq!(apply_markup(1_000_000, 0), 1_000_000);
    }
}
