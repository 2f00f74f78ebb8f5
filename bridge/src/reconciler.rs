use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::config::OrderBookBridgeConfig;
use common::logger::{TraceId, root_span, warn_if_slow};
use common::time::Clock;
use common::EventBus;
use parking_lot::{Mutex, RwLock};
use tracing::Instrument;
use upstream::UpstreamClient;
use uuid::Uuid;

use crate::events::BridgeEvent;
use crate::pricing::{deviation_bps, target_price};
use crate::types::{BridgeOrder, BridgeOrderState, Mapping};
use crate::venue::DownstreamVenue;

/// Reconciliation loop mirroring upstream mids onto a downstream venue as
/// resting limit orders (spec §4.5). One `BridgeReconciler` owns every
/// registered mapping; orders are keyed by mapping-id so a mapping has at
/// most one live order at a time.
pub struct BridgeReconciler<U, V, Clk> {
    client: Arc<U>,
    venue: Arc<V>,
    clock: Arc<Clk>,
    cfg: OrderBookBridgeConfig,
    chain_id: u64,
    mappings: Vec<Mapping>,
    orders: RwLock<HashMap<String, Arc<Mutex<BridgeOrder>>>>,
    bus: Arc<EventBus<BridgeEvent>>,
    running: AtomicBool,
}

impl<U, V, Clk> BridgeReconciler<U, V, Clk>
where
    U: UpstreamClient + 'static,
    V: DownstreamVenue + 'static,
    Clk: Clock + 'static,
{
    pub fn new(client: Arc<U>, venue: Arc<V>, clock: Arc<Clk>, cfg: OrderBookBridgeConfig, chain_id: u64, mappings: Vec<Mapping>, bus: Arc<EventBus<BridgeEvent>>) -> Self {
        Self {
            client,
            venue,
            clock,
            cfg,
            chain_id,
            mappings,
            orders: RwLock::new(HashMap::new()),
            bus,
            running: AtomicBool::new(true),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub async fn run(self: &Arc<Self>) {
        let mut ticker = tokio::time::interval(Duration::from_millis(self.cfg.refresh_interval_ms));
        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            self.reconcile_all().instrument(root_span("bridge_reconcile_tick", &TraceId::default())).await;
            self.poll_fills().await;
        }
    }

    pub async fn reconcile_all(&self) {
        for mapping in &self.mappings {
            if let Err(e) = self.reconcile_one(mapping).await {
                tracing::warn!(mapping_id = %mapping.mapping_id, error = %e, "bridge reconcile failed");
            }
        }
    }

    async fn reconcile_one(&self, mapping: &Mapping) -> Result<(), String> {
        let indicative = warn_if_slow(
            "bridge_reconciler.indicative",
            std::time::Duration::from_millis(500),
            self.client.indicative(self.chain_id, self.chain_id, &mapping.upstream_base, &mapping.upstream_quote, 1, Some(mapping.side)),
        )
        .await
        .map_err(|e| e.to_string())?;
        let mid = indicative.price;

        let book = if self.cfg.strategy == common::config::BridgeStrategy::Dynamic {
            self.venue.best_bid_ask(&mapping.downstream_ticker).await.ok()
        } else {
            None
        };
        let target = target_price(self.cfg.strategy, mid, mapping.side, self.cfg.spread_bps, book);

        let existing = self.orders.read().get(&mapping.mapping_id).cloned();
        match existing {
            None => self.try_place(mapping, target).await,
            Some(handle) => {
                let (old_price, bridge_id) = {
                    let guard = handle.lock();
                    (guard.price, guard.bridge_id.clone())
                };
                if deviation_bps(target, old_price) < self.cfg.price_deviation_threshold_bps {
                    return Ok(());
                }
                let downstream_id = handle.lock().downstream_order_id.clone();
                if let Some(downstream_id) = downstream_id {
                    if let Err(e) = self.venue.cancel_order(&downstream_id).await {
                        self.emit_error(&bridge_id, &e.to_string());
                        return Err(e.to_string());
                    }
                }
                handle.lock().state = BridgeOrderState::Cancelled;
                self.bus.publish(BridgeEvent::Cancelled { bridge_id: bridge_id.clone() });
                self.try_place(mapping, target).await
            }
        }
    }

    async fn try_place(&self, mapping: &Mapping, price: rust_decimal::Decimal) -> Result<(), String> {
        if self.orders_in_flight() >= self.cfg.max_orders {
            tracing::debug!(mapping_id = %mapping.mapping_id, "bridge order budget exhausted, queuing for next refresh");
            return Ok(());
        }

        let bridge_id = Uuid::new_v4().to_string();
        let quantity = rust_decimal::Decimal::ONE;
        let order = Arc::new(Mutex::new(BridgeOrder {
            bridge_id: bridge_id.clone(),
            mapping_id: mapping.mapping_id.clone(),
            downstream_order_id: None,
            price,
            quantity,
            state: BridgeOrderState::Pending,
            placed_at_ms: self.clock.now_ms() as i64,
        }));
        self.orders.write().insert(mapping.mapping_id.clone(), order.clone());

        match self.venue.place_order(&mapping.downstream_ticker, mapping.side, price, quantity).await {
            Ok(downstream_id) => {
                let mut guard = order.lock();
                guard.downstream_order_id = Some(downstream_id);
                guard.state = BridgeOrderState::Placed;
                drop(guard);
                self.bus.publish(BridgeEvent::Placed { bridge_id, mapping_id: mapping.mapping_id.clone() });
                Ok(())
            }
            Err(e) => {
                order.lock().state = BridgeOrderState::Error;
                self.emit_error(&bridge_id, &e.to_string());
                Err(e.to_string())
            }
        }
    }

    async fn poll_fills(&self) {
        let filled = match self.venue.poll_fills().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "bridge fill poll failed");
                return;
            }
        };
        if filled.is_empty() {
            return;
        }
        let orders = self.orders.read();
        for handle in orders.values() {
            let mut guard = handle.lock();
            if guard.downstream_order_id.as_deref().is_some_and(|id| filled.contains(&id.to_string())) {
                guard.state = BridgeOrderState::Filled;
                self.bus.publish(BridgeEvent::Filled { bridge_id: guard.bridge_id.clone() });
            }
        }
    }

    fn orders_in_flight(&self) -> usize {
        self.orders.read().values().filter(|o| o.lock().state.counts_against_budget()).count()
    }

    fn emit_error(&self, bridge_id: &str, reason: &str) {
        self.bus.publish(BridgeEvent::Error { bridge_id: bridge_id.to_string(), reason: reason.to_string() });
    }

    pub fn order_for(&self, mapping_id: &str) -> Option<BridgeOrder> {
        self.orders.read().get(mapping_id).map(|o| o.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::config::BridgeStrategy;
    use common::time::TestClock;
    use rust_decimal::Decimal;
    use std::sync::Mutex as StdMutex;
    use upstream::{FirmQuote, IndicativeQuote, Side, TradingPair, UpstreamError};

    struct SequencedUpstream {
        prices: StdMutex<std::collections::VecDeque<Decimal>>,
    }

    #[async_trait]
    impl UpstreamClient for SequencedUpstream {
        async fn list_pairs(&self, _chain_id: u64) -> Result<Vec<TradingPair>, UpstreamError> {
            Ok(Vec::new())
        }
        async fn indicative(&self, _s: u64, _d: u64, token_in: &str, token_out: &str, amount_in: u128, _side: Option<Side>) -> Result<IndicativeQuote, UpstreamError> {
            let price = self.prices.lock().unwrap().pop_front().unwrap_or(Decimal::from(100));
            Ok(IndicativeQuote {
                src_token: token_in.to_string(),
                dst_token: token_out.to_string(),
                amount_in,
                amount_out: amount_in,
                price,
                observed_at_ms: 0,
                valid_for_s: 30,
            })
        }
        async fn firm(&self, from: &str, to: &str, sc: u64, dc: u64, ti: &str, to_t: &str, ai: u128, _sp: f64, es: u64) -> Result<FirmQuote, UpstreamError> {
            Ok(FirmQuote {
                quote_id: "f".into(),
                src_chain: sc,
                dst_chain: dc,
                from_addr: from.into(),
                to_addr: to.into(),
                src_token: ti.into(),
                dst_token: to_t.into(),
                amount_in: ai,
                amount_out: ai,
                fee_rate_bps: 0,
                fee_amount: 0,
                router_addr: "r".into(),
                calldata: "0x".into(),
                deadline_s: es as i64,
            })
        }
    }

    struct FakeVenue {
        placed: StdMutex<u32>,
        cancelled: StdMutex<u32>,
    }

    #[async_trait]
    impl DownstreamVenue for FakeVenue {
        async fn place_order(&self, _ticker: &str, _side: Side, _price: Decimal, _qty: Decimal) -> Result<String, crate::venue::VenueError> {
            let mut n = self.placed.lock().unwrap();
            *n += 1;
            Ok(format!("ord-{n}"))
        }
        async fn cancel_order(&self, _id: &str) -> Result<(), crate::venue::VenueError> {
            *self.cancelled.lock().unwrap() += 1;
            Ok(())
        }
        async fn best_bid_ask(&self, _ticker: &str) -> Result<(Decimal, Decimal), crate::venue::VenueError> {
            Ok((Decimal::from(99), Decimal::from(101)))
        }
        async fn poll_fills(&self) -> Result<Vec<String>, crate::venue::VenueError> {
            Ok(Vec::new())
        }
    }

    fn mapping() -> Mapping {
        Mapping {
            mapping_id: "m1".to_string(),
            upstream_base: "BTC".to_string(),
            upstream_quote: "USDT".to_string(),
            downstream_ticker: "BTC-USDT".to_string(),
            side: Side::Buy,
        }
    }

    /// S5: 100.0 -> place; 100.05 (5bps) -> no action; 100.30 (30bps) ->
    /// cancel then replace, against a 20bps threshold.
    #[tokio::test]
    async fn s5_deviation_gates_replacement() {
        let upstream = Arc::new(SequencedUpstream {
            prices: StdMutex::new(vec![Decimal::new(1000, 1), Decimal::new(10005, 2), Decimal::new(1003, 1)].into()),
        });
        let venue = Arc::new(FakeVenue { placed: StdMutex::new(0), cancelled: StdMutex::new(0) });
        let clock = Arc::new(TestClock::new(0));
        let cfg = OrderBookBridgeConfig {
            strategy: BridgeStrategy::Mirror,
            price_deviation_threshold_bps: 20.0,
            ..Default::default()
        };
        let bus = Arc::new(EventBus::new());
        let reconciler = Arc::new(BridgeReconciler::new(upstream, venue.clone(), clock, cfg, 1, vec![mapping()], bus));

        reconciler.reconcile_all().await; // places at 100.0
        assert_eq!(*venue.placed.lock().unwrap(), 1);
        assert_eq!(reconciler.order_for("m1").unwrap().price, Decimal::new(1000, 1));

        reconciler.reconcile_all().await; // 100.05, under threshold
        assert_eq!(*venue.placed.lock().unwrap(), 1);
        assert_eq!(*venue.cancelled.lock().unwrap(), 0);

        reconciler.reconcile_all().await; // 100.30, over threshold -> replace
        assert_eq!(*venue.cancelled.lock().unwrap(), 1);
        assert_eq!(*venue.placed.lock().unwrap(), 2);
        assert_eq!(reconciler.order_for("m1").unwrap().price, Decimal::new(1003, 1));
    }

    #[tokio::test]
    async fn budget_exhaustion_skips_new_placements() {
        let upstream = Arc::new(SequencedUpstream { prices: StdMutex::new(std::collections::VecDeque::new()) });
        let venue = Arc::new(FakeVenue { placed: StdMutex::new(0), cancelled: StdMutex::new(0) });
        let clock = Arc::new(TestClock::new(0));
        let cfg = OrderBookBridgeConfig { max_orders: 0, ..Default::default() };
        let bus = Arc::new(EventBus::new());
        let reconciler = Arc::new(BridgeReconciler::new(upstream, venue.clone(), clock, cfg, 1, vec![mapping()], bus));

        reconciler.reconcile_all().await;
        assert_eq!(*venue.placed.lock().unwrap(), 0);
        assert!(reconciler.order_for("m1").is_none());
    }
}
