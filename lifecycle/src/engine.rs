use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::config::LifecycleConfig;
use common::time::Clock;
use common::{BridgeError, EventBus};
use journal::{AuditTrail, RelatedIds};
use parking_lot::{Mutex, RwLock};
use upstream::UpstreamClient;
use uuid::Uuid;

use crate::events::LifecycleEvent;
use crate::registry::CounterpartyRegistry;
use crate::types::{Quote, QuoteState, SettlementState, SubmitRequest, Trade};

/// Owns every in-flight Quote and Trade (spec §4.4). One entry per
/// quote-id/trade-id, each behind its own `Mutex` so transitions for
/// distinct ids proceed independently while the surrounding `RwLock`
/// keeps the table itself read-mostly, matching the resource model in
/// spec §5.
pub struct LifecycleEngine {
    client: Arc<dyn UpstreamClient>,
    clock: Arc<dyn Clock>,
    cfg: LifecycleConfig,
    registry: Arc<CounterpartyRegistry>,
    audit: Arc<AuditTrail>,
    bus: Arc<EventBus<LifecycleEvent>>,
    quotes: RwLock<HashMap<String, Arc<Mutex<Quote>>>>,
    by_request: RwLock<HashMap<String, String>>,
    trades: RwLock<HashMap<String, Arc<Mutex<Trade>>>>,
}

impl LifecycleEngine {
    pub fn new(
        client: Arc<dyn UpstreamClient>,
        clock: Arc<dyn Clock>,
        cfg: LifecycleConfig,
        registry: Arc<CounterpartyRegistry>,
        audit: Arc<AuditTrail>,
        bus: Arc<EventBus<LifecycleEvent>>,
    ) -> Self {
        Self {
            client,
            clock,
            cfg,
            registry,
            audit,
            bus,
            quotes: RwLock::new(HashMap::new()),
            by_request: RwLock::new(HashMap::new()),
            trades: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_quote(&self, quote_id: &str) -> Option<Quote> {
        self.quotes.read().get(quote_id).map(|q| q.lock().clone())
    }

    pub fn get_trade(&self, trade_id: &str) -> Option<Trade> {
        self.trades.read().get(trade_id).map(|t| t.lock().clone())
    }

    /// Pending → Quoted, via an indicative upstream quote.
    pub async fn submit(self: &Arc<Self>, req: SubmitRequest) -> Result<Quote, BridgeError> {
        let related = RelatedIds::with_request_id(req.request_id.clone());
        self.audit.rfq_received("lifecycle", related.clone());

        let profile = self
            .registry
            .get(&req.counterparty_id)
            .ok_or_else(|| BridgeError::Validation(format!("unknown counterparty {}", req.counterparty_id)))?;
        if !profile.active {
            return Err(BridgeError::Validation(format!("counterparty {} is not active", req.counterparty_id)));
        }
        if !profile.allows_pair(&req.base_token, &req.quote_token) {
            return Err(BridgeError::Validation(format!(
                "pair {}/{} is not enabled for counterparty {}",
                req.base_token, req.quote_token, req.counterparty_id
            )));
        }

        let indicative = self
            .client
            .indicative(req.chain_id, req.chain_id, &req.base_token, &req.quote_token, req.quantity, Some(req.side))
            .await?;

        let fee_bps = profile.fee_rate_bps_override.unwrap_or(self.cfg.default_fee_rate_bps);
        let notional = indicative.amount_out;
        let fee = notional.saturating_mul(fee_bps as u128) / 10_000;

        let quote_id = Uuid::new_v4().to_string();
        let now = self.clock.now_ms() as i64;
        let expires_at_ms = now + (self.cfg.default_quote_validity_s as i64) * 1_000;

        let quote = Quote {
            quote_id: quote_id.clone(),
            request_id: req.request_id.clone(),
            counterparty_id: req.counterparty_id.clone(),
            state: QuoteState::Quoted,
            price: indicative.price,
            indicative,
            firm: None,
            base_token: req.base_token,
            quote_token: req.quote_token,
            side: req.side,
            quantity: req.quantity,
            notional,
            fee,
            expires_at_ms,
            created_at_ms: now,
            chain_id: req.chain_id,
        };

        self.quotes.write().insert(quote_id.clone(), Arc::new(Mutex::new(quote.clone())));
        self.by_request.write().insert(req.request_id.clone(), quote_id.clone());
        self.schedule_expiry(quote_id.clone(), expires_at_ms, now);

        self.audit.quote_generated(
            "lifecycle",
            RelatedIds {
                quote_id: Some(quote_id.clone()),
                ..related
            },
        );
        self.bus.publish(LifecycleEvent::QuoteGenerated {
            quote_id: quote_id.clone(),
            request_id: quote.request_id.clone(),
        });

        Ok(quote)
    }

    /// Quoted → Accepted → Executed, requesting a firm quote and minting a
    /// Trade. On upstream failure, transitions to Failed.
    pub async fn accept(&self, quote_id: &str) -> Result<Trade, BridgeError> {
        let handle = self.entry(quote_id)?;

        let now = self.clock.now_ms() as i64;
        {
            let mut guard = handle.lock();
            if guard.state != QuoteState::Quoted {
                return Err(BridgeError::InvalidState(format!(
                    "quote {quote_id} is {:?}, expected Quoted",
                    guard.state
                )));
            }
            if now > guard.expires_at_ms {
                let deadline = guard.expires_at_ms;
                guard.state = QuoteState::Expired;
                drop(guard);
                self.audit.quote_expired("lifecycle", RelatedIds {
                    quote_id: Some(quote_id.to_string()),
                    ..Default::default()
                });
                self.bus.publish(LifecycleEvent::QuoteExpired {
                    quote_id: quote_id.to_string(),
                });
                return Err(BridgeError::QuoteExpired {
                    quote_id: quote_id.to_string(),
                    deadline,
                });
            }
            guard.state = QuoteState::Accepted;
        }

        self.audit.quote_accepted("lifecycle", RelatedIds {
            quote_id: Some(quote_id.to_string()),
            ..Default::default()
        });
        self.bus.publish(LifecycleEvent::QuoteAccepted {
            quote_id: quote_id.to_string(),
        });

        let (counterparty_id, chain_id, src_token, dst_token, amount_in) = {
            let guard = handle.lock();
            (
                guard.counterparty_id.clone(),
                guard.chain_id,
                guard.base_token.clone(),
                guard.quote_token.clone(),
                guard.quantity,
            )
        };
        // from/to settlement addresses are resolved by the signer/address
        // registry, both external collaborators here; the counterparty id
        // stands in for both legs of this simplified settlement path.
        let firm_result = self
            .client
            .firm(
                &counterparty_id,
                &counterparty_id,
                chain_id,
                chain_id,
                &src_token,
                &dst_token,
                amount_in,
                0.0,
                30,
            )
            .await;

        match firm_result {
            Ok(firm) => {
                let mut guard = handle.lock();
                guard.firm = Some(firm.clone());
                guard.state = QuoteState::Executed;
                let trade = Trade {
                    trade_id: Uuid::new_v4().to_string(),
                    quote_id: guard.quote_id.clone(),
                    request_id: guard.request_id.clone(),
                    counterparty_id: guard.counterparty_id.clone(),
                    side: guard.side,
                    price: guard.price,
                    quantity: guard.quantity,
                    notional: guard.notional,
                    fee: guard.fee,
                    executed_at_ms: self.clock.now_ms() as i64,
                    settlement_state: SettlementState::Pending,
                    tx_hash: None,
                    chain_id: None,
                };
                drop(guard);

                self.trades.write().insert(trade.trade_id.clone(), Arc::new(Mutex::new(trade.clone())));

                self.audit.trade_executed("lifecycle", RelatedIds {
                    quote_id: Some(quote_id.to_string()),
                    trade_id: Some(trade.trade_id.clone()),
                    ..Default::default()
                });
                self.bus.publish(LifecycleEvent::TradeExecuted {
                    trade_id: trade.trade_id.clone(),
                    quote_id: quote_id.to_string(),
                });

                Ok(trade)
            }
            Err(e) => {
                handle.lock().state = QuoteState::Failed;
                let reason = e.to_string();
                self.bus.publish(LifecycleEvent::QuoteFailed {
                    quote_id: quote_id.to_string(),
                    reason,
                });
                Err(e.into())
            }
        }
    }

    pub fn reject(&self, quote_id: &str, reason: &str) -> Result<(), BridgeError> {
        let handle = self.entry(quote_id)?;
        {
            let mut guard = handle.lock();
            if guard.state.is_terminal() {
                return Err(BridgeError::InvalidState(format!("quote {quote_id} already terminal")));
            }
            guard.state = QuoteState::Rejected;
        }
        self.audit.quote_rejected(
            "lifecycle",
            RelatedIds {
                quote_id: Some(quote_id.to_string()),
                ..Default::default()
            },
            reason,
        );
        self.bus.publish(LifecycleEvent::QuoteRejected {
            quote_id: quote_id.to_string(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    /// QuoteCancel path (spec §4.3): removes a quote by quote-id rather
    /// than request-id, and per spec "no response is sent" — callers
    /// must not reply even when this returns an error.
    pub fn cancel_quote(&self, quote_id: &str) -> Result<(), BridgeError> {
        let handle = self.entry(quote_id)?;
        let mut guard = handle.lock();
        if guard.state.is_terminal() {
            return Err(BridgeError::InvalidState(format!("quote {quote_id} already terminal")));
        }
        guard.state = QuoteState::Cancelled;
        drop(guard);
        self.bus.publish(LifecycleEvent::QuoteCancelled {
            quote_id: quote_id.to_string(),
        });
        Ok(())
    }

    pub fn cancel(&self, request_id: &str) -> Result<(), BridgeError> {
        let quote_id = self
            .by_request
            .read()
            .get(request_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(format!("no quote for request {request_id}")))?;

        let handle = self.entry(&quote_id)?;
        {
            let mut guard = handle.lock();
            if guard.state.is_terminal() {
                return Err(BridgeError::InvalidState(format!("quote {quote_id} already terminal")));
            }
            guard.state = QuoteState::Cancelled;
        }
        self.bus.publish(LifecycleEvent::QuoteCancelled { quote_id });
        Ok(())
    }

    pub fn settle(&self, trade_id: &str, tx_hash: Option<String>) -> Result<Trade, BridgeError> {
        let handle = self
            .trades
            .read()
            .get(trade_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(format!("no trade {trade_id}")))?;

        let mut guard = handle.lock();
        guard.settlement_state = SettlementState::Settled;
        guard.tx_hash = tx_hash;
        Ok(guard.clone())
    }

    /// No-op unless the quote is still `Quoted`; safe to call more than
    /// once or after the quote already moved on (spec §4.4 "idempotent").
    pub fn expire_if_due(&self, quote_id: &str) {
        let Some(handle) = self.quotes.read().get(quote_id).cloned() else {
            return;
        };
        let now = self.clock.now_ms() as i64;
        let mut guard = handle.lock();
        if guard.state == QuoteState::Quoted && now >= guard.expires_at_ms {
            guard.state = QuoteState::Expired;
            drop(guard);
            self.audit.quote_expired("lifecycle", RelatedIds {
                quote_id: Some(quote_id.to_string()),
                ..Default::default()
            });
            self.bus.publish(LifecycleEvent::QuoteExpired {
                quote_id: quote_id.to_string(),
            });
        }
    }

    /// Spawn the expiry timer backing spec §4.4 ("schedule a timer for
    /// expiry") / property 6 (Expiry liveness): a Quoted quote that is
    /// never accepted must still reach Expired on its own, not only when
    /// lazily checked inside `accept`. Monotonic (`tokio::time::sleep`),
    /// resolution well under the 100ms budget; `expire_if_due` is already
    /// idempotent against a quote that moved on in the meantime.
    fn schedule_expiry(self: &Arc<Self>, quote_id: String, expires_at_ms: i64, now_ms: i64) {
        let delay = Duration::from_millis(expires_at_ms.saturating_sub(now_ms).max(0) as u64);
        let engine = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.expire_if_due(&quote_id);
        });
    }

    fn entry(&self, quote_id: &str) -> Result<Arc<Mutex<Quote>>, BridgeError> {
        self.quotes
            .read()
            .get(quote_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(format!("no quote {quote_id}")))
    }
}
