pub mod engine;
pub mod events;
pub mod registry;
pub mod types;

pub use engine::LifecycleEngine;
pub use events::LifecycleEvent;
pub use registry::CounterpartyRegistry;
pub use types::{CounterpartyProfile, Quote, QuoteState, SettlementState, SubmitRequest, Trade};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::config::LifecycleConfig;
    use common::time::TestClock;
    use common::EventBus;
    use journal::{AuditTrail, InMemoryJournal, Journal};
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use upstream::{FirmQuote, IndicativeQuote, Side, UpstreamClient, UpstreamError};

    struct FakeUpstream;

    #[async_trait]
    impl UpstreamClient for FakeUpstream {
        async fn list_pairs(&self, _chain_id: u64) -> Result<Vec<upstream::TradingPair>, UpstreamError> {
            Ok(Vec::new())
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
            Ok(IndicativeQuote {
                src_token: token_in.to_string(),
                dst_token: token_out.to_string(),
                amount_in,
                amount_out: amount_in, // price=1 for simplicity
                price: Decimal::from(45_000),
                observed_at_ms: 0,
                valid_for_s: 30,
            })
        }

        async fn firm(
            &self,
            from: &str,
            to: &str,
            src_chain: u64,
            dst_chain: u64,
            token_in: &str,
            token_out: &str,
            amount_in: u128,
            _slippage_pct: f64,
            expiry_s: u64,
        ) -> Result<FirmQuote, UpstreamError> {
            Ok(FirmQuote {
                quote_id: "firm-1".to_string(),
                src_chain,
                dst_chain,
                from_addr: from.to_string(),
                to_addr: to.to_string(),
                src_token: token_in.to_string(),
                dst_token: token_out.to_string(),
                amount_in,
                amount_out: amount_in,
                fee_rate_bps: 5,
                fee_amount: 0,
                router_addr: "router".to_string(),
                calldata: "0x".to_string(),
                deadline_s: expiry_s as i64,
            })
        }
    }

    fn engine_with_clock(clock: Arc<TestClock>) -> (Arc<LifecycleEngine>, Arc<InMemoryJournal>) {
        let journal = Arc::new(InMemoryJournal::default());
        let audit = Arc::new(AuditTrail::new(journal.clone()));
        let registry = Arc::new(CounterpartyRegistry::new());
        registry.upsert(
            "WINTERMUTE",
            CounterpartyProfile {
                active: true,
                fee_rate_bps_override: None,
                enabled_pairs: None,
            },
        );
        let bus = Arc::new(EventBus::new());
        let engine = Arc::new(LifecycleEngine::new(
            Arc::new(FakeUpstream),
            clock,
            LifecycleConfig::default(),
            registry,
            audit,
            bus,
        ));
        (engine, journal)
    }

    #[tokio::test]
    async fn full_quote_to_trade_flow_matches_audit_sequence() {
        let clock = Arc::new(TestClock::new(0));
        let (engine, journal) = engine_with_clock(clock);

        let quote = engine
            .submit(SubmitRequest {
                request_id: "REQ-001".to_string(),
                counterparty_id: "WINTERMUTE".to_string(),
                base_token: "BTC".to_string(),
                quote_token: "USDT".to_string(),
                side: Side::Buy,
                quantity: 1_000_000_000_000_000_000,
                chain_id: 1,
            })
            .await
            .unwrap();
        assert_eq!(quote.state, QuoteState::Quoted);

        let trade = engine.accept(&quote.quote_id).await.unwrap();
        assert_eq!(trade.quote_id, quote.quote_id);

        let executed = engine.get_quote(&quote.quote_id).unwrap();
        assert_eq!(executed.state, QuoteState::Executed);

        let entries = journal.query(&journal::JournalFilter {
            request_id: Some("REQ-001".to_string()),
            ..Default::default()
        });
        let types: Vec<_> = entries.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["rfq.received", "quote.generated", "quote.accepted", "trade.executed"]);
    }

    #[tokio::test]
    async fn accept_after_expiry_transitions_to_expired() {
        let clock = Arc::new(TestClock::new(0));
        let (engine, _journal) = engine_with_clock(clock.clone());

        let quote = engine
            .submit(SubmitRequest {
                request_id: "REQ-002".to_string(),
                counterparty_id: "WINTERMUTE".to_string(),
                base_token: "BTC".to_string(),
                quote_token: "USDT".to_string(),
                side: Side::Buy,
                quantity: 1,
                chain_id: 1,
            })
            .await
            .unwrap();

        clock.advance_ms(60_000); // default validity is 30s

        let err = engine.accept(&quote.quote_id).await.unwrap_err();
        assert!(matches!(err, common::BridgeError::QuoteExpired { .. }));
        assert_eq!(engine.get_quote(&quote.quote_id).unwrap().state, QuoteState::Expired);
    }

    #[tokio::test]
    async fn expire_if_due_is_idempotent_once_quote_left_quoted() {
        let clock = Arc::new(TestClock::new(0));
        let (engine, _journal) = engine_with_clock(clock.clone());

        let quote = engine
            .submit(SubmitRequest {
                request_id: "REQ-003".to_string(),
                counterparty_id: "WINTERMUTE".to_string(),
                base_token: "BTC".to_string(),
                quote_token: "USDT".to_string(),
                side: Side::Buy,
                quantity: 1,
                chain_id: 1,
            })
            .await
            .unwrap();

        engine.reject(&quote.quote_id, "test").unwrap();
        clock.advance_ms(60_000);
        engine.expire_if_due(&quote.quote_id); // no-op, already terminal

        assert_eq!(engine.get_quote(&quote.quote_id).unwrap().state, QuoteState::Rejected);
    }

    #[tokio::test]
    async fn submit_rejects_unknown_counterparty() {
        let clock = Arc::new(TestClock::new(0));
        let (engine, _journal) = engine_with_clock(clock);

        let err = engine
            .submit(SubmitRequest {
                request_id: "REQ-004".to_string(),
                counterparty_id: "NOBODY".to_string(),
                base_token: "BTC".to_string(),
                quote_token: "USDT".to_string(),
                side: Side::Buy,
                quantity: 1,
                chain_id: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, common::BridgeError::Validation(_)));
    }
}
