use std::sync::Arc;

use async_trait::async_trait;
use common::config::LifecycleConfig;
use common::time::TestClock;
use common::EventBus;
use fixengine::{build_message, parse_message, FixApplication, FrameBuffer, FixSession, FixVersion};
use journal::{AuditTrail, InMemoryJournal};
use lifecycle::{CounterpartyProfile, CounterpartyRegistry, LifecycleEngine};
use rust_decimal::Decimal;
use upstream::{FirmQuote, IndicativeQuote, Side, TradingPair, UpstreamClient, UpstreamError};

struct FakeUpstream;

#[async_trait]
impl UpstreamClient for FakeUpstream {
    async fn list_pairs(&self, _chain_id: u64) -> Result<Vec<TradingPair>, UpstreamError> {
        Ok(vec![TradingPair::new("p1", "BTC", "USDT", 1, true).unwrap()])
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
            amount_out: amount_in,
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

fn app_with_fresh_engine() -> FixApplication {
    let clock = Arc::new(TestClock::new(0));
    let journal = Arc::new(InMemoryJournal::default());
    let audit = Arc::new(AuditTrail::new(journal));
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
    FixApplication::new(engine, Arc::new(FakeUpstream), 1)
}

/// S2: a corrupted checksum must be dropped without advancing the
/// session's inbound sequence number, so a well-formed retransmission of
/// the same seq still succeeds.
#[test]
fn s2_corrupted_checksum_does_not_advance_in_seq_num() {
    let mut session = FixSession::new("WINTERMUTE", "DELUTHIUM", FixVersion::Fix44);
    session.on_logon(true, 30, 0);

    let good = build_message("FIX.4.4", "0", vec![(34, "1".to_string()), (49, "WINTERMUTE".to_string()), (56, "DELUTHIUM".to_string())]);
    let mut corrupted = good.clone();
    let len = corrupted.len();
    corrupted[len - 2] = if corrupted[len - 2] == b'0' { b'9' } else { b'0' };

    assert!(parse_message(&corrupted).is_err());
    assert_eq!(session.in_seq_num, 0, "in_seq_num must not move on a malformed message");

    let parsed = parse_message(&good).unwrap();
    assert!(session.record_inbound(parsed.seq_num().unwrap(), 0).is_ok());
    assert_eq!(session.in_seq_num, 1);
}

/// S3: a QuoteRequest followed by a NewOrderSingle against the returned
/// quote-id produces a Quote reply then a Filled ExecutionReport.
#[tokio::test]
async fn s3_quote_request_then_new_order_single_fills() {
    let app = app_with_fresh_engine();

    let quote_request = fixengine::message::FixMessage {
        fields: vec![
            (35, "R".to_string()),
            (131, "RFQ-1".to_string()),
            (55, "BTC/USDT".to_string()),
            (54, "1".to_string()),
            (38, "1000000".to_string()),
        ],
    };
    let replies = app.dispatch("WINTERMUTE", &quote_request).await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].msg_type, "S");
    let quote_id = replies[0]
        .fields
        .iter()
        .find(|(t, _)| *t == 117)
        .map(|(_, v)| v.clone())
        .expect("quote reply carries QuoteID (117)");

    let new_order = fixengine::message::FixMessage {
        fields: vec![(35, "D".to_string()), (11, "CL-1".to_string()), (117, quote_id)],
    };
    let exec_replies = app.dispatch("WINTERMUTE", &new_order).await;
    assert_eq!(exec_replies.len(), 1);
    assert_eq!(exec_replies[0].msg_type, "8");
    let ord_status = exec_replies[0].fields.iter().find(|(t, _)| *t == 39).map(|(_, v)| v.as_str());
    assert_eq!(ord_status, Some("2")); // Filled
}

/// Framing must split two messages glued back to back in a single read,
/// as would happen if a counterparty batches writes.
#[test]
fn concatenated_messages_split_cleanly() {
    let mut fb = FrameBuffer::new();
    let m1 = build_message("FIX.4.4", "0", vec![(34, "1".to_string()), (49, "A".to_string())]);
    let m2 = build_message("FIX.4.4", "0", vec![(34, "2".to_string()), (49, "A".to_string())]);
    let mut combined = m1.clone();
    combined.extend_from_slice(&m2);

    fb.push(&combined).unwrap();
    let drained = fb.drain_messages();
    assert_eq!(drained.len(), 2);
    assert_eq!(parse_message(&drained[0]).unwrap().seq_num(), Some(1));
    assert_eq!(parse_message(&drained[1]).unwrap().seq_num(), Some(2));
}
