use upstream::UpstreamClient;

use crate::amm::AmmClient;
use crate::types::{Allocation, ExecutionRecord, Venue};

/// Executes every allocation from an [`crate::optimizer::optimize`] result
/// in order (spec §4.6 "Execution"). A failing allocation is recorded and
/// does not prevent the remaining ones from running.
pub async fn execute<U: UpstreamClient, A: AmmClient>(
    client: &U,
    amm: &A,
    allocations: &[Allocation],
    settlement_address: &str,
    src_token: &str,
    dst_token: &str,
    chain_id: u64,
    max_slippage_bps: u32,
    deadline_s: u64,
) -> Vec<ExecutionRecord> {
    let mut records = Vec::with_capacity(allocations.len());

    for alloc in allocations {
        let record = match alloc.venue {
            Venue::Upstream => execute_upstream(client, alloc, settlement_address, src_token, dst_token, chain_id, max_slippage_bps, deadline_s).await,
            Venue::Amm => execute_amm(amm, alloc, src_token, dst_token, max_slippage_bps, deadline_s).await,
        };
        records.push(record);
    }

    records
}

async fn execute_upstream<U: UpstreamClient>(
    client: &U,
    alloc: &Allocation,
    settlement_address: &str,
    src_token: &str,
    dst_token: &str,
    chain_id: u64,
    max_slippage_bps: u32,
    deadline_s: u64,
) -> ExecutionRecord {
    // from/to settlement addresses are resolved by the signer/address
    // registry; this caller's address stands in for both legs.
    let slippage_pct = max_slippage_bps as f64 / 100.0;
    match client
        .firm(settlement_address, settlement_address, chain_id, chain_id, src_token, dst_token, alloc.amount_in, slippage_pct, deadline_s)
        .await
    {
        Ok(firm) => ExecutionRecord {
            allocation: Venue::Upstream,
            expected_out: alloc.amount_out,
            actual_out: Some(firm.amount_out),
            realized_slippage_bps: Some(realized_slippage_bps(alloc.amount_out, firm.amount_out)),
            error: None,
        },
        Err(e) => ExecutionRecord {
            allocation: Venue::Upstream,
            expected_out: alloc.amount_out,
            actual_out: None,
            realized_slippage_bps: None,
            error: Some(e.to_string()),
        },
    }
}

async fn execute_amm<A: AmmClient>(amm: &A, alloc: &Allocation, src_token: &str, dst_token: &str, max_slippage_bps: u32, deadline_s: u64) -> ExecutionRecord {
    let min_out = alloc.amount_out.saturating_sub(alloc.amount_out.saturating_mul(max_slippage_bps as u128) / 10_000);
    match amm.swap(src_token, dst_token, alloc.amount_in, min_out, deadline_s).await {
        Ok(swap) => ExecutionRecord {
            allocation: Venue::Amm,
            expected_out: alloc.amount_out,
            actual_out: Some(swap.amount_out),
            realized_slippage_bps: Some(realized_slippage_bps(alloc.amount_out, swap.amount_out)),
            error: None,
        },
        Err(e) => ExecutionRecord {
            allocation: Venue::Amm,
            expected_out: alloc.amount_out,
            actual_out: None,
            realized_slippage_bps: None,
            error: Some(e.to_string()),
        },
    }
}

/// `(expected - actual) / expected * 10000` (spec §4.6).
fn realized_slippage_bps(expected: u128, actual: u128) -> f64 {
    if expected == 0 {
        return 0.0;
    }
    let diff = expected as i128 - actual as i128;
    (diff as f64 / expected as f64) * 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use upstream::{FirmQuote, IndicativeQuote, Side, TradingPair, UpstreamError};

    struct OkUpstream;
    #[async_trait]
    impl UpstreamClient for OkUpstream {
        async fn list_pairs(&self, _c: u64) -> Result<Vec<TradingPair>, UpstreamError> {
            Ok(Vec::new())
        }
        async fn indicative(&self, _s: u64, _d: u64, ti: &str, to: &str, ai: u128, _side: Option<Side>) -> Result<IndicativeQuote, UpstreamError> {
            Ok(IndicativeQuote {
                src_token: ti.into(),
                dst_token: to.into(),
                amount_in: ai,
                amount_out: ai,
                price: Decimal::ONE,
                observed_at_ms: 0,
                valid_for_s: 1,
            })
        }
        async fn firm(&self, from: &str, to: &str, sc: u64, dc: u64, ti: &str, td: &str, ai: u128, _sp: f64, es: u64) -> Result<FirmQuote, UpstreamError> {
            Ok(FirmQuote {
                quote_id: "f".into(),
                src_chain: sc,
                dst_chain: dc,
                from_addr: from.into(),
                to_addr: to.into(),
                src_token: ti.into(),
                dst_token: td.into(),
                amount_in: ai,
                amount_out: ai - ai / 100, // 1% short of expectation
                fee_rate_bps: 0,
                fee_amount: 0,
                router_addr: "r".into(),
                calldata: "0x".into(),
                deadline_s: es as i64,
            })
        }
    }

    struct FailingAmm;
    #[async_trait]
    impl AmmClient for FailingAmm {
        async fn quote(&self, _ti: &str, _to: &str, _ai: u128) -> Result<crate::amm::AmmQuote, crate::amm::AmmError> {
            unreachable!("not exercised in this test")
        }
        async fn native_rate(&self, _dst: &str) -> Result<Decimal, crate::amm::AmmError> {
            Ok(Decimal::ZERO)
        }
        async fn swap(&self, _ti: &str, _to: &str, _ai: u128, _min_out: u128, _deadline_s: u64) -> Result<crate::amm::SwapResult, crate::amm::AmmError> {
            Err(crate::amm::AmmError::Reverted("slippage exceeded".into()))
        }
    }

    #[tokio::test]
    async fn per_allocation_failure_does_not_abort_the_batch() {
        let allocations = vec![
            Allocation { venue: Venue::Upstream, amount_in: 1_000, amount_out: 1_000, gas_units: 0 },
            Allocation { venue: Venue::Amm, amount_in: 500, amount_out: 500, gas_units: 10 },
        ];

        let records = execute(&OkUpstream, &FailingAmm, &allocations, "0xabc", "USDC", "ETH", 1, 50, 60).await;

        assert_eq!(records.len(), 2);
        assert!(records[0].error.is_none());
        assert_eq!(records[0].actual_out, Some(990));
        assert!((records[0].realized_slippage_bps.unwrap() - 100.0).abs() < 1e-6);

        assert!(records[1].error.is_some());
        assert!(records[1].actual_out.is_none());
    }
}
