use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use upstream::UpstreamClient;

use crate::amm::AmmClient;
use crate::types::{Allocation, OptimizeRequest, OptimizeResult, Venue};

const REFINE_ITERATIONS: u32 = 5;
const GRID_STEPS: u32 = 10; // f in {0.0, 0.1, ..., 1.0}

struct Point {
    fraction: f64,
    allocations: Vec<Allocation>,
    net_output: i128,
}

/// Two-phase {upstream, AMM} split optimiser (spec §4.6). Grid scan finds
/// a coarse maximum, ternary search refines around it; the fraction
/// finally reported is the best point seen across *both* phases, so a
/// strictly monotone surface (property 8) always reports the exact
/// boundary rather than a refinement-search midpoint.
pub async fn optimize<U: UpstreamClient, A: AmmClient>(client: &U, amm: &A, req: &OptimizeRequest, min_split_bps: u32) -> Result<OptimizeResult, String> {
    let native_rate = amm.native_rate(&req.dst_token).await.map_err(|e| e.to_string())?;
    let min_split = min_split_bps as f64 / 10_000.0;

    let mut best: Option<Point> = None;
    let mut pure_upstream_net: Option<i128> = None;
    let mut pure_amm_net: Option<i128> = None;

    for step in 0..=GRID_STEPS {
        let f = step as f64 / GRID_STEPS as f64;
        if f > 0.0 && f < 1.0 && (f < min_split || (1.0 - f) < min_split) {
            continue;
        }
        let point = evaluate(client, amm, req, f, native_rate).await?;
        if f == 0.0 {
            pure_amm_net = Some(point.net_output);
        }
        if f == 1.0 {
            pure_upstream_net = Some(point.net_output);
        }
        update_best(&mut best, point);
    }

    let step_size = 1.0 / (GRID_STEPS as f64);
    let anchor = best.as_ref().map(|p| p.fraction).unwrap_or(1.0);
    let mut lo = (anchor - step_size).max(0.0);
    let mut hi = (anchor + step_size).min(1.0);

    for _ in 0..REFINE_ITERATIONS {
        if hi - lo < 1e-9 {
            break;
        }
        let m1 = lo + (hi - lo) / 3.0;
        let m2 = hi - (hi - lo) / 3.0;
        let p1 = evaluate(client, amm, req, m1, native_rate).await?;
        let p2 = evaluate(client, amm, req, m2, native_rate).await?;
        let (o1, o2) = (p1.net_output, p2.net_output);
        update_best(&mut best, p1);
        update_best(&mut best, p2);
        if o1 < o2 {
            lo = m1;
        } else {
            hi = m2;
        }
    }

    let best = best.ok_or_else(|| "no grid point evaluated".to_string())?;

    let best_single = match (pure_upstream_net, pure_amm_net) {
        (Some(u), Some(a)) => u.max(a),
        (Some(u), None) => u,
        (None, Some(a)) => a,
        (None, None) => best.net_output,
    };

    let improvement_bps = if best_single <= 0 {
        0.0
    } else {
        ((best.net_output - best_single) as f64 / best_single as f64) * 10_000.0
    };

    Ok(OptimizeResult {
        best_fraction: best.fraction,
        net_output: best.net_output.max(0) as u128,
        allocations: best.allocations,
        improvement_bps,
        split_beneficial: improvement_bps > 0.0,
    })
}

fn update_best(best: &mut Option<Point>, candidate: Point) {
    let better = match best {
        None => true,
        Some(current) => candidate.net_output > current.net_output,
    };
    if better {
        *best = Some(candidate);
    }
}

async fn evaluate<U: UpstreamClient, A: AmmClient>(client: &U, amm: &A, req: &OptimizeRequest, f: f64, native_rate: Decimal) -> Result<Point, String> {
    let upstream_in = (req.total_amount as f64 * f).round() as u128;
    let amm_in = req.total_amount.saturating_sub(upstream_in);

    let mut allocations = Vec::new();
    let mut total_out: i128 = 0;
    let mut total_gas_units: u64 = 0;

    if upstream_in > 0 {
        let q = client
            .indicative(req.chain_id, req.chain_id, &req.src_token, &req.dst_token, upstream_in, None)
            .await
            .map_err(|e| e.to_string())?;
        total_out += q.amount_out as i128;
        allocations.push(Allocation {
            venue: Venue::Upstream,
            amount_in: upstream_in,
            amount_out: q.amount_out,
            gas_units: 0,
        });
    }

    if amm_in > 0 {
        let q = amm.quote(&req.src_token, &req.dst_token, amm_in).await.map_err(|e| e.to_string())?;
        total_out += q.amount_out as i128;
        total_gas_units += q.gas_units;
        allocations.push(Allocation {
            venue: Venue::Amm,
            amount_in: amm_in,
            amount_out: q.amount_out,
            gas_units: q.gas_units,
        });
    }

    let gas_cost_dst = if native_rate.is_zero() {
        0i128
    } else {
        (Decimal::from(total_gas_units) * native_rate).to_f64().unwrap_or(0.0) as i128
    };

    Ok(Point {
        fraction: f,
        allocations,
        net_output: total_out - gas_cost_dst,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use upstream::{FirmQuote, IndicativeQuote, Side, TradingPair, UpstreamError};

    struct LinearUpstream;
    #[async_trait]
    impl UpstreamClient for LinearUpstream {
        async fn list_pairs(&self, _chain_id: u64) -> Result<Vec<TradingPair>, UpstreamError> {
            Ok(Vec::new())
        }
        async fn indicative(&self, _s: u64, _d: u64, token_in: &str, token_out: &str, amount_in: u128, _side: Option<Side>) -> Result<IndicativeQuote, UpstreamError> {
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
                amount_out: ai * 2,
                fee_rate_bps: 0,
                fee_amount: 0,
                router_addr: "r".into(),
                calldata: "0x".into(),
                deadline_s: es as i64,
            })
        }
    }

    struct WorseAmm;
    #[async_trait]
    impl AmmClient for WorseAmm {
        async fn quote(&self, _ti: &str, _to: &str, amount_in: u128) -> Result<crate::amm::AmmQuote, crate::amm::AmmError> {
            Ok(crate::amm::AmmQuote {
                venue: crate::amm::AmmVenue::V2,
                amount_out: (amount_in as f64 * 1.9) as u128,
                gas_units: 0,
            })
        }
        async fn native_rate(&self, _dst: &str) -> Result<Decimal, crate::amm::AmmError> {
            Ok(Decimal::ZERO)
        }
        async fn swap(&self, _ti: &str, _to: &str, amount_in: u128, _min_out: u128, _deadline_s: u64) -> Result<crate::amm::SwapResult, crate::amm::AmmError> {
            Ok(crate::amm::SwapResult {
                tx_hash: "tx".into(),
                amount_out: (amount_in as f64 * 1.9) as u128,
            })
        }
    }

    /// S6: upstream strictly better than AMM everywhere, gas negligible ->
    /// optimum f == 1.0, improvementBps == 0, splitBeneficial == false.
    #[tokio::test]
    async fn s6_upstream_dominates_everywhere() {
        let req = OptimizeRequest {
            src_token: "USDC".to_string(),
            dst_token: "ETH".to_string(),
            total_amount: 100_000_000_000_000_000_000,
            chain_id: 1,
        };
        let result = optimize(&LinearUpstream, &WorseAmm, &req, 500).await.unwrap();
        assert_eq!(result.best_fraction, 1.0);
        assert_eq!(result.improvement_bps, 0.0);
        assert!(!result.split_beneficial);
    }
}
