use common::config::BridgeStrategy;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use upstream::Side;

/// Target downstream price for one mapping (spec §4.5 step 2). `book` is
/// only consulted by the `dynamic` strategy; `mirror`/`spread` ignore it.
pub fn target_price(strategy: BridgeStrategy, mid: Decimal, side: Side, spread_bps: f64, book: Option<(Decimal, Decimal)>) -> Decimal {
    match strategy {
        BridgeStrategy::Mirror => mid,
        BridgeStrategy::Spread => offset(mid, side, spread_bps),
        BridgeStrategy::Dynamic => {
            let book_bps = book
                .map(|(bid, ask)| {
                    if mid.is_zero() {
                        0.0
                    } else {
                        ((ask - bid) / mid * Decimal::from(10_000)).to_f64().unwrap_or(0.0)
                    }
                })
                .unwrap_or(0.0);
            offset(mid, side, spread_bps.max(book_bps))
        }
    }
}

/// `mid` widened by half of `spread_bps`: downward for a resting bid
/// (`Buy`), upward for a resting ask (`Sell`).
fn offset(mid: Decimal, side: Side, spread_bps: f64) -> Decimal {
    let half_bps = Decimal::try_from(spread_bps / 2.0).unwrap_or_default();
    let delta = mid * half_bps / Decimal::from(10_000);
    match side {
        Side::Buy => mid - delta,
        Side::Sell => mid + delta,
    }
}

/// `|new - old| / old * 10000`, the deviation gate in spec §4.5 step 3.
pub fn deviation_bps(new_price: Decimal, old_price: Decimal) -> f64 {
    if old_price.is_zero() {
        return f64::MAX;
    }
    let ratio = ((new_price - old_price).abs() / old_price) * Decimal::from(10_000);
    ratio.to_f64().unwrap_or(f64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_returns_mid_exactly() {
        let mid = Decimal::new(1000, 1);
        assert_eq!(target_price(BridgeStrategy::Mirror, mid, Side::Buy, 10.0, None), mid);
    }

    #[test]
    fn spread_widens_symmetrically_around_mid() {
        let mid = Decimal::from(100);
        let bid = target_price(BridgeStrategy::Spread, mid, Side::Buy, 20.0, None);
        let ask = target_price(BridgeStrategy::Spread, mid, Side::Sell, 20.0, None);
        assert_eq!(mid - bid, ask - mid);
    }

    #[test]
    fn deviation_s5_scenario() {
        let old = Decimal::new(1000, 1); // 100.0
        assert!(deviation_bps(Decimal::new(10005, 2), old) < 20.0); // 100.05 -> ~5bps, under threshold
        assert!(deviation_bps(Decimal::new(1003, 1), old) >= 20.0); // 100.30 -> 30bps, over threshold
    }
}
