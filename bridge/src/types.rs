use rust_decimal::Decimal;
use upstream::Side;

/// A registered upstream-pair -> downstream-ticker mapping the
/// reconciliation loop keeps in sync (spec §4.5).
#[derive(Clone, Debug)]
pub struct Mapping {
    pub mapping_id: String,
    pub upstream_base: String,
    pub upstream_quote: String,
    pub downstream_ticker: String,
    pub side: Side,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeOrderState {
    Pending,
    Placed,
    Filled,
    Cancelled,
    Error,
}

/// A downstream-venue order whose lifetime tracks an upstream price feed.
#[derive(Clone, Debug)]
pub struct BridgeOrder {
    pub bridge_id: String,
    pub mapping_id: String,
    pub downstream_order_id: Option<String>,
    pub price: Decimal,
    pub quantity: Decimal,
    pub state: BridgeOrderState,
    pub placed_at_ms: i64,
}

impl BridgeOrderState {
    pub fn counts_against_budget(self) -> bool {
        matches!(self, BridgeOrderState::Pending | BridgeOrderState::Placed)
    }
}
