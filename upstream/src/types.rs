use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// TradingPair (spec §3). Invariant: base != quote, enforced in `new`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingPair {
    pub id: String,
    pub base_token: String,
    pub quote_token: String,
    pub chain_id: u64,
    pub active: bool,
}

impl TradingPair {
    pub fn new(
        id: impl Into<String>,
        base_token: impl Into<String>,
        quote_token: impl Into<String>,
        chain_id: u64,
        active: bool,
    ) -> Result<Self, String> {
        let base_token = base_token.into();
        let quote_token = quote_token.into();
        if base_token == quote_token {
            return Err(format!("base and quote token must differ, got '{base_token}'"));
        }
        Ok(Self {
            id: id.into(),
            base_token,
            quote_token,
            chain_id,
            active,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// Non-binding price estimate. Invariant: amount_in > 0 && amount_out > 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicativeQuote {
    pub src_token: String,
    pub dst_token: String,
    pub amount_in: u128,
    pub amount_out: u128,
    pub price: Decimal,
    pub observed_at_ms: i64,
    pub valid_for_s: u64,
}

impl IndicativeQuote {
    pub fn is_valid(&self) -> Result<(), String> {
        if self.amount_in == 0 {
            return Err("amount_in must be > 0".into());
        }
        if self.amount_out == 0 {
            return Err("amount_out must be > 0".into());
        }
        Ok(())
    }
}

/// Binding, signed price; the upstream has reserved liquidity until `deadline`.
/// Invariant checked at receipt: now < deadline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmQuote {
    pub quote_id: String,
    pub src_chain: u64,
    pub dst_chain: u64,
    pub from_addr: String,
    pub to_addr: String,
    pub src_token: String,
    pub dst_token: String,
    pub amount_in: u128,
    pub amount_out: u128,
    pub fee_rate_bps: u32,
    pub fee_amount: u128,
    pub router_addr: String,
    pub calldata: String,
    pub deadline_s: i64,
}

impl FirmQuote {
    pub fn is_live(&self, now_s: i64) -> bool {
        now_s < self.deadline_s
    }
}
