use rust_decimal::Decimal;
use upstream::{FirmQuote, IndicativeQuote, Side};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuoteState {
    Pending,
    Quoted,
    Accepted,
    Rejected,
    Executed,
    Settled,
    Expired,
    Failed,
    Cancelled,
}

impl QuoteState {
    /// Spec §8 property 5: once terminal, a quote stays terminal.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            QuoteState::Rejected
                | QuoteState::Expired
                | QuoteState::Executed
                | QuoteState::Settled
                | QuoteState::Failed
                | QuoteState::Cancelled
        )
    }
}

#[derive(Clone, Debug)]
pub struct Quote {
    pub quote_id: String,
    pub request_id: String,
    pub counterparty_id: String,
    pub state: QuoteState,
    pub indicative: IndicativeQuote,
    pub firm: Option<FirmQuote>,
    pub base_token: String,
    pub quote_token: String,
    pub side: Side,
    pub quantity: u128,
    pub price: Decimal,
    pub notional: u128,
    pub fee: u128,
    pub expires_at_ms: i64,
    pub created_at_ms: i64,
    pub chain_id: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettlementState {
    Pending,
    Settling,
    Settled,
    Failed,
}

#[derive(Clone, Debug)]
pub struct Trade {
    pub trade_id: String,
    pub quote_id: String,
    pub request_id: String,
    pub counterparty_id: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: u128,
    pub notional: u128,
    pub fee: u128,
    pub executed_at_ms: i64,
    pub settlement_state: SettlementState,
    pub tx_hash: Option<String>,
    pub chain_id: Option<u64>,
}

/// Input to [`crate::engine::LifecycleEngine::submit`].
#[derive(Clone, Debug)]
pub struct SubmitRequest {
    pub request_id: String,
    pub counterparty_id: String,
    pub base_token: String,
    pub quote_token: String,
    pub side: Side,
    pub quantity: u128,
    pub chain_id: u64,
}

#[derive(Clone, Debug)]
pub struct CounterpartyProfile {
    pub active: bool,
    pub fee_rate_bps_override: Option<u32>,
    /// `None` means every pair is enabled for this counterparty.
    pub enabled_pairs: Option<std::collections::HashSet<String>>,
}

impl CounterpartyProfile {
    pub fn allows_pair(&self, base: &str, quote: &str) -> bool {
        match &self.enabled_pairs {
            None => true,
            Some(set) => set.contains(&format!("{base}/{quote}")),
        }
    }
}
