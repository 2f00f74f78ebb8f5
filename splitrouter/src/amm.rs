use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmmError {
    #[error("amm call failed: {0}")]
    Transient(String),
    #[error("amm swap reverted: {0}")]
    Reverted(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AmmVenue {
    V2,
    V3,
}

#[derive(Clone, Debug)]
pub struct AmmQuote {
    pub venue: AmmVenue,
    pub amount_out: u128,
    pub gas_units: u64,
}

/// Alternate on-chain liquidity venue the split router weighs against the
/// upstream RFQ source (spec §4.6). `quote` must internally pick the
/// better of v2/v3; callers only ever see one number per call.
#[async_trait]
pub trait AmmClient: Send + Sync {
    async fn quote(&self, token_in: &str, token_out: &str, amount_in: u128) -> Result<AmmQuote, AmmError>;

    /// `dst_token` priced in the chain's native gas unit, used to convert
    /// `gas_units` into destination-token terms.
    async fn native_rate(&self, dst_token: &str) -> Result<Decimal, AmmError>;

    async fn swap(&self, token_in: &str, token_out: &str, amount_in: u128, min_out: u128, deadline_s: u64) -> Result<SwapResult, AmmError>;
}

#[derive(Clone, Debug)]
pub struct SwapResult {
    pub tx_hash: String,
    pub amount_out: u128,
}
