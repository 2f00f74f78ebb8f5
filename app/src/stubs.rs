use async_trait::async_trait;
use rust_decimal::Decimal;
use upstream::Side;

/// Placeholder downstream venue and AMM adapters. Wiring a production
/// order-book venue or an on-chain AMM router is an external integration
/// (credentials, RPC endpoints, settlement keys) outside this crate's
/// scope; these stand in so `bridge` and `splitrouter` compile into a
/// runnable binary, the same way the teacher's `OmnistonSwapBuilder`
/// stubs a real gRPC client behind a `TODO`.
pub struct UnconfiguredVenue;

#[async_trait]
impl bridge::DownstreamVenue for UnconfiguredVenue {
    async fn place_order(&self, _ticker: &str, _side: Side, _price: Decimal, _quantity: Decimal) -> Result<String, bridge::VenueError> {
        Err(bridge::VenueError::Transient("no downstream venue configured".to_string()))
    }

    async fn cancel_order(&self, _downstream_order_id: &str) -> Result<(), bridge::VenueError> {
        Err(bridge::VenueError::Transient("no downstream venue configured".to_string()))
    }

    async fn best_bid_ask(&self, _ticker: &str) -> Result<(Decimal, Decimal), bridge::VenueError> {
        Err(bridge::VenueError::Transient("no downstream venue configured".to_string()))
    }

    async fn poll_fills(&self) -> Result<Vec<String>, bridge::VenueError> {
        Ok(Vec::new())
    }
}

pub struct UnconfiguredAmm;

#[async_trait]
impl splitrouter::AmmClient for UnconfiguredAmm {
    async fn quote(&self, _token_in: &str, _token_out: &str, _amount_in: u128) -> Result<splitrouter::AmmQuote, splitrouter::AmmError> {
        Err(splitrouter::AmmError::Transient("no AMM router configured".to_string()))
    }

    async fn native_rate(&self, _dst_token: &str) -> Result<Decimal, splitrouter::AmmError> {
        Ok(Decimal::ZERO)
    }

    async fn swap(&self, _token_in: &str, _token_out: &str, _amount_in: u128, _min_out: u128, _deadline_s: u64) -> Result<splitrouter::SwapResult, splitrouter::AmmError> {
        Err(splitrouter::AmmError::Transient("no AMM router configured".to_string()))
    }
}
