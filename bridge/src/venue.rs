use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use upstream::Side;

#[derive(Debug, Error)]
pub enum VenueError {
    #[error("downstream venue call failed: {0}")]
    Transient(String),
    #[error("downstream venue rejected order: {0}")]
    Rejected(String),
}

/// Downstream limit-order venue the bridge reconciler mirrors upstream
/// prices onto. One implementation per downstream market-data/order
/// surface; kept as a thin capability contract the way `signer` keeps
/// its own collaborators pluggable.
#[async_trait]
pub trait DownstreamVenue: Send + Sync {
    async fn place_order(&self, ticker: &str, side: Side, price: Decimal, quantity: Decimal) -> Result<String, VenueError>;

    async fn cancel_order(&self, downstream_order_id: &str) -> Result<(), VenueError>;

    /// `(best_bid, best_ask)` for the book-imbalance term in the `dynamic`
    /// strategy.
    async fn best_bid_ask(&self, ticker: &str) -> Result<(Decimal, Decimal), VenueError>;

    /// Order ids that have filled since the last poll.
    async fn poll_fills(&self) -> Result<Vec<String>, VenueError>;
}
