pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use auth::{AuthProvider, StaticToken};
pub use client::{HttpUpstreamClient, UpstreamClient};
pub use error::UpstreamError;
pub use types::{FirmQuote, IndicativeQuote, Side, TradingPair};
