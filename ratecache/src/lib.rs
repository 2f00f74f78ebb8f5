pub mod cache;
pub mod publisher;
pub mod types;

pub use cache::RateCache;
pub use publisher::RatePublisher;
pub use types::{CachedRate, RateEvent, pair_key};
