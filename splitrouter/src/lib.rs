pub mod amm;
pub mod execution;
pub mod optimizer;
pub mod types;

pub use amm::{AmmClient, AmmError, AmmQuote, AmmVenue, SwapResult};
pub use execution::execute;
pub use optimizer::optimize;
pub use types::{Allocation, ExecutionRecord, OptimizeRequest, OptimizeResult, Venue};
