pub mod events;
pub mod pricing;
pub mod reconciler;
pub mod types;
pub mod venue;

pub use events::BridgeEvent;
pub use reconciler::BridgeReconciler;
pub use types::{BridgeOrder, BridgeOrderState, Mapping};
pub use venue::{DownstreamVenue, VenueError};
