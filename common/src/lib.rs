pub mod config;
pub mod error;
pub mod eventbus;
pub mod logger;
pub mod time;

pub use error::{BridgeError, ErrorKind};
pub use eventbus::EventBus;
pub use time::{Clock, SystemClock, TestClock, now_ms, now_utc};
