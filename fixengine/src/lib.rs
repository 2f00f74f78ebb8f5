pub mod acceptor;
pub mod app;
pub mod framing;
pub mod message;
pub mod session;
pub mod timestamp;

pub use acceptor::FixAcceptor;
pub use app::{FixApplication, PendingOutbound};
pub use framing::FrameBuffer;
pub use message::{build_message, checksum, parse_message, FixMessage, FixProtocolError};
pub use session::{FixSession, FixVersion, HeartbeatAction, SessionState};
