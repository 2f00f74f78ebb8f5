mod init;
mod macros;
mod trace_id;

pub use init::{child_span, init_tracing, root_span, warn_if_slow};
pub use macros::annotate_span;
pub use trace_id::TraceId;
