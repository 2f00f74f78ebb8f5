use thiserror::Error;

/// Flat error-kind taxonomy shared across every component.
///
/// The source domain models errors as a class hierarchy; per the design
/// notes this collapses into one enum plus structured fields rather than
/// a tree of exception types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller provided something malformed. Surfaced; never retried.
    Validation,
    /// Network error, timeout, HTTP 5xx/429. Retried, then surfaced.
    UpstreamTransient,
    /// HTTP 4xx (non-429) or envelope code != success. Surfaced immediately.
    UpstreamPermanent,
    /// Deadline already passed at point of use.
    QuoteExpired,
    /// Bad checksum, sequence gap, unknown MsgType.
    SessionProtocol,
    /// Missing required configuration field. Fatal at startup.
    Configuration,
    /// Uncaught error in a loop body; the loop continues at its next tick.
    Fatal,
}

/// The error type returned by library-boundary APIs (`upstream`, `fixengine`,
/// `lifecycle`). Loop bodies and the `app` binary convert these into
/// `anyhow::Error` at their own boundary, matching the teacher's split
/// between typed library errors and `anyhow` at the call sites that don't
/// need to match on error kind.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("upstream call to {endpoint} failed (transient): {message}")]
    UpstreamTransient { endpoint: String, message: String },

    #[error("upstream call to {endpoint} failed (permanent), code={code:?}: {body}")]
    UpstreamPermanent {
        endpoint: String,
        code: Option<i64>,
        body: String,
    },

    #[error("quote {quote_id} expired at {deadline}")]
    QuoteExpired { quote_id: String, deadline: i64 },

    #[error("session protocol error: {0}")]
    SessionProtocol(String),

    #[error("missing required configuration field: {0}")]
    Configuration(String),

    #[error("operation timed out after {limit_ms} ms")]
    Timeout { limit_ms: u64 },

    #[error("invalid state transition: {0}")]
    InvalidState(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Validation(_) => ErrorKind::Validation,
            BridgeError::UpstreamTransient { .. } => ErrorKind::UpstreamTransient,
            BridgeError::UpstreamPermanent { .. } => ErrorKind::UpstreamPermanent,
            BridgeError::QuoteExpired { .. } => ErrorKind::QuoteExpired,
            BridgeError::SessionProtocol(_) => ErrorKind::SessionProtocol,
            BridgeError::Configuration(_) => ErrorKind::Configuration,
            BridgeError::Timeout { .. } => ErrorKind::UpstreamTransient,
            BridgeError::InvalidState(_) | BridgeError::NotFound(_) | BridgeError::Other(_) => {
                ErrorKind::Validation
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::UpstreamTransient)
    }
}
