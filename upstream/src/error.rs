use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("upstream call to {endpoint} timed out after {limit_ms} ms")]
    Timeout { endpoint: String, limit_ms: u64 },

    #[error("upstream call to {endpoint} failed after retries: {message}")]
    Transient { endpoint: String, message: String },

    #[error("upstream call to {endpoint} returned error code={code:?}: {body}")]
    Api {
        endpoint: String,
        code: Option<i64>,
        body: String,
    },
}

impl UpstreamError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, UpstreamError::Timeout { .. } | UpstreamError::Transient { .. })
    }
}

impl From<UpstreamError> for common::BridgeError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::Validation(m) => common::BridgeError::Validation(m),
            UpstreamError::Timeout { limit_ms, .. } => common::BridgeError::Timeout { limit_ms },
            UpstreamError::Transient { endpoint, message } => {
                common::BridgeError::UpstreamTransient { endpoint, message }
            }
            UpstreamError::Api { endpoint, code, body } => {
                common::BridgeError::UpstreamPermanent { endpoint, code, body }
            }
        }
    }
}
