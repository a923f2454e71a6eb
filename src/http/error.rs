use thiserror::Error;

/// Failure below the HTTP layer: nothing usable came back from the server.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),

    /// The request could not be assembled, so nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::InvalidRequest(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request to {url} failed after {attempts} attempt(s): {source}")]
    Transport {
        url: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },
}

impl ExecutorError {
    /// Errors caused by how the request was built rather than by the server.
    /// These are never retried and abort the run.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ExecutorError::UnsupportedMethod(_) | ExecutorError::InvalidUrl { .. }
        )
    }

    /// Whether the request left the client at all.
    pub fn was_sent(&self) -> bool {
        match self {
            ExecutorError::Transport { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}
