use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

/// Failure taxonomy every session capability resolves to.
///
/// `Network` covers connectivity-level failures (timeout, refused
/// connection, TLS) and is safe for the caller to retry with backoff.
/// `Unexpected` means the remote answered but not in a decodable form
/// (version skew, a wrong secret, or an auth challenge dressed up as a
/// normal page); retrying without operator intervention will not help.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("network error: {message}")]
    Network { message: String },
    #[error("unexpected response: {message}")]
    Unexpected { message: String },
}

impl SessionError {
    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// Whether the caller may reasonably retry the failed call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}
