//! Error type shared by every remote call

use thiserror::Error;

/// Failure of a single remote request.
///
/// Cloneable so that the same error can be stored on the failed step and
/// carried inside engine events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("credential rejected by the server (HTTP {0})")]
    Unauthorized(u16),

    #[error("server returned HTTP {code}: {message}")]
    Status { code: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("invalid record: {0}")]
    InvalidRow(String),

    #[error("request cancelled")]
    Cancelled,
}

impl RemoteError {
    /// Map a non-success HTTP status to an error
    pub fn from_status(code: u16, body: &str) -> Self {
        match code {
            401 | 403 => Self::Unauthorized(code),
            _ => {
                let message = body.trim();
                let message = if message.is_empty() {
                    "empty response body".to_string()
                } else {
                    message.chars().take(200).collect()
                };
                Self::Status { code, message }
            }
        }
    }

    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Status { code, .. } => *code == 429 || *code >= 500,
            Self::Unauthorized(_) | Self::Decode(_) | Self::InvalidRow(_) | Self::Cancelled => false,
        }
    }

    /// Whether the failure means the credential must be replaced
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), "")
        } else {
            Self::Transport(err.to_string())
        }
    }
}
