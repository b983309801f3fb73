//! Error taxonomy for external API interaction.

use thiserror::Error;

/// Errors produced by the capability implementations.
///
/// The executor only cares about the `is_transient`/`is_fatal_auth`
/// split; everything else is detail carried into the tick result.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("Request timed out")]
    Timeout,

    #[error("Rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Retryable within the same tick.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Timeout
            | ClientError::RateLimited { .. }
            | ClientError::Network(_) => true,
            ClientError::Http { status, .. } => *status >= 500,
            ClientError::Unauthorized(_) | ClientError::InvalidResponse(_) => false,
        }
    }

    /// Requires operator re-authentication; disables the action.
    pub fn is_fatal_auth(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ClientError::Timeout.is_transient());
        assert!(ClientError::RateLimited {
            retry_after_secs: Some(5)
        }
        .is_transient());
        assert!(ClientError::Network("reset".into()).is_transient());
        assert!(ClientError::Http {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(!ClientError::Http {
            status: 404,
            body: String::new()
        }
        .is_transient());
        assert!(!ClientError::Unauthorized("expired".into()).is_transient());
        assert!(!ClientError::InvalidResponse("not json".into()).is_transient());
    }

    #[test]
    fn test_fatal_auth_classification() {
        assert!(ClientError::Unauthorized("expired".into()).is_fatal_auth());
        assert!(!ClientError::Timeout.is_fatal_auth());
        assert!(!ClientError::Http {
            status: 500,
            body: String::new()
        }
        .is_fatal_auth());
    }
}
