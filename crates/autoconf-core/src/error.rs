use std::net::SocketAddr;
use thiserror::Error;

/// Result type alias for auto-config operations
pub type Result<T> = std::result::Result<T, AutoConfigError>;

/// Errors that can occur while bootstrapping or renewing agent configuration
#[derive(Error, Debug)]
pub enum AutoConfigError {
    /// Missing collaborator, missing settings or unusable intro token
    #[error("configuration error: {0}")]
    Config(String),

    /// A single endpoint's RPC failed
    #[error("RPC to {addr} failed: {message}")]
    Transport {
        /// Endpoint that was contacted
        addr: SocketAddr,
        /// Failure reported by the RPC delegate
        message: String,
    },

    /// Every endpoint of every configured server failed
    #[error("no servers successfully responded to the auto-config request")]
    Exhausted,

    /// The caller's cancellation token fired
    #[error("auto-config operation cancelled")]
    Cancelled,

    /// Server response is missing or carries malformed certificate data
    #[error("invalid auto-config response: {0}")]
    Validation(String),

    /// Writing the response to durable storage failed
    #[error("failed to persist auto-config response: {0}")]
    Persistence(String),

    /// Key pair or CSR generation failed
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// The TLS consumer rejected new certificate material
    #[error("TLS update failed: {0}")]
    TlsUpdate(String),

    /// Certificate cache watch or pre-population failed
    #[error("certificate cache error: {0}")]
    Cache(String),

    /// Host resolution failed
    #[error("failed to resolve {host}: {message}")]
    Resolve {
        /// Host that was looked up
        host: String,
        /// Resolver failure
        message: String,
    },

    /// The background task has already been started
    #[error("auto-config is already running")]
    AlreadyRunning,

    /// Lifecycle state is internally inconsistent
    #[error("auto-config lifecycle invariant violated: {0}")]
    InvariantFault(String),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AutoConfigError {
    /// Returns true if an outer backoff loop should try again
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Exhausted | Self::Resolve { .. }
        )
    }

    /// Returns true if the error came from cancellation
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let addr: SocketAddr = "10.0.0.1:8300".parse().unwrap();
        assert!(AutoConfigError::Exhausted.is_retryable());
        assert!(AutoConfigError::Transport {
            addr,
            message: "refused".into()
        }
        .is_retryable());
        assert!(!AutoConfigError::Cancelled.is_retryable());
        assert!(!AutoConfigError::Config("no token".into()).is_retryable());
        assert!(AutoConfigError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_transport_display() {
        let err = AutoConfigError::Transport {
            addr: "10.0.0.1:8300".parse().unwrap(),
            message: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "RPC to 10.0.0.1:8300 failed: connection refused"
        );
    }
}
