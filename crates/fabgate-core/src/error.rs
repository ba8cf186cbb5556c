//! Gateway client error types.

use thiserror::Error;

/// Errors surfaced by event streams, requests and the network facade.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connection or receive failure reported by the gateway transport.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A wire message could not be decoded.
    #[error("Decode error: {reason}")]
    Decode { reason: String },

    /// JSON (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Serialized request bytes are not a valid chaincode events request.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// A caller-supplied argument was rejected.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The request has no signature and no signer is configured.
    #[error("Request is not signed and no signer is configured")]
    Unsigned,

    /// The external signer failed.
    #[error("Signing failed: {0}")]
    Sign(String),

    /// The stream was closed by its consumer.
    #[error("Stream closed")]
    Closed,
}

impl GatewayError {
    /// Returns `true` if the error is a transient transport failure.
    ///
    /// Retrying is left to the caller; streams never retry on their own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_errors_are_retryable() {
        assert!(GatewayError::Transport("reset".into()).is_retryable());
        assert!(!GatewayError::Closed.is_retryable());
        assert!(!GatewayError::Decode { reason: "bad".into() }.is_retryable());
    }

    #[test]
    fn display_messages() {
        let err = GatewayError::InvalidArgument { reason: "empty chaincode name".into() };
        assert_eq!(err.to_string(), "Invalid argument: empty chaincode name");
    }
}
