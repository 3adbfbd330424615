use common::ErrorLocation;

use thiserror::Error as ThisError;

/// Ways an origin signature request can settle without a signature.
#[derive(Debug, Clone, ThisError)]
pub enum SignatureError {
    /// No channel was open when the request was issued.
    #[error("Not Connected Error: {message} {location}")]
    NotConnected {
        message: String,
        location: ErrorLocation,
    },

    /// The channel was cleaned up while the request was in flight.
    #[error("Connection Lost Error: {message} {location}")]
    ConnectionLost {
        message: String,
        location: ErrorLocation,
    },

    /// No response arrived before the configured deadline.
    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    /// The target device declined to sign.
    #[error("Rejected Error: {reason} {location}")]
    Rejected {
        reason: String,
        location: ErrorLocation,
    },
}

impl SignatureError {
    #[track_caller]
    pub(crate) fn connection_lost(message: impl Into<String>) -> Self {
        SignatureError::ConnectionLost {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }
}
