use common::ErrorLocation;

use thiserror::Error as ThisError;
use tokio_tungstenite::tungstenite::Error as WsError;

/// Failures of the relay channel itself.
#[derive(Debug, ThisError)]
pub enum ConnectionError {
    #[error("Handshake Error: {message} {location}")]
    Handshake {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Read Error: {message} {location}")]
    Read {
        message: String,
        location: ErrorLocation,
    },

    #[error("Serialize Error: {message} {location}")]
    Serialize {
        message: String,
        location: ErrorLocation,
    },

    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    #[error("Closed Error: {message} {location}")]
    Closed {
        message: String,
        location: ErrorLocation,
    },
}

impl From<serde_json::Error> for ConnectionError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        ConnectionError::Serialize {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<WsError> for ConnectionError {
    #[track_caller]
    fn from(error: WsError) -> Self {
        ConnectionError::Read {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
