use common::ErrorLocation;

use thiserror::Error as ThisError;

/// Inbound payload problems. Receivers log these and drop the frame.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("Malformed Message Error: {message} {location}")]
    Malformed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unknown Message Error: type '{message_type}': {message} {location}")]
    UnknownType {
        message_type: String,
        message: String,
        location: ErrorLocation,
    },

    #[error("Hex Error: {message} {location}")]
    Hex {
        message: String,
        location: ErrorLocation,
    },
}

impl From<hex::FromHexError> for ProtocolError {
    #[track_caller]
    fn from(error: hex::FromHexError) -> Self {
        ProtocolError::Hex {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
