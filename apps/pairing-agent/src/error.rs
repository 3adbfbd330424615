use pairing_core::CoreError;
use pairing_core::error::config::ConfigError;
use pairing_core::error::connection::ConnectionError;

use common::ErrorLocation;

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the agent host.
///
/// Library errors are flattened to their display text so the whole enum
/// stays serializable for status reporting.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum AgentError {
    /// Error from the agent itself (logging, signals, startup)
    #[error("Agent Error: {message} {location}")]
    Agent {
        message: String,
        location: ErrorLocation,
    },

    /// Invalid agent settings (role, pairing code, session)
    #[error("Settings Error: {message} {location}")]
    Settings {
        message: String,
        location: ErrorLocation,
    },

    /// Invalid or unreadable pairing config
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// Error from pairing-core operations
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },
}

impl From<ConfigError> for AgentError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        AgentError::Config {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<ConnectionError> for AgentError {
    #[track_caller]
    fn from(error: ConnectionError) -> Self {
        AgentError::Core {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<CoreError> for AgentError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Config(error) => AgentError::from(error),
            other => AgentError::Core {
                message: other.to_string(),
                location: ErrorLocation::caller(),
            },
        }
    }
}
