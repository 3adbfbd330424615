// Unit tests for error module
// Serialization and conversions from pairing-core errors

use crate::error::AgentError;

use pairing_core::CoreError;
use pairing_core::error::config::ConfigError;
use pairing_core::error::connection::ConnectionError;

use common::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Tests that errors can be serialized.
///
/// **WHY THIS MATTERS**: The agent reports failures as structured JSON to whatever
/// supervises it. If serialization breaks, the supervisor receives opaque errors.
///
/// **BUG THIS CATCHES**: Would catch if someone removes the `#[derive(Serialize)]`
/// or adds a non-serializable field.
#[test]
fn given_agent_error_when_serialized_then_contains_tag_and_message() {
    // GIVEN: An AgentError
    let err = AgentError::Settings {
        message: String::from("PAIRING_ROLE is not set"),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Serializing to JSON
    let json = serde_json::to_value(&err).expect("Error should be serializable");

    // THEN: The variant is the tag and the data carries message and location
    assert_eq!(json["type"], "Settings");
    assert_eq!(json["data"]["message"], "PAIRING_ROLE is not set");
    assert!(json["data"]["location"].is_object());
}

/// **VALUE**: Verifies the Display format keeps kind, message and location.
///
/// **WHY THIS MATTERS**: Logs are the main debugging tool for a headless agent.
///
/// **BUG THIS CATCHES**: Would catch the `#[error(...)]` format dropping the location.
#[test]
fn given_agent_error_when_displayed_then_includes_kind_and_location() {
    let err = AgentError::Agent {
        message: String::from("boom"),
        location: ErrorLocation::from(Location::caller()),
    };

    let rendered = err.to_string();

    assert!(rendered.starts_with("Agent Error: boom"));
    assert!(rendered.contains("error.rs"));
}

/// **VALUE**: Verifies pairing-core errors convert into the matching agent variant.
///
/// **WHY THIS MATTERS**: `?` in the startup path relies on these conversions.
///
/// **BUG THIS CATCHES**: Would catch config errors being reported as core errors.
#[test]
fn given_core_errors_when_converted_then_map_to_agent_variants() {
    let config: AgentError = ConfigError::DirectoryNotFound {
        location: ErrorLocation::from(Location::caller()),
    }
    .into();
    let wrapped_config: AgentError = CoreError::from(ConfigError::DirectoryNotFound {
        location: ErrorLocation::from(Location::caller()),
    })
    .into();
    let connection: AgentError = ConnectionError::Timeout {
        message: String::from("no code"),
        location: ErrorLocation::from(Location::caller()),
    }
    .into();

    assert!(matches!(config, AgentError::Config { .. }));
    assert!(matches!(wrapped_config, AgentError::Config { .. }));
    match connection {
        AgentError::Core { message, .. } => assert!(message.contains("no code")),
        other => panic!("Expected Core, got {other:?}"),
    }
}
