use crate::error::connection::ConnectionError;

use tokio_tungstenite::tungstenite::Error as WsError;

/// **VALUE**: Verifies socket failures surface as read errors with their cause.
///
/// **WHY THIS MATTERS**: A channel that dies mid-session is logged through this error;
/// the cause is what tells a relay outage apart from a local network drop.
///
/// **BUG THIS CATCHES**: Would catch the conversion picking the wrong variant or
/// losing the tungstenite message.
#[test]
fn given_socket_error_when_converted_then_is_read_error_with_cause() {
    // GIVEN: A socket closed underneath the reader
    let socket_error = WsError::ConnectionClosed;
    let cause = socket_error.to_string();

    // WHEN: Converted
    let error = ConnectionError::from(socket_error);

    // THEN: A read error carrying the cause and the conversion site
    match &error {
        ConnectionError::Read { message, location } => {
            assert_eq!(message, &cause);
            assert!(location.file.ends_with("connection_error.rs"));
        }
        other => panic!("Expected Read, got {other:?}"),
    }
    assert!(error.to_string().starts_with("Read Error: "));
}

/// **VALUE**: Verifies outbound encoding failures become serialize errors.
///
/// **WHY THIS MATTERS**: An unencodable frame is dropped and logged, not sent half-written.
///
/// **BUG THIS CATCHES**: Would catch serde failures being reported as socket failures.
#[test]
fn given_serde_error_when_converted_then_is_serialize_error() {
    let serde_error = serde_json::from_str::<u8>("not a number").unwrap_err();

    let error = ConnectionError::from(serde_error);

    assert!(matches!(error, ConnectionError::Serialize { .. }));
    assert!(error.to_string().starts_with("Serialize Error: "));
}
