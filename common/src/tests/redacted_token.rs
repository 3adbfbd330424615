use crate::RedactedToken;

/// **VALUE**: Verifies that a token never shows up in Debug or Display output.
///
/// **WHY THIS MATTERS**: Relay tokens are bearer credentials. Connection logs print
/// session and parameter structs with `{:?}`; a leaked token there lets anyone with
/// the log file resume the paired session.
///
/// **BUG THIS CATCHES**: Would catch a derived `Debug` replacing the manual impl.
#[test]
fn given_token_when_formatted_then_value_is_redacted() {
    // GIVEN: A token with a recognisable value
    let token = RedactedToken::new("super-secret-jwt");

    // WHEN: Formatting with Debug and Display
    let debug = format!("{token:?}");
    let display = format!("{token}");

    // THEN: Neither contains the secret
    assert!(!debug.contains("super-secret-jwt"), "Debug must redact");
    assert!(!display.contains("super-secret-jwt"), "Display must redact");
    assert_eq!(token.expose(), "super-secret-jwt");
    assert_eq!(token.len(), 16);
}

/// **VALUE**: Verifies that serializing a token fails instead of writing the secret.
///
/// **WHY THIS MATTERS**: Session structs are serde types. A silent serialization of
/// the token into JSON would leak it into whatever sink receives that JSON.
///
/// **BUG THIS CATCHES**: Would catch a derived `Serialize`.
#[test]
fn given_token_when_serialized_then_returns_error() {
    // GIVEN: A token
    let token = RedactedToken::new("abc");

    // WHEN: Serializing
    let result = serde_json::to_string(&token);

    // THEN: Serialization is refused
    assert!(result.is_err(), "Serialization must be refused");
    let message = result.unwrap_err().to_string();
    assert!(message.contains("expose()"), "Error should point to expose()");
}

/// **VALUE**: Verifies that a token can be read from JSON.
///
/// **WHY THIS MATTERS**: The relay delivers fresh tokens inside `authenticated`
/// messages; they must be captured straight into the redacted wrapper.
///
/// **BUG THIS CATCHES**: Would catch a broken `Deserialize` impl.
#[test]
fn given_json_string_when_deserialized_then_wraps_token() {
    let token: RedactedToken = serde_json::from_str("\"jwt-value\"").unwrap();
    assert_eq!(token.expose(), "jwt-value");
    assert!(!token.is_empty());
}
