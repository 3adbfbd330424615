use crate::protocol::RelayCloseCode;

/// **VALUE**: Verifies relay application codes map to rejections and back.
///
/// **WHY THIS MATTERS**: A rejection lands the client in retry-error instead of idle.
///
/// **BUG THIS CATCHES**: Would catch a code table typo routing refusals to a silent reset.
#[test]
fn given_relay_codes_when_converted_then_rejections_are_recognised() {
    for code in [4000, 4001, 4003, 4004, 4005] {
        let close = RelayCloseCode::from(code);
        assert!(close.is_rejection(), "{code} should be a rejection");
        assert_eq!(close.code(), code);
    }
}

/// **VALUE**: Verifies standard close codes are not treated as rejections.
///
/// **WHY THIS MATTERS**: A normal close (1000) or going-away (1001) just ends the session.
///
/// **BUG THIS CATCHES**: Would catch every close being escalated to retry-error.
#[test]
fn given_standard_codes_when_converted_then_are_other() {
    assert_eq!(RelayCloseCode::from(1000), RelayCloseCode::Other(1000));
    assert!(!RelayCloseCode::from(1001).is_rejection());
    assert!(!RelayCloseCode::from(4002).is_rejection());
}
