use crate::ErrorLocation;
use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::caller()` captures file, line, and column.
///
/// **WHY THIS MATTERS**: Every pairing error carries an ErrorLocation. If it fails to
/// capture accurate location data, connection and signature errors lose their
/// debugging value in the logs.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - `#[track_caller]` is dropped from `caller()`
/// - Line/column capture fails
#[test]
fn given_caller_when_error_location_created_then_captures_file_line_column() {
    // GIVEN/WHEN: Capturing location on a known line
    let expected_line = line!() + 1;
    let location = ErrorLocation::caller();

    // THEN: Should capture file, line, and column of this call site
    assert!(
        location.file.contains("error_location.rs"),
        "Should capture file path"
    );
    assert_eq!(location.line, expected_line, "Should capture caller line");
    assert!(location.column > 0, "Should capture column number");
}

/// **VALUE**: Verifies that ErrorLocation Display formatting produces `[file:line:column]`.
///
/// **WHY THIS MATTERS**: Error messages end up in the agent log file. If the format
/// breaks, location information becomes unreadable.
///
/// **BUG THIS CATCHES**: Would catch if the Display implementation drops the
/// brackets or one of the three components.
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: An ErrorLocation
    let location = ErrorLocation::from(Location::caller());

    // WHEN: Formatting as string
    let formatted = location.to_string();

    // THEN: Should produce "[file:line:column]" format
    assert!(formatted.starts_with('['), "Should start with '['");
    assert!(formatted.ends_with(']'), "Should end with ']'");
    assert!(
        formatted.contains(&format!(":{}:{}]", location.line, location.column)),
        "Should end with line and column"
    );
    assert_eq!(
        formatted.matches(':').count(),
        2,
        "Should have exactly 2 colons"
    );
}

/// **VALUE**: Verifies that `#[track_caller]` propagation reaches the real call site.
///
/// **WHY THIS MATTERS**: Error constructors in `pairing-core` are wrapped in
/// `#[track_caller]` helpers. If propagation breaks, every error would point at the
/// helper rather than at the failing operation.
///
/// **BUG THIS CATCHES**: Would catch if a helper in the chain loses `#[track_caller]`.
#[test]
fn given_multiple_call_sites_when_capturing_location_then_each_has_unique_line() {
    // GIVEN: A helper function that captures location
    #[track_caller]
    fn capture_location() -> ErrorLocation {
        ErrorLocation::caller()
    }

    // WHEN: Capturing location from different call sites
    let loc1 = capture_location();
    let loc2 = capture_location();

    // THEN: Should have same file but sequential line numbers
    assert_eq!(loc1.file, loc2.file, "Should have same file");
    assert_eq!(loc1.line + 1, loc2.line, "Lines should be sequential");
}
