// Unit tests for logger initialization
// Idempotence, level resolution and file errors

use crate::logger::{initialize, resolve_level};

use std::path::PathBuf;

use log::LevelFilter;

/// **VALUE**: Verifies that calling initialize() multiple times doesn't panic or fail.
///
/// **WHY THIS MATTERS**: Startup paths and tests may both try to install the logger.
/// fern refuses a second global logger, which must not surface as a startup error.
///
/// **BUG THIS CATCHES**: Would catch if the Once or AtomicBool guards are removed.
#[test]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A valid temporary directory
    let temp_dir = tempfile::TempDir::new().expect("temp dir");

    // WHEN: Calling initialize twice
    let result1 = initialize(temp_dir.path(), LevelFilter::Debug);
    let result2 = initialize(temp_dir.path(), LevelFilter::Debug);

    // THEN: Both return Ok (the second logs a warning)
    assert!(result1.is_ok(), "First initialization should succeed");
    assert!(
        result2.is_ok(),
        "Second initialization should succeed (idempotent)"
    );

    // AND: Subsequent calls with an unusable directory are no-ops as well
    let unusable = PathBuf::from("/dev/null/invalid-path");
    assert!(initialize(&unusable, LevelFilter::Info).is_ok());
}

/// **VALUE**: Verifies level resolution from the environment value.
///
/// **WHY THIS MATTERS**: Operators raise verbosity with `PAIRING_LOG_LEVEL=trace`
/// when debugging a relay.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Blank values not falling back to the build default
/// - Case-sensitive parsing
/// - Typos silently accepted
#[test]
fn given_level_values_when_resolved_then_parse_or_fail() {
    #[cfg(debug_assertions)]
    let default = LevelFilter::Debug;
    #[cfg(not(debug_assertions))]
    let default = LevelFilter::Info;

    assert_eq!(resolve_level(None).expect("default"), default);
    assert_eq!(resolve_level(Some("  ")).expect("blank"), default);
    assert_eq!(resolve_level(Some("TRACE")).expect("upper"), LevelFilter::Trace);
    assert_eq!(resolve_level(Some("warn")).expect("lower"), LevelFilter::Warn);

    let err = resolve_level(Some("chatty")).expect_err("unknown level");
    assert!(format!("{err:?}").contains("Settings"));
}
