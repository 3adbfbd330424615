// Unit tests for pairing config
// Defaults, TOML persistence, validation and env overrides

use crate::config::{
    ENV_KEEPALIVE_INTERVAL, ENV_MAX_MISSED_PONGS, ENV_RECONNECT_DELAY, ENV_RELAY_URL,
    ENV_SIGNATURE_TIMEOUT, PairingConfig,
};
use crate::error::config::ConfigError;

use std::env;
use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;

fn clear_env() {
    // SAFETY: tests touching the environment are #[serial].
    unsafe {
        for variable in [
            ENV_RELAY_URL,
            ENV_KEEPALIVE_INTERVAL,
            ENV_MAX_MISSED_PONGS,
            ENV_SIGNATURE_TIMEOUT,
            ENV_RECONNECT_DELAY,
        ] {
            env::remove_var(variable);
        }
    }
}

fn set_env(variable: &str, value: &str) {
    // SAFETY: tests touching the environment are #[serial].
    unsafe { env::set_var(variable, value) }
}

/// **VALUE**: Verifies the built-in defaults.
///
/// **WHY THIS MATTERS**: A fresh install has no config file; these values drive
/// keepalive, timeouts and the relay address.
///
/// **BUG THIS CATCHES**: Would catch a default drifting (e.g. keepalive in ms instead of s).
#[test]
fn given_no_config_when_default_then_values_match_protocol_constants() {
    let config = PairingConfig::default();

    assert_eq!(config.version, 1);
    assert_eq!(config.relay.url, "ws://127.0.0.1:3030/pairing/ws");
    assert_eq!(config.keepalive.interval, Duration::from_secs(5));
    assert_eq!(config.keepalive.max_missed_pongs, 5);
    assert_eq!(config.timeouts.reconnect_delay, Duration::from_millis(200));
    assert!(config.validate().is_ok());
}

/// **VALUE**: Verifies loading from an empty directory falls back to defaults.
///
/// **WHY THIS MATTERS**: First launch must not fail just because nothing was saved yet.
///
/// **BUG THIS CATCHES**: Would catch `load` returning ReadError for a missing file.
#[test]
fn given_missing_file_when_load_then_returns_defaults() {
    let dir = TempDir::new().expect("temp dir");

    let config = PairingConfig::load(dir.path()).expect("load should fall back");

    assert_eq!(config, PairingConfig::default());
}

/// **VALUE**: Verifies a saved config loads back with humantime durations intact.
///
/// **WHY THIS MATTERS**: Users edit `pairing.toml` by hand with values like `"2s"`.
///
/// **BUG THIS CATCHES**: Would catch duration (de)serialization mismatches.
#[test]
fn given_saved_config_when_load_then_values_survive() {
    let dir = TempDir::new().expect("temp dir");
    let mut config = PairingConfig::default();
    config.relay.url = "wss://relay.example.com/pairing/ws".to_string();
    config.keepalive.interval = Duration::from_millis(1500);
    config.timeouts.signature = Duration::from_secs(45);

    config.save(dir.path()).expect("save");
    let contents = std::fs::read_to_string(dir.path().join("pairing.toml")).expect("file written");
    let loaded = PairingConfig::load(dir.path()).expect("load");

    assert!(contents.contains("1s 500ms"), "durations are written in humantime form");
    assert_eq!(loaded, config);
    assert!(!dir.path().join("pairing.toml.tmp").exists());
}

/// **VALUE**: Verifies a partial file keeps defaults for omitted sections.
///
/// **WHY THIS MATTERS**: Most users only override the relay URL.
///
/// **BUG THIS CATCHES**: Would catch a missing `#[serde(default)]` on a section.
#[test]
fn given_partial_file_when_load_then_missing_fields_default() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(
        dir.path().join("pairing.toml"),
        "[relay]\nurl = \"ws://10.0.0.2:3030/pairing/ws\"\n\n[keepalive]\ninterval = \"2s\"\n",
    )
    .expect("write");

    let config = PairingConfig::load(dir.path()).expect("load");

    assert_eq!(config.relay.url, "ws://10.0.0.2:3030/pairing/ws");
    assert_eq!(config.keepalive.interval, Duration::from_secs(2));
    assert_eq!(config.keepalive.max_missed_pongs, 5);
    assert_eq!(config.timeouts.signature, Duration::from_secs(120));
}

/// **VALUE**: Verifies corrupted TOML is reported, not replaced by defaults.
///
/// **WHY THIS MATTERS**: Silently ignoring a broken file would point the client at the wrong relay.
///
/// **BUG THIS CATCHES**: Would catch parse errors being swallowed.
#[test]
fn given_corrupted_file_when_load_then_returns_parse_error() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("pairing.toml"), "[relay\nurl = ").expect("write");

    let result = PairingConfig::load(dir.path());

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// **VALUE**: Verifies validation rejects values the clients cannot run with.
///
/// **WHY THIS MATTERS**: A zero keepalive interval would spin; an http URL cannot be upgraded.
///
/// **BUG THIS CATCHES**: Would catch missing checks in `validate`.
#[test]
fn given_invalid_values_when_validate_then_returns_validation_error() {
    let mut http_url = PairingConfig::default();
    http_url.relay.url = "http://127.0.0.1:3030".to_string();

    let mut zero_interval = PairingConfig::default();
    zero_interval.keepalive.interval = Duration::ZERO;

    let mut no_pongs = PairingConfig::default();
    no_pongs.keepalive.max_missed_pongs = 0;

    let mut future_version = PairingConfig::default();
    future_version.version = 2;

    for config in [http_url, zero_interval, no_pongs, future_version] {
        assert!(
            matches!(config.validate(), Err(ConfigError::ValidationError { .. })),
            "{config:?} should not validate"
        );
    }
}

/// **VALUE**: Verifies environment variables override loaded values.
///
/// **WHY THIS MATTERS**: Deployments point the agent at a relay without editing files.
///
/// **BUG THIS CATCHES**: Would catch an override being read but not applied.
#[test]
#[serial]
fn given_env_overrides_when_applied_then_replace_values() {
    clear_env();
    set_env(ENV_RELAY_URL, "wss://relay.example.com/ws");
    set_env(ENV_KEEPALIVE_INTERVAL, "750ms");
    set_env(ENV_MAX_MISSED_PONGS, "3");
    set_env(ENV_SIGNATURE_TIMEOUT, "1m");

    let mut config = PairingConfig::default();
    let result = config.apply_env_overrides();
    clear_env();

    result.expect("overrides are valid");
    assert_eq!(config.relay.url, "wss://relay.example.com/ws");
    assert_eq!(config.keepalive.interval, Duration::from_millis(750));
    assert_eq!(config.keepalive.max_missed_pongs, 3);
    assert_eq!(config.timeouts.signature, Duration::from_secs(60));
}

/// **VALUE**: Verifies unparseable overrides name the offending variable.
///
/// **WHY THIS MATTERS**: A typo in a deployment variable must be easy to find.
///
/// **BUG THIS CATCHES**: Would catch bad durations being ignored.
#[test]
#[serial]
fn given_bad_env_duration_when_applied_then_returns_env_error() {
    clear_env();
    set_env(ENV_RECONNECT_DELAY, "soon");

    let mut config = PairingConfig::default();
    let result = config.apply_env_overrides();
    clear_env();

    match result {
        Err(ConfigError::EnvError { variable, .. }) => assert_eq!(variable, ENV_RECONNECT_DELAY),
        other => panic!("Expected EnvError, got {other:?}"),
    }
}
