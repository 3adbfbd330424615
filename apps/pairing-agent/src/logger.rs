//! Logging for the pairing agent.
//!
//! Colored stdout plus a plain log file, installed once per process. Socket
//! internals from tungstenite are capped at info so debug runs stay readable.

use crate::error::AgentError;

use common::ErrorLocation;

use std::io::stdout;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

/// Tracks if logger initialization was already attempted.
static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

const LOG_FILE_NAME: &str = "pairing-agent.log";

/// Message logged when logger is successfully initialized.
const LOGGER_INITIALIZED_MESSAGE_PREFIX: &str = "Logger initialized with level: ";

/// Warning message when logger is called multiple times.
const LOGGER_ALREADY_INITIALIZED_MESSAGE: &str = "Logger already initialized";

#[cfg(debug_assertions)]
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Environment variable overriding the log level (`trace` .. `error`, `off`).
pub const ENV_LOG_LEVEL: &str = "PAIRING_LOG_LEVEL";

const NOISY_TARGETS: [&str; 2] = ["tokio_tungstenite", "tungstenite"];

/// Level to log at: `requested` if given, else the build default.
pub fn resolve_level(requested: Option<&str>) -> Result<LevelFilter, AgentError> {
    match requested.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(DEFAULT_LOG_LEVEL),
        Some(raw) => raw.parse().map_err(|_| AgentError::Settings {
            message: format!("Unknown log level '{raw}'"),
            location: ErrorLocation::caller(),
        }),
    }
}

/// Initialize the logger with colored stdout and a plain `pairing-agent.log`.
///
/// Safe to call more than once: later calls log a warning and return Ok.
///
/// # Errors
///
/// Returns [`AgentError::Agent`] if the log file cannot be created or a global
/// logger is already installed by someone else.
pub fn initialize(log_dir: &Path, level: LevelFilter) -> Result<(), AgentError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("{LOGGER_ALREADY_INITIALIZED_MESSAGE}");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = initialize_internal(log_dir, level);
        if result.is_ok() {
            info!(
                "{LOGGER_INITIALIZED_MESSAGE_PREFIX}{level:?} ({})",
                log_dir.join(LOG_FILE_NAME).display()
            );
        }
    });

    result
}

#[track_caller]
fn initialize_internal(log_dir: &Path, level: LevelFilter) -> Result<(), AgentError> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);

    let color_configuration = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let base_dispatch = NOISY_TARGETS.iter().fold(
        Dispatch::new().level(level),
        |dispatch, target| dispatch.level_for(*target, level.min(LevelFilter::Info)),
    );

    let stdout_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = color_configuration.color(record.level()),
                message = message,
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0),
            ))
        })
        .chain(stdout());

    let file_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                message = message,
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0)
            ))
        })
        .chain(
            fern::log_file(&log_file_path).map_err(|e| AgentError::Agent {
                message: format!("Failed to create log file: {e}"),
                location: ErrorLocation::caller(),
            })?,
        );

    base_dispatch
        .chain(stdout_dispatch)
        .chain(file_dispatch)
        .apply()
        .map_err(|e| AgentError::Agent {
            message: format!("Failed to initialize logger: {e}"),
            location: ErrorLocation::caller(),
        })?;

    Ok(())
}
