use pairing_agent::agent::{ctrl_c, run};
use pairing_agent::error::AgentError;
use pairing_agent::logger::{ENV_LOG_LEVEL, initialize as LoggerInitialize, resolve_level};
use pairing_agent::settings::AgentSettings;

use pairing_core::config::PairingConfig;

use common::ErrorLocation;

use std::env;
use std::fs::create_dir_all;
use std::process::ExitCode;

use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = dotenvy::dotenv() {
        // A missing .env is the normal case.
        if !e.not_found() {
            eprintln!("Failed to read .env: {e}");
        }
    }

    match start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn start() -> Result<(), AgentError> {
    let config_dir = PairingConfig::default_dir()?;
    create_dir_all(&config_dir).map_err(|e| AgentError::Agent {
        message: format!("Failed to create config directory: {e}"),
        location: ErrorLocation::caller(),
    })?;

    // Initialize logger FIRST
    let level = resolve_level(env::var(ENV_LOG_LEVEL).ok().as_deref())?;
    LoggerInitialize(&config_dir, level)?;

    info!("Pairing agent starting");
    info!("Config directory: {}", config_dir.display());

    let mut config = PairingConfig::load(&config_dir)?;
    config.apply_env_overrides()?;

    let settings = AgentSettings::from_env()?;
    info!("Role: {:?}", settings.role);

    run(&config, settings, ctrl_c()).await
}
