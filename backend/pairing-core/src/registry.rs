//! Process-wide access to the two pairing clients.
//!
//! Each client is created on first use and lives as long as the registry.

use crate::config::PairingConfig;
use crate::connection::ClientOptions;
use crate::error::config::ConfigError;
use crate::origin::OriginPairingClient;
use crate::session::{SessionKind, SessionStore};
use crate::target::TargetPairingClient;

use std::sync::Arc;

use log::{debug, info};
use once_cell::sync::OnceCell;

pub struct PairingClients {
    options: ClientOptions,
    sessions: Arc<dyn SessionStore>,
    origin: OnceCell<OriginPairingClient>,
    target: OnceCell<TargetPairingClient>,
}

impl PairingClients {
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if `config` does not validate.
    pub fn new(
        config: &PairingConfig,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            options: ClientOptions::try_from(config)?,
            sessions,
            origin: OnceCell::new(),
            target: OnceCell::new(),
        })
    }

    pub fn origin(&self) -> &OriginPairingClient {
        self.origin.get_or_init(|| {
            debug!("Creating origin pairing client");
            OriginPairingClient::new(self.options.clone(), Arc::clone(&self.sessions))
        })
    }

    pub fn target(&self) -> &TargetPairingClient {
        self.target.get_or_init(|| {
            debug!("Creating target pairing client");
            TargetPairingClient::new(self.options.clone(), Arc::clone(&self.sessions))
        })
    }

    /// Resume whichever role the stored session allows.
    ///
    /// A local `webauthn` session resumes the target, a `distant-webauthn`
    /// session the origin. Anything else does nothing.
    pub fn reconnect_from_session(&self) {
        match self.sessions.current().map(|session| session.kind) {
            Some(SessionKind::Webauthn) => {
                info!("Resuming target pairing from stored session");
                self.target().reconnect();
            }
            Some(SessionKind::DistantWebauthn) => {
                info!("Resuming origin pairing from stored session");
                self.origin().reconnect();
            }
            Some(kind) => debug!("Session kind {kind:?} has no pairing to resume"),
            None => debug!("No stored session, nothing to resume"),
        }
    }

    /// Close both channels if they were ever created.
    pub fn disconnect_all(&self) {
        if let Some(origin) = self.origin.get() {
            origin.disconnect();
        }
        if let Some(target) = self.target.get() {
            target.disconnect();
        }
    }
}
