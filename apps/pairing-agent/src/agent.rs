//! Runs one pairing role until shutdown.

use crate::error::AgentError;
use crate::settings::{AgentRole, AgentSettings};
use crate::signer::StaticSigner;

use pairing_core::config::PairingConfig;
use pairing_core::connection::RoleState;
use pairing_core::origin::PairingSuccessCallback;
use pairing_core::registry::PairingClients;
use pairing_core::session::{InMemorySessionStore, SessionStore};

use common::ErrorLocation;

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::watch;

/// Start the role described by `settings` and keep it running until
/// `shutdown` completes. Both clients are disconnected before returning.
pub async fn run(
    config: &PairingConfig,
    settings: AgentSettings,
    shutdown: impl Future<Output = ()>,
) -> Result<(), AgentError> {
    let store = match settings.session.clone() {
        Some(session) => InMemorySessionStore::with_session(session),
        None => InMemorySessionStore::new(),
    };
    let sessions: Arc<dyn SessionStore> = Arc::new(store);
    let clients = PairingClients::new(config, sessions)?;

    info!("Relay: {}", config.relay.url);

    let watchers = match &settings.role {
        AgentRole::Origin { session_hint } => {
            let origin = clients.origin();
            let watcher = tokio::spawn(log_states("origin", origin.subscribe()));
            let on_success: PairingSuccessCallback =
                Box::new(|| info!("Pairing complete, session stored"));
            origin.initiate_pairing(session_hint.clone(), Some(on_success));

            let pairing = match origin.wait_for_pairing().await {
                Ok(pairing) => pairing,
                Err(e) => {
                    watcher.abort();
                    clients.disconnect_all();
                    return Err(e.into());
                }
            };
            info!("Pairing code: {} (pairing {})", pairing.code, pairing.id);
            vec![watcher]
        }
        AgentRole::Target { code, pairing_id } => {
            let target = clients.target();
            target.set_signer(Arc::new(StaticSigner::new(settings.static_signature.clone())));
            let watcher = tokio::spawn(log_states("target", target.subscribe()));
            target.join_pairing(code.clone(), pairing_id.clone());
            vec![watcher]
        }
        AgentRole::Resume => {
            if settings.session.is_none() {
                return Err(AgentError::Settings {
                    message: "Resuming needs a seeded session".to_string(),
                    location: ErrorLocation::caller(),
                });
            }
            let target = clients.target();
            target.set_signer(Arc::new(StaticSigner::new(settings.static_signature.clone())));
            let watchers = vec![
                tokio::spawn(log_states("origin", clients.origin().subscribe())),
                tokio::spawn(log_states("target", target.subscribe())),
            ];
            clients.reconnect_from_session();
            watchers
        }
    };

    shutdown.await;
    info!("Shutting down");

    clients.disconnect_all();
    for watcher in watchers {
        watcher.abort();
    }
    Ok(())
}

/// Resolves on Ctrl-C. Logs and resolves anyway if the signal cannot be installed.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
    }
}

async fn log_states<S: RoleState + Debug>(role: &'static str, mut states: watch::Receiver<S>) {
    while states.changed().await.is_ok() {
        let state = states.borrow_and_update().clone();
        let base = state.base();
        info!(
            "{role} status {:?}, partner {}",
            base.status,
            base.partner_device_name.as_deref().unwrap_or("-")
        );
    }
}
