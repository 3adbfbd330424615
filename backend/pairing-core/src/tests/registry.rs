use crate::config::PairingConfig;
use crate::connection::PairingStatus;
use crate::registry::PairingClients;
use crate::session::{InMemorySessionStore, Session, SessionKind, SessionStore};

use common::RedactedToken;

use std::sync::Arc;

/// **VALUE**: Verifies the registry hands out one shared client per role.
///
/// **WHY THIS MATTERS**: Two origin clients would open two relay channels for one pairing.
///
/// **BUG THIS CATCHES**: Would catch `origin()` constructing a new client on each call.
#[test]
fn given_registry_when_clients_requested_twice_then_same_instance_is_returned() {
    let clients = PairingClients::new(
        &PairingConfig::default(),
        Arc::new(InMemorySessionStore::new()),
    )
    .expect("default config is valid");

    assert!(std::ptr::eq(clients.origin(), clients.origin()));
    assert!(std::ptr::eq(clients.target(), clients.target()));
}

/// **VALUE**: Verifies an invalid config is refused up front.
///
/// **WHY THIS MATTERS**: Clients are created lazily and cannot report config errors later.
///
/// **BUG THIS CATCHES**: Would catch the registry skipping validation.
#[test]
fn given_invalid_config_when_registry_created_then_returns_error() {
    let mut config = PairingConfig::default();
    config.relay.url = "not a url".to_string();

    let result = PairingClients::new(&config, Arc::new(InMemorySessionStore::new()));

    assert!(result.is_err());
}

/// **VALUE**: Verifies resuming without a usable session opens nothing.
///
/// **WHY THIS MATTERS**: An ECDSA wallet has no pairing; connecting would only
/// produce relay errors.
///
/// **BUG THIS CATCHES**: Would catch reconnect ignoring the session kind.
#[tokio::test]
async fn given_non_pairing_session_when_reconnect_from_session_then_stays_idle() {
    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::with_session(
        Session::new("0xabc", RedactedToken::new("token"), SessionKind::Ecdsa),
    ));
    let clients = PairingClients::new(&PairingConfig::default(), sessions).expect("valid");

    clients.reconnect_from_session();

    assert!(!clients.origin().is_connected());
    assert!(!clients.target().is_connected());
    assert_eq!(clients.origin().state().base.status, PairingStatus::Idle);
}

/// **VALUE**: Verifies role reconnects check the session kind.
///
/// **WHY THIS MATTERS**: Only a distant credential can resume an origin and only
/// a local one a target.
///
/// **BUG THIS CATCHES**: Would catch a target resuming with a distant session.
#[tokio::test]
async fn given_distant_session_when_target_reconnects_then_nothing_opens() {
    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::with_session(
        Session::new("0xabc", RedactedToken::new("token"), SessionKind::DistantWebauthn),
    ));
    let clients = PairingClients::new(&PairingConfig::default(), sessions).expect("valid");

    clients.target().reconnect();

    assert!(!clients.target().is_connected());
    assert_eq!(clients.target().state().base.status, PairingStatus::Idle);
}
