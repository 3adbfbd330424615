//! Origin role: the device that asks for signatures.
//!
//! The origin initiates a pairing and shows the relay-issued code to the user.
//! Once authenticated it resumes on a session channel kept alive with periodic
//! pings, and issues signature requests that complete when the target answers
//! (or the channel goes away).

mod pending;

pub use pending::{PendingRequests, SignatureResult};

use crate::connection::{
    ClientOptions, ConnectParams, ConnectionManager, PairingState, PairingStatus, Role,
    RoleHandler, RoleState, Transition,
};
use crate::error::connection::ConnectionError;
use crate::error::signature::SignatureError;
use crate::protocol::{HexBytes, OriginInbound, OriginOutbound, SdkToken};
use crate::session::{Session, SessionKind, SessionStore};

use common::{ErrorLocation, RedactedToken};

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Weak};

use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::watch;
use uuid::Uuid;

/// Invoked once after the relay hands over the paired session.
pub type PairingSuccessCallback = Box<dyn FnOnce() + Send + 'static>;

/// Identifiers of the pairing being set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingInfo {
    pub id: String,
    pub code: String,
}

/// Observable origin state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginPairingState {
    pub base: PairingState,
    pub pairing: Option<PairingInfo>,
    pub pending_signature_requests: usize,
}

impl RoleState for OriginPairingState {
    fn base(&self) -> &PairingState {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PairingState {
        &mut self.base
    }
}

/// Handle to the origin pairing client. Cheap to clone.
#[derive(Clone)]
pub struct OriginPairingClient {
    inner: Arc<OriginInner>,
}

pub(crate) enum OriginFollowup {
    Authenticated {
        session: Session,
        sdk_token: Option<SdkToken>,
    },
}

struct OriginInner {
    options: ClientOptions,
    sessions: Arc<dyn SessionStore>,
    connection: ConnectionManager<OriginInner>,
    pending: PendingRequests,
    missed_pongs: AtomicU32,
    on_success: Mutex<Option<PairingSuccessCallback>>,
}

impl OriginPairingClient {
    pub fn new(options: ClientOptions, sessions: Arc<dyn SessionStore>) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<OriginInner>| OriginInner {
            connection: ConnectionManager::new(&options, weak.clone()),
            options,
            sessions,
            pending: PendingRequests::new(),
            missed_pongs: AtomicU32::new(0),
            on_success: Mutex::new(None),
        });

        Self { inner }
    }

    /// Ask the relay for a new pairing.
    ///
    /// The code shows up in [`state`](Self::state) once the relay answers;
    /// [`wait_for_pairing`](Self::wait_for_pairing) waits for it. `on_success`
    /// runs once the target has joined and the session was stored.
    ///
    /// No pings are sent on this channel; keepalive starts with the resumed
    /// channel after `authenticated`. Ignored while a channel is open.
    pub fn initiate_pairing(
        &self,
        session_hint: Option<String>,
        on_success: Option<PairingSuccessCallback>,
    ) {
        let token = self.inner.sessions.current().map(|session| session.token);
        let params = ConnectParams::initiate(session_hint).with_auth_token(token);

        if !self.inner.connection.connect(params) {
            return;
        }

        if let Some(callback) = on_success {
            *self
                .inner
                .on_success
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(callback);
        }
    }

    /// Wait until the relay has issued the pairing code.
    ///
    /// Call after [`initiate_pairing`](Self::initiate_pairing).
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::Timeout`] if no code arrives within `timeouts.pairing_code`
    /// - [`ConnectionError::Closed`] if the channel ends first
    pub async fn wait_for_pairing(&self) -> Result<PairingInfo, ConnectionError> {
        let mut receiver = self.subscribe();
        let deadline = self.inner.options.timeouts.pairing_code;

        let settled = tokio::time::timeout(
            deadline,
            receiver.wait_for(|state| {
                state.pairing.is_some()
                    || matches!(
                        state.base.status,
                        PairingStatus::Idle | PairingStatus::RetryError
                    )
            }),
        )
        .await;

        match settled {
            Ok(Ok(state)) => state.pairing.clone().ok_or_else(|| ConnectionError::Closed {
                message: format!(
                    "Channel ended in {:?} before a code was issued",
                    state.base.status
                ),
                location: ErrorLocation::caller(),
            }),
            Ok(Err(_)) => Err(ConnectionError::Closed {
                message: "Origin client dropped".to_string(),
                location: ErrorLocation::caller(),
            }),
            Err(_) => Err(ConnectionError::Timeout {
                message: format!("No pairing code within {deadline:?}"),
                location: ErrorLocation::caller(),
            }),
        }
    }

    /// Reopen the channel for an existing pairing.
    ///
    /// Requires a `distant-webauthn` session; otherwise logs and does nothing.
    /// An open channel is closed first and reopened after `reconnect_delay`.
    pub fn reconnect(&self) {
        self.inner.reconnect();
    }

    /// Ask the paired target to sign `request`.
    ///
    /// # Errors
    ///
    /// - [`SignatureError::NotConnected`] if no channel is open
    /// - [`SignatureError::Rejected`] if the target declined
    /// - [`SignatureError::ConnectionLost`] if the channel was cleaned up first
    /// - [`SignatureError::Timeout`] after `timeouts.signature`
    pub async fn send_signature_request(
        &self,
        request: impl Into<HexBytes>,
        context: Option<Value>,
    ) -> Result<HexBytes, SignatureError> {
        let inner = &self.inner;
        let id = Uuid::new_v4().to_string();
        let completion = inner.pending.insert(id.clone());
        let _guard = PendingGuard { inner, id: &id };
        inner.publish_pending_count();

        let message = OriginOutbound::SignatureRequest {
            id: id.clone(),
            request: request.into(),
            context,
        };
        if !inner.connection.send(message) {
            return Err(SignatureError::NotConnected {
                message: "Origin has no open channel".to_string(),
                location: ErrorLocation::caller(),
            });
        }

        debug!("Signature request {id} sent");
        let deadline = inner.options.timeouts.signature;
        match tokio::time::timeout(deadline, completion).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SignatureError::connection_lost(
                "Signature request dropped without completion",
            )),
            Err(_) => {
                warn!("Signature request {id} timed out after {deadline:?}");
                Err(SignatureError::Timeout {
                    message: format!("No signature within {deadline:?}"),
                    location: ErrorLocation::caller(),
                })
            }
        }
    }

    /// Number of signature requests awaiting an answer.
    pub fn pending_signature_requests(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn disconnect(&self) {
        self.inner.connection.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_connected()
    }

    pub fn subscribe(&self) -> watch::Receiver<OriginPairingState> {
        self.inner.connection.subscribe()
    }

    pub fn state(&self) -> OriginPairingState {
        self.inner.connection.state()
    }
}

impl OriginInner {
    fn reconnect(self: &Arc<Self>) {
        let Some(token) = self.distant_session_token() else {
            return;
        };

        if !self.connection.is_connected() {
            self.resume(token);
            return;
        }

        debug!("Origin closing current channel before reconnecting");
        self.connection.disconnect();

        let inner = Arc::downgrade(self);
        let delay = self.options.timeouts.reconnect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = inner.upgrade() else {
                return;
            };
            if let Some(token) = inner.distant_session_token() {
                inner.resume(token);
            }
        });
    }

    fn resume(self: &Arc<Self>, token: RedactedToken) {
        if self.connection.connect(ConnectParams::resume(token)) {
            self.start_keepalive();
        }
    }

    fn distant_session_token(&self) -> Option<RedactedToken> {
        match self.sessions.current() {
            Some(session) if session.kind == SessionKind::DistantWebauthn => Some(session.token),
            Some(session) => {
                warn!(
                    "Origin reconnect needs a distant-webauthn session, found {:?}",
                    session.kind
                );
                None
            }
            None => {
                warn!("No session found, skipping origin reconnection");
                None
            }
        }
    }

    fn start_keepalive(self: &Arc<Self>) {
        self.missed_pongs.store(0, Ordering::SeqCst);

        let inner = Arc::downgrade(self);
        let period = self.options.keepalive.interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                if !inner.keepalive_tick() {
                    break;
                }
            }
        });

        self.connection.start_keepalive(task);
    }

    /// One keepalive period. Returns `false` once the channel was failed.
    fn keepalive_tick(&self) -> bool {
        let missed = self.missed_pongs.load(Ordering::SeqCst);
        let tolerated = self.options.keepalive.max_missed_pongs;

        if missed > tolerated {
            self.connection
                .fail(&format!("{missed} pings left unanswered"));
            return false;
        }

        if self.connection.send(OriginOutbound::Ping) {
            self.missed_pongs.fetch_add(1, Ordering::SeqCst);
        }
        true
    }

    fn publish_pending_count(&self) {
        self.connection.update_state(|state| {
            state.pending_signature_requests = self.pending.len();
        });
    }
}

impl RoleHandler for OriginInner {
    type Inbound = OriginInbound;
    type Outbound = OriginOutbound;
    type State = OriginPairingState;
    type Followup = OriginFollowup;

    const ROLE: Role = Role::Origin;

    fn connection(&self) -> &ConnectionManager<Self> {
        &self.connection
    }

    fn handle_message(
        &self,
        message: OriginInbound,
        state: &mut OriginPairingState,
    ) -> Transition<OriginOutbound, OriginFollowup> {
        match message {
            OriginInbound::PairingInitiated {
                pairing_id,
                pairing_code,
            } => {
                info!("Pairing {pairing_id} initiated");
                state.base.transition(PairingStatus::Connecting);
                state.pairing = Some(PairingInfo {
                    id: pairing_id,
                    code: pairing_code,
                });
            }

            OriginInbound::PartnerConnected {
                pairing_id,
                device_name,
            } => {
                info!("Partner {device_name} connected to pairing {pairing_id}");
                state.base.mark_paired(Some(device_name));
            }

            OriginInbound::SignatureResponse { id, signature, .. } => {
                if self.pending.resolve(&id, signature) {
                    debug!("Signature request {id} resolved");
                    state.pending_signature_requests = self.pending.len();
                } else {
                    debug!("Ignoring response for unknown signature request {id}");
                }
            }

            OriginInbound::SignatureReject { id, reason, .. } => {
                let rejected = SignatureError::Rejected {
                    reason: reason.clone(),
                    location: ErrorLocation::caller(),
                };
                if self.pending.reject(&id, rejected) {
                    info!("Signature request {id} rejected by partner: {reason}");
                    state.pending_signature_requests = self.pending.len();
                } else {
                    debug!("Ignoring rejection for unknown signature request {id}");
                }
            }

            OriginInbound::Pong { .. } => {
                self.missed_pongs.store(0, Ordering::SeqCst);
                state.base.mark_paired(None);
            }

            OriginInbound::Authenticated {
                token,
                wallet,
                sdk_token,
            } => {
                state.base.mark_paired(None);
                let kind = wallet.kind.unwrap_or(SessionKind::DistantWebauthn);
                let session = Session::new(wallet.address, token, kind);
                return Transition::followup(OriginFollowup::Authenticated {
                    session,
                    sdk_token,
                });
            }
        }

        Transition::none()
    }

    fn follow_up(self: &Arc<Self>, followup: OriginFollowup) {
        match followup {
            OriginFollowup::Authenticated { session, sdk_token } => {
                info!("Pairing authenticated for wallet {}", session.address);
                self.sessions.store_authenticated(session, sdk_token);
                self.reconnect();

                let callback = self
                    .on_success
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .take();
                if let Some(callback) = callback {
                    callback();
                }
            }
        }
    }

    fn on_cleanup(&self) {
        self.missed_pongs.store(0, Ordering::SeqCst);

        let rejected = self
            .pending
            .drain_with(|| SignatureError::connection_lost("Pairing channel closed"));
        if rejected > 0 {
            warn!("Rejected {rejected} pending signature requests on cleanup");
        }
    }
}

/// Removes a request from the arena when its caller stops waiting.
struct PendingGuard<'a> {
    inner: &'a OriginInner,
    id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.inner.pending.remove(self.id) {
            debug!("Signature request {} abandoned", self.id);
        }
        self.inner.publish_pending_count();
    }
}
