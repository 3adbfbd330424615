//! Target role: the device holding the credential.
//!
//! The target joins a pairing with the code shown on the origin, answers
//! relay pings and receives signature requests. Requests are tracked in the
//! observable state until a decision is sent back, either by an installed
//! [`SignatureRequestHandler`] or by calling
//! [`send_signature_response`](TargetPairingClient::send_signature_response).

mod signer;

pub use signer::{SignatureOutcome, SignatureRequestHandler};

use crate::connection::{
    ClientOptions, ConnectParams, ConnectionManager, PairingState, Role, RoleHandler, RoleState,
    Transition,
};
use crate::protocol::{HexBytes, TargetInbound, TargetOutbound};
use crate::session::{SessionKind, SessionStore};

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, Weak};

use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::watch;

/// A signature request awaiting a decision.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSignature {
    pub pairing_id: String,
    pub id: String,
    pub request: HexBytes,
    pub context: Option<Value>,
    /// Device name of the requesting origin, when the relay supplies it.
    pub from: Option<String>,
}

/// Observable target state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetPairingState {
    pub base: PairingState,
    pub pending_signature_requests: BTreeMap<String, PendingSignature>,
}

impl RoleState for TargetPairingState {
    fn base(&self) -> &PairingState {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PairingState {
        &mut self.base
    }
}

/// Handle to the target pairing client. Cheap to clone.
#[derive(Clone)]
pub struct TargetPairingClient {
    inner: Arc<TargetInner>,
}

pub(crate) enum TargetFollowup {
    HandOff(PendingSignature),
}

struct TargetInner {
    sessions: Arc<dyn SessionStore>,
    connection: ConnectionManager<TargetInner>,
    signer: RwLock<Option<Arc<dyn SignatureRequestHandler>>>,
}

impl TargetPairingClient {
    pub fn new(options: ClientOptions, sessions: Arc<dyn SessionStore>) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<TargetInner>| TargetInner {
            connection: ConnectionManager::new(&options, weak.clone()),
            sessions,
            signer: RwLock::new(None),
        });

        Self { inner }
    }

    /// Join the pairing identified by `pairing_code` (and optionally its id).
    pub fn join_pairing(&self, pairing_code: impl Into<String>, pairing_id: Option<String>) {
        let token = self.inner.sessions.current().map(|session| session.token);
        if token.is_none() {
            debug!("Joining pairing without a local session token");
        }

        self.inner
            .connection
            .connect(ConnectParams::join(pairing_code, pairing_id).with_auth_token(token));
    }

    /// Reopen the channel for an existing pairing.
    ///
    /// Requires a local `webauthn` session; otherwise logs and does nothing.
    pub fn reconnect(&self) {
        match self.inner.sessions.current() {
            Some(session) if session.kind == SessionKind::Webauthn => {
                self.inner
                    .connection
                    .connect(ConnectParams::resume(session.token));
            }
            Some(session) => warn!(
                "Target reconnect needs a webauthn session, found {:?}",
                session.kind
            ),
            None => warn!("No session found, skipping target reconnection"),
        }
    }

    /// Install the handler that signs incoming requests automatically.
    pub fn set_signer(&self, signer: Arc<dyn SignatureRequestHandler>) {
        *self
            .inner
            .signer
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(signer);
    }

    /// Answer the pending request `id`.
    ///
    /// Returns whether an answer was queued. Unknown ids are logged and
    /// ignored; without a channel the request stays pending.
    pub fn send_signature_response(&self, id: &str, outcome: SignatureOutcome) -> bool {
        self.inner.respond(id, outcome)
    }

    pub fn pending_signature_requests(&self) -> Vec<PendingSignature> {
        self.inner
            .connection
            .state()
            .pending_signature_requests
            .into_values()
            .collect()
    }

    pub fn disconnect(&self) {
        self.inner.connection.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_connected()
    }

    pub fn subscribe(&self) -> watch::Receiver<TargetPairingState> {
        self.inner.connection.subscribe()
    }

    pub fn state(&self) -> TargetPairingState {
        self.inner.connection.state()
    }
}

impl TargetInner {
    fn respond(&self, id: &str, outcome: SignatureOutcome) -> bool {
        if !self.connection.is_connected() {
            warn!("Target not connected, keeping signature request {id} pending");
            return false;
        }

        let Some(pending) = self
            .connection
            .update_state(|state| state.pending_signature_requests.remove(id))
        else {
            warn!("No pending signature request {id}");
            return false;
        };

        let PendingSignature { pairing_id, id, .. } = pending;
        let message = match outcome {
            SignatureOutcome::Signed(signature) => {
                info!("Sending signature for request {id}");
                TargetOutbound::SignatureResponse {
                    pairing_id,
                    id,
                    signature,
                }
            }
            SignatureOutcome::Rejected(reason) => {
                info!("Rejecting signature request {id}: {reason}");
                TargetOutbound::SignatureReject {
                    pairing_id,
                    id,
                    reason,
                }
            }
        };

        self.connection.send(message)
    }

    fn signer(&self) -> Option<Arc<dyn SignatureRequestHandler>> {
        self.signer
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl RoleHandler for TargetInner {
    type Inbound = TargetInbound;
    type Outbound = TargetOutbound;
    type State = TargetPairingState;
    type Followup = TargetFollowup;

    const ROLE: Role = Role::Target;

    fn connection(&self) -> &ConnectionManager<Self> {
        &self.connection
    }

    fn handle_message(
        &self,
        message: TargetInbound,
        state: &mut TargetPairingState,
    ) -> Transition<TargetOutbound, TargetFollowup> {
        match message {
            TargetInbound::Ping { pairing_id } => {
                state.base.mark_paired(None);
                Transition::reply(TargetOutbound::Pong { pairing_id })
            }

            TargetInbound::PartnerConnected {
                pairing_id,
                device_name,
            } => {
                info!("Partner {device_name} connected to pairing {pairing_id}");
                state.base.mark_paired(Some(device_name));
                Transition::none()
            }

            TargetInbound::SignatureRequest {
                pairing_id,
                id,
                request,
                context,
                partner_device_name,
            } => {
                state.base.mark_paired(None);

                if state.pending_signature_requests.contains_key(&id) {
                    debug!("Signature request {id} re-delivered, already pending");
                    return Transition::none();
                }

                info!("Signature request {id} received on pairing {pairing_id}");
                let pending = PendingSignature {
                    pairing_id,
                    id: id.clone(),
                    request,
                    context,
                    from: partner_device_name,
                };
                state
                    .pending_signature_requests
                    .insert(id, pending.clone());

                Transition::followup(TargetFollowup::HandOff(pending))
            }
        }
    }

    fn follow_up(self: &Arc<Self>, followup: TargetFollowup) {
        match followup {
            TargetFollowup::HandOff(pending) => {
                let Some(signer) = self.signer() else {
                    debug!("No signer installed, request {} awaits a manual decision", pending.id);
                    return;
                };

                let inner = Arc::downgrade(self);
                tokio::spawn(async move {
                    let outcome = SignatureOutcome::from(signer.request_signature(&pending).await);
                    if let Some(inner) = inner.upgrade() {
                        inner.respond(&pending.id, outcome);
                    }
                });
            }
        }
    }
}
