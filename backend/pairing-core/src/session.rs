//! Local credential/session store consumed by the pairing clients.
//!
//! The clients only read the session to decide whether a (re)connection makes
//! sense and to derive the relay auth token. The single write path is the
//! origin's `authenticated` handler.

use crate::protocol::SdkToken;

use common::RedactedToken;

use std::sync::RwLock;

use log::{debug, info};
use serde::Deserialize;

/// Kind of credential backing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionKind {
    /// Local platform authenticator: this device can act as a target.
    Webauthn,
    /// Credential held by a paired device: this device acts as an origin.
    DistantWebauthn,
    Ecdsa,
    #[serde(other)]
    Other,
}

/// Active wallet session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub address: String,
    pub token: RedactedToken,
    pub kind: SessionKind,
}

impl Session {
    pub fn new(address: impl Into<String>, token: RedactedToken, kind: SessionKind) -> Self {
        Self {
            address: address.into(),
            token,
            kind,
        }
    }
}

/// Access to the session shared with the rest of the application.
pub trait SessionStore: Send + Sync {
    /// Current session, if any.
    fn current(&self) -> Option<Session>;

    /// Persist the session handed over by the relay once a pairing resolves.
    fn store_authenticated(&self, session: Session, sdk_token: Option<SdkToken>);
}

/// Process-local [`SessionStore`].
#[derive(Default)]
pub struct InMemorySessionStore {
    session: RwLock<Option<Session>>,
    sdk_token: RwLock<Option<SdkToken>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
            sdk_token: RwLock::new(None),
        }
    }

    pub fn sdk_token(&self) -> Option<SdkToken> {
        self.sdk_token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        debug!("Clearing stored session");
        *self
            .session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        *self
            .sdk_token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

impl SessionStore for InMemorySessionStore {
    fn current(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn store_authenticated(&self, session: Session, sdk_token: Option<SdkToken>) {
        info!(
            "Storing {:?} session for wallet {}",
            session.kind, session.address
        );
        *self
            .session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session);
        *self
            .sdk_token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = sdk_token;
    }
}
