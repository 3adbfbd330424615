use crate::connection::manager::ConnectionManager;
use crate::connection::state::RoleState;
use crate::protocol::MessageTag;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Origin,
    Target,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Origin => write!(f, "origin"),
            Role::Target => write!(f, "target"),
        }
    }
}

/// Outcome of applying one inbound message to the role state.
pub struct Transition<O, F> {
    /// Message to send back over the same channel.
    pub reply: Option<O>,
    /// Work to run after the state is released.
    pub followup: Option<F>,
}

impl<O, F> Transition<O, F> {
    pub fn none() -> Self {
        Self {
            reply: None,
            followup: None,
        }
    }

    pub fn reply(message: O) -> Self {
        Self {
            reply: Some(message),
            followup: None,
        }
    }

    pub fn followup(followup: F) -> Self {
        Self {
            reply: None,
            followup: Some(followup),
        }
    }
}

impl<O, F> Default for Transition<O, F> {
    fn default() -> Self {
        Self::none()
    }
}

/// Role-specific half of a pairing client.
pub trait RoleHandler: Send + Sync + Sized + 'static {
    type Inbound: DeserializeOwned + MessageTag + fmt::Debug + Send;
    type Outbound: Serialize + MessageTag + fmt::Debug + Send + 'static;
    type State: RoleState;
    type Followup: Send;

    const ROLE: Role;

    fn connection(&self) -> &ConnectionManager<Self>;

    /// Apply `message` to `state`.
    ///
    /// Runs while the state is locked: it must not call back into the
    /// connection manager. Anything that does goes into the follow-up.
    fn handle_message(
        &self,
        message: Self::Inbound,
        state: &mut Self::State,
    ) -> Transition<Self::Outbound, Self::Followup>;

    fn follow_up(self: &Arc<Self>, followup: Self::Followup);

    /// Called on every cleanup, before the state is reset.
    fn on_cleanup(&self) {}
}
