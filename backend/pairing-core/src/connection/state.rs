use log::{debug, warn};
use serde::Serialize;

/// Connection status surfaced to the UI layer.
///
/// `RetryError` is the only status that should offer the user a retry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairingStatus {
    #[default]
    Idle,
    Connecting,
    Paired,
    RetryError,
}

impl PairingStatus {
    /// Whether `self -> next` is a legal move within one connection attempt.
    ///
    /// `Connecting` and `Idle` are always reachable (new attempt, reset).
    /// `Paired` only follows `Connecting` or itself; `RetryError` only follows
    /// an attempt that was in flight.
    pub fn allows(self, next: PairingStatus) -> bool {
        use PairingStatus::*;

        match (self, next) {
            (_, Connecting) | (_, Idle) => true,
            (Connecting | Paired, Paired) => true,
            (Connecting | Paired | RetryError, RetryError) => true,
            _ => false,
        }
    }
}

/// State common to both roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairingState {
    pub status: PairingStatus,
    pub partner_device_name: Option<String>,
}

impl PairingState {
    /// Move to `next` if the transition is legal. Returns whether it applied.
    pub fn transition(&mut self, next: PairingStatus) -> bool {
        if !self.status.allows(next) {
            warn!(
                "Ignoring illegal status transition {:?} -> {:?}",
                self.status, next
            );
            return false;
        }

        if self.status != next {
            debug!("Pairing status {:?} -> {:?}", self.status, next);
        }
        self.status = next;
        true
    }

    /// Mark the partner as present.
    pub fn mark_paired(&mut self, partner_device_name: Option<String>) {
        if self.transition(PairingStatus::Paired) && partner_device_name.is_some() {
            self.partner_device_name = partner_device_name;
        }
    }
}

/// Role state built on top of [`PairingState`].
///
/// `Default` must be the initial (idle) state; cleanup resets to it.
pub trait RoleState: Clone + Default + Send + Sync + 'static {
    fn base(&self) -> &PairingState;
    fn base_mut(&mut self) -> &mut PairingState;

    fn status(&self) -> PairingStatus {
        self.base().status
    }
}
