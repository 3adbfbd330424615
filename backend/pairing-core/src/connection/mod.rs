//! Connection lifecycle shared by both pairing roles.
//!
//! A [`ConnectionManager`] owns at most one relay channel at a time and the
//! observable role state. Role clients plug in through [`RoleHandler`]: the
//! manager decodes inbound frames and hands them to the role as a state
//! transition, then sends any reply and runs follow-ups once the state is
//! released again.
//!
//! # Architecture
//!
//! - One background task per channel owns the socket (open with retry, read,
//!   write). Callers talk to it through an unbounded outbound queue.
//! - Channels carry a generation number. A task only tears down the channel
//!   of its own generation, so a late close from a replaced channel never
//!   resets a newer one.
//! - State is published through a `tokio::sync::watch` channel; observers
//!   subscribe and never mutate it.

mod channel;
mod handler;
mod manager;
mod params;
mod state;

pub use handler::{Role, RoleHandler, Transition};
pub use manager::{ClientOptions, ConnectionManager};
pub use params::{ConnectAction, ConnectParams};
pub use state::{PairingState, PairingStatus, RoleState};
