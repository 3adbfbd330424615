pub mod config;
pub mod connection;
pub mod error;
pub mod origin;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod target;

#[cfg(test)]
mod tests;

pub use config::PairingConfig;
pub use connection::{ClientOptions, PairingState, PairingStatus};
pub use error::CoreError;
pub use origin::{OriginPairingClient, OriginPairingState, PairingInfo};
pub use registry::PairingClients;
pub use session::{InMemorySessionStore, Session, SessionKind, SessionStore};
pub use target::{
    PendingSignature, SignatureOutcome, SignatureRequestHandler, TargetPairingClient,
    TargetPairingState,
};

pub const PAIRING_RELAY_HOSTNAME: &str = "127.0.0.1";
pub const PAIRING_RELAY_PORT: u16 = 3030;
pub const PAIRING_RELAY_PATH: &str = "/pairing/ws";
