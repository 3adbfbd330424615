pub mod config;
pub mod connection;
pub mod protocol;
pub mod signature;

pub use config::ConfigError;
pub use connection::ConnectionError;
pub use protocol::ProtocolError;
pub use signature::SignatureError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
