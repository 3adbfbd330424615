/// Application close codes the relay uses when it refuses or ends a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCloseCode {
    InvalidMessage,
    Unauthorized,
    Forbidden,
    PairingNotFound,
    NoConnectionToConnectTo,
    /// Any standard or unrecognised code.
    Other(u16),
}

impl RelayCloseCode {
    pub const INVALID_MESSAGE: u16 = 4000;
    pub const UNAUTHORIZED: u16 = 4001;
    pub const FORBIDDEN: u16 = 4003;
    pub const PAIRING_NOT_FOUND: u16 = 4004;
    pub const NO_CONNECTION_TO_CONNECT_TO: u16 = 4005;

    pub fn code(self) -> u16 {
        match self {
            RelayCloseCode::InvalidMessage => Self::INVALID_MESSAGE,
            RelayCloseCode::Unauthorized => Self::UNAUTHORIZED,
            RelayCloseCode::Forbidden => Self::FORBIDDEN,
            RelayCloseCode::PairingNotFound => Self::PAIRING_NOT_FOUND,
            RelayCloseCode::NoConnectionToConnectTo => Self::NO_CONNECTION_TO_CONNECT_TO,
            RelayCloseCode::Other(code) => code,
        }
    }

    /// The relay refused the pairing itself; reconnecting with the same
    /// parameters will not help without user action.
    pub fn is_rejection(self) -> bool {
        !matches!(self, RelayCloseCode::Other(_))
    }
}

impl From<u16> for RelayCloseCode {
    fn from(code: u16) -> Self {
        match code {
            Self::INVALID_MESSAGE => RelayCloseCode::InvalidMessage,
            Self::UNAUTHORIZED => RelayCloseCode::Unauthorized,
            Self::FORBIDDEN => RelayCloseCode::Forbidden,
            Self::PAIRING_NOT_FOUND => RelayCloseCode::PairingNotFound,
            Self::NO_CONNECTION_TO_CONNECT_TO => RelayCloseCode::NoConnectionToConnectTo,
            other => RelayCloseCode::Other(other),
        }
    }
}
