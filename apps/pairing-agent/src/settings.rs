//! Agent settings read from the process environment.
//!
//! | Variable                  | Meaning                                          |
//! |---------------------------|--------------------------------------------------|
//! | `PAIRING_ROLE`            | `origin`, `target` or `resume`                   |
//! | `PAIRING_CODE`            | code to join with (target)                       |
//! | `PAIRING_ID`              | optional pairing id to join (target)             |
//! | `PAIRING_SESSION_HINT`    | optional SSO hint sent on initiate (origin)      |
//! | `PAIRING_SESSION_TOKEN`   | seeds the session store                          |
//! | `PAIRING_SESSION_ADDRESS` | wallet address of the seeded session             |
//! | `PAIRING_SESSION_KIND`    | `webauthn` or `distant-webauthn`                 |
//! | `PAIRING_STATIC_SIGNATURE`| hex signature returned by the static signer      |

use crate::error::AgentError;

use pairing_core::protocol::HexBytes;
use pairing_core::session::{Session, SessionKind};

use common::{ErrorLocation, RedactedToken};

use std::env;

pub const ENV_ROLE: &str = "PAIRING_ROLE";
pub const ENV_CODE: &str = "PAIRING_CODE";
pub const ENV_PAIRING_ID: &str = "PAIRING_ID";
pub const ENV_SESSION_HINT: &str = "PAIRING_SESSION_HINT";
pub const ENV_SESSION_TOKEN: &str = "PAIRING_SESSION_TOKEN";
pub const ENV_SESSION_ADDRESS: &str = "PAIRING_SESSION_ADDRESS";
pub const ENV_SESSION_KIND: &str = "PAIRING_SESSION_KIND";
pub const ENV_STATIC_SIGNATURE: &str = "PAIRING_STATIC_SIGNATURE";

const DEFAULT_STATIC_SIGNATURE: &str = "0x00";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentRole {
    /// Initiate a pairing and print the code.
    Origin { session_hint: Option<String> },
    /// Join the pairing identified by `code`.
    Target {
        code: String,
        pairing_id: Option<String>,
    },
    /// Resume whichever role the seeded session allows.
    Resume,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    pub role: AgentRole,
    pub session: Option<Session>,
    pub static_signature: HexBytes,
}

impl AgentSettings {
    pub fn from_env() -> Result<Self, AgentError> {
        Self::from_lookup(|variable| env::var(variable).ok())
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AgentError> {
        let read = |variable: &str| lookup(variable).filter(|value| !value.trim().is_empty());

        let role = match read(ENV_ROLE).as_deref().map(str::trim) {
            Some("origin") => AgentRole::Origin {
                session_hint: read(ENV_SESSION_HINT),
            },
            Some("target") => AgentRole::Target {
                code: read(ENV_CODE).ok_or_else(|| AgentError::Settings {
                    message: format!("{ENV_CODE} is required for the target role"),
                    location: ErrorLocation::caller(),
                })?,
                pairing_id: read(ENV_PAIRING_ID),
            },
            Some("resume") => AgentRole::Resume,
            Some(other) => {
                return Err(AgentError::Settings {
                    message: format!(
                        "Unknown {ENV_ROLE} '{other}' (expected origin, target or resume)"
                    ),
                    location: ErrorLocation::caller(),
                });
            }
            None => {
                return Err(AgentError::Settings {
                    message: format!("{ENV_ROLE} is not set"),
                    location: ErrorLocation::caller(),
                });
            }
        };

        let session = match read(ENV_SESSION_TOKEN) {
            Some(token) => Some(Session::new(
                read(ENV_SESSION_ADDRESS).unwrap_or_default(),
                RedactedToken::new(token),
                parse_kind(read(ENV_SESSION_KIND).as_deref(), &role)?,
            )),
            None => None,
        };

        let raw_signature =
            read(ENV_STATIC_SIGNATURE).unwrap_or_else(|| DEFAULT_STATIC_SIGNATURE.to_string());
        let static_signature =
            HexBytes::parse(raw_signature.trim()).map_err(|e| AgentError::Settings {
                message: format!("{ENV_STATIC_SIGNATURE} is not valid hex: {e}"),
                location: ErrorLocation::caller(),
            })?;

        Ok(Self {
            role,
            session,
            static_signature,
        })
    }
}

/// Session kind for the seeded session; a target defaults to a local credential.
fn parse_kind(raw: Option<&str>, role: &AgentRole) -> Result<SessionKind, AgentError> {
    match raw.map(str::trim) {
        Some("webauthn") => Ok(SessionKind::Webauthn),
        Some("distant-webauthn") => Ok(SessionKind::DistantWebauthn),
        Some(other) => Err(AgentError::Settings {
            message: format!("Unsupported {ENV_SESSION_KIND} '{other}'"),
            location: ErrorLocation::caller(),
        }),
        None if matches!(role, AgentRole::Target { .. }) => Ok(SessionKind::Webauthn),
        None => Ok(SessionKind::DistantWebauthn),
    }
}
