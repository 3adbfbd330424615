use crate::protocol::{HexBytes, MessageTag};
use crate::session::SessionKind;

use common::RedactedToken;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Relay → origin.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum OriginInbound {
    /// The relay created a pairing; `pairing_code` is what the target types in.
    PairingInitiated {
        pairing_id: String,
        pairing_code: String,
    },
    PartnerConnected {
        pairing_id: String,
        device_name: String,
    },
    SignatureResponse {
        pairing_id: String,
        id: String,
        signature: HexBytes,
    },
    SignatureReject {
        pairing_id: String,
        id: String,
        reason: String,
    },
    Pong {
        pairing_id: String,
    },
    /// The target joined; the origin now holds a session bound to the pairing.
    Authenticated {
        token: RedactedToken,
        wallet: AuthenticatedWallet,
        #[serde(default, alias = "sdkJwt")]
        sdk_token: Option<SdkToken>,
    },
}

impl MessageTag for OriginInbound {
    fn tag(&self) -> &'static str {
        match self {
            OriginInbound::PairingInitiated { .. } => "pairing-initiated",
            OriginInbound::PartnerConnected { .. } => "partner-connected",
            OriginInbound::SignatureResponse { .. } => "signature-response",
            OriginInbound::SignatureReject { .. } => "signature-reject",
            OriginInbound::Pong { .. } => "pong",
            OriginInbound::Authenticated { .. } => "authenticated",
        }
    }
}

/// Origin → relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum OriginOutbound {
    Ping,
    SignatureRequest {
        id: String,
        request: HexBytes,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<Value>,
    },
}

impl MessageTag for OriginOutbound {
    fn tag(&self) -> &'static str {
        match self {
            OriginOutbound::Ping => "ping",
            OriginOutbound::SignatureRequest { .. } => "signature-request",
        }
    }
}

/// Wallet description delivered with `authenticated`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedWallet {
    pub address: String,
    #[serde(rename = "type", default)]
    pub kind: Option<SessionKind>,
    #[serde(default)]
    pub authenticator_id: Option<String>,
    #[serde(default)]
    pub pairing_id: Option<String>,
    #[serde(default)]
    pub public_key: Option<Value>,
}

/// Secondary token for SDK calls, sent either bare or with its expiry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SdkToken {
    WithExpiry { token: RedactedToken, expires: u64 },
    Bare(RedactedToken),
}

impl SdkToken {
    pub fn token(&self) -> &RedactedToken {
        match self {
            SdkToken::WithExpiry { token, .. } | SdkToken::Bare(token) => token,
        }
    }
}
