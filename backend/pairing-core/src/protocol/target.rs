use crate::protocol::{HexBytes, MessageTag};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Relay → target.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum TargetInbound {
    Ping {
        pairing_id: String,
    },
    PartnerConnected {
        pairing_id: String,
        device_name: String,
    },
    SignatureRequest {
        pairing_id: String,
        id: String,
        request: HexBytes,
        #[serde(default)]
        context: Option<Value>,
        #[serde(default)]
        partner_device_name: Option<String>,
    },
}

impl MessageTag for TargetInbound {
    fn tag(&self) -> &'static str {
        match self {
            TargetInbound::Ping { .. } => "ping",
            TargetInbound::PartnerConnected { .. } => "partner-connected",
            TargetInbound::SignatureRequest { .. } => "signature-request",
        }
    }
}

/// Target → relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum TargetOutbound {
    Pong {
        pairing_id: String,
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
}

impl MessageTag for TargetOutbound {
    fn tag(&self) -> &'static str {
        match self {
            TargetOutbound::Pong { .. } => "pong",
            TargetOutbound::SignatureResponse { .. } => "signature-response",
            TargetOutbound::SignatureReject { .. } => "signature-reject",
        }
    }
}
