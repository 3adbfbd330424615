//! Wire protocol between the pairing clients and the relay.
//!
//! Every frame is a JSON object `{ "type": <tag>, "payload": { ... } }`. Each
//! direction of each role has its own closed set of tags, modelled as an
//! adjacently tagged enum. Receivers decode with [`decode_envelope`]; anything
//! that does not fit the expected set is reported as a [`ProtocolError`] so the
//! caller can log and drop it.
//!
//! | Enum             | Direction       |
//! |------------------|-----------------|
//! | [`OriginInbound`]  | relay → origin |
//! | [`OriginOutbound`] | origin → relay |
//! | [`TargetInbound`]  | relay → target |
//! | [`TargetOutbound`] | target → relay |

mod close_code;
mod hex_bytes;
mod origin;
mod target;

pub use close_code::RelayCloseCode;
pub use hex_bytes::HexBytes;
pub use origin::{AuthenticatedWallet, OriginInbound, OriginOutbound, SdkToken};
pub use target::{TargetInbound, TargetOutbound};

use crate::error::protocol::ProtocolError;

use common::ErrorLocation;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Field carrying the message discriminator.
pub const TYPE_FIELD: &str = "type";

/// Gives the wire tag of a decoded message, for logging.
pub trait MessageTag {
    fn tag(&self) -> &'static str;
}

/// Decode a text frame into one of the protocol enums.
///
/// # Errors
///
/// - [`ProtocolError::Malformed`] if the text is not a JSON object with a string `type`
/// - [`ProtocolError::UnknownType`] if the tag or its payload does not belong to `M`
pub fn decode_envelope<M: DeserializeOwned>(text: &str) -> Result<M, ProtocolError> {
    let value: Value = serde_json::from_str(text).map_err(|e| ProtocolError::Malformed {
        message: format!("Frame is not valid JSON: {e}"),
        location: ErrorLocation::caller(),
    })?;

    let Some(message_type) = value.get(TYPE_FIELD).and_then(Value::as_str) else {
        return Err(ProtocolError::Malformed {
            message: "Frame has no string `type` field".to_string(),
            location: ErrorLocation::caller(),
        });
    };
    let message_type = message_type.to_string();

    serde_json::from_value(value).map_err(|e| ProtocolError::UnknownType {
        message_type,
        message: e.to_string(),
        location: ErrorLocation::caller(),
    })
}
