use pairing_core::protocol::HexBytes;
use pairing_core::target::{PendingSignature, SignatureRequestHandler};

use async_trait::async_trait;
use log::info;

/// Approves every request with a fixed signature.
///
/// Stands in for a platform authenticator when exercising a relay.
pub struct StaticSigner {
    signature: HexBytes,
}

impl StaticSigner {
    pub fn new(signature: HexBytes) -> Self {
        Self { signature }
    }
}

#[async_trait]
impl SignatureRequestHandler for StaticSigner {
    async fn request_signature(&self, request: &PendingSignature) -> Result<HexBytes, String> {
        info!(
            "Signing request {} ({} bytes) from {}",
            request.id,
            request.request.len(),
            request.from.as_deref().unwrap_or("unknown device")
        );
        Ok(self.signature.clone())
    }
}
