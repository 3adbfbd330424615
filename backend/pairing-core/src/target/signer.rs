use crate::protocol::HexBytes;
use crate::target::PendingSignature;

use async_trait::async_trait;

/// Decision on a signature request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureOutcome {
    Signed(HexBytes),
    Rejected(String),
}

/// Local signing capability (typically the platform authenticator).
///
/// Called once per request the target accepts. An `Err` is relayed back to
/// the origin as a rejection carrying the error text.
#[async_trait]
pub trait SignatureRequestHandler: Send + Sync {
    async fn request_signature(&self, request: &PendingSignature) -> Result<HexBytes, String>;
}

impl From<Result<HexBytes, String>> for SignatureOutcome {
    fn from(result: Result<HexBytes, String>) -> Self {
        match result {
            Ok(signature) => SignatureOutcome::Signed(signature),
            Err(reason) => SignatureOutcome::Rejected(reason),
        }
    }
}
