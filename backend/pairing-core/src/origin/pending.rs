use crate::error::signature::SignatureError;
use crate::protocol::HexBytes;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use log::debug;
use tokio::sync::oneshot;

pub type SignatureResult = Result<HexBytes, SignatureError>;

/// In-flight origin signature requests, keyed by request id.
///
/// Each entry is completed at most once: whichever of resolve, reject, remove
/// or drain gets to it first takes it out of the map.
#[derive(Default)]
pub struct PendingRequests {
    entries: Mutex<HashMap<String, oneshot::Sender<SignatureResult>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` and get the receiving half of its completion.
    pub fn insert(&self, id: impl Into<String>) -> oneshot::Receiver<SignatureResult> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id.into(), tx);
        rx
    }

    pub fn resolve(&self, id: &str, signature: HexBytes) -> bool {
        self.complete(id, Ok(signature))
    }

    pub fn reject(&self, id: &str, error: SignatureError) -> bool {
        self.complete(id, Err(error))
    }

    /// Drop `id` without completing it.
    pub fn remove(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Reject every entry with an error built by `error`. Returns how many
    /// entries were rejected.
    pub fn drain_with(&self, error: impl Fn() -> SignatureError) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        let count = drained.len();

        for (id, tx) in drained {
            if tx.send(Err(error())).is_err() {
                debug!("Signature request {id} was abandoned before rejection");
            }
        }

        count
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn complete(&self, id: &str, result: SignatureResult) -> bool {
        let Some(tx) = self.lock().remove(id) else {
            return false;
        };

        if tx.send(result).is_err() {
            debug!("Signature request {id} settled after its caller went away");
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<SignatureResult>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
