use crate::error::signature::SignatureError;
use crate::origin::PendingRequests;
use crate::protocol::HexBytes;

/// **VALUE**: Verifies a resolved request delivers the signature once.
///
/// **WHY THIS MATTERS**: The caller awaiting the signature is woken by this path.
///
/// **BUG THIS CATCHES**: Would catch an entry staying in the arena after resolution.
#[tokio::test]
async fn given_pending_request_when_resolved_then_receiver_gets_signature() {
    let pending = PendingRequests::new();
    let receiver = pending.insert("r-1");

    assert!(pending.resolve("r-1", HexBytes::new(vec![1, 2, 3])));

    let signature = receiver.await.expect("completed").expect("signed");
    assert_eq!(signature.as_bytes(), &[1, 2, 3]);
    assert!(pending.is_empty());
}

/// **VALUE**: Verifies a second completion for the same id is ignored.
///
/// **WHY THIS MATTERS**: A response racing a rejection must not complete twice.
///
/// **BUG THIS CATCHES**: Would catch stale responses being treated as known.
#[tokio::test]
async fn given_resolved_request_when_completed_again_then_returns_false() {
    let pending = PendingRequests::new();
    let _receiver = pending.insert("r-1");

    assert!(pending.resolve("r-1", HexBytes::default()));

    assert!(!pending.resolve("r-1", HexBytes::default()));
    assert!(!pending.reject("r-1", SignatureError::connection_lost("late")));
    assert!(!pending.resolve("never-issued", HexBytes::default()));
}

/// **VALUE**: Verifies drain rejects every entry with the supplied error.
///
/// **WHY THIS MATTERS**: Cleanup must never leave a caller waiting forever.
///
/// **BUG THIS CATCHES**: Would catch drain removing entries without notifying callers.
#[tokio::test]
async fn given_many_pending_when_drained_then_all_receive_connection_lost() {
    let pending = PendingRequests::new();
    let first = pending.insert("r-1");
    let second = pending.insert("r-2");

    let drained = pending.drain_with(|| SignatureError::connection_lost("closed"));

    assert_eq!(drained, 2);
    assert!(pending.is_empty());
    for receiver in [first, second] {
        let result = receiver.await.expect("completed");
        assert!(matches!(result, Err(SignatureError::ConnectionLost { .. })));
    }
}

/// **VALUE**: Verifies removing an entry drops its sender without a result.
///
/// **WHY THIS MATTERS**: Timeouts and cancelled callers clean up through this path.
///
/// **BUG THIS CATCHES**: Would catch `remove` leaving the entry behind.
#[tokio::test]
async fn given_pending_request_when_removed_then_receiver_sees_closed_channel() {
    let pending = PendingRequests::new();
    let receiver = pending.insert("r-1");

    assert!(pending.remove("r-1"));

    assert!(!pending.contains("r-1"));
    assert!(receiver.await.is_err());
}
