use crate::relay_tests::helpers::{MockRelay, wait_for_state, wait_for_status};

use pairing_core::connection::PairingStatus;
use pairing_core::protocol::HexBytes;
use pairing_core::session::{InMemorySessionStore, Session, SessionKind};
use pairing_core::target::{
    PendingSignature, SignatureOutcome, SignatureRequestHandler, TargetPairingClient,
};

use common::RedactedToken;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

/// Signs by reversing the request bytes; counts invocations.
#[derive(Default)]
struct ReversingSigner {
    calls: AtomicUsize,
}

#[async_trait]
impl SignatureRequestHandler for ReversingSigner {
    async fn request_signature(&self, request: &PendingSignature) -> Result<HexBytes, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut bytes = request.request.as_bytes().to_vec();
        bytes.reverse();
        Ok(HexBytes::new(bytes))
    }
}

struct DecliningSigner;

#[async_trait]
impl SignatureRequestHandler for DecliningSigner {
    async fn request_signature(&self, _request: &PendingSignature) -> Result<HexBytes, String> {
        Err("user cancelled".to_string())
    }
}

fn local_session_store() -> Arc<InMemorySessionStore> {
    Arc::new(InMemorySessionStore::with_session(Session::new(
        "0xabc",
        RedactedToken::new("local-token"),
        SessionKind::Webauthn,
    )))
}

fn signature_request(id: &str, request: &str) -> serde_json::Value {
    json!({
        "type": "signature-request",
        "payload": {
            "pairingId": "p-1",
            "id": id,
            "request": request,
            "partnerDeviceName": "Laptop"
        }
    })
}

/// **VALUE**: Verifies join sends the code, pairing id and local token.
///
/// **WHY THIS MATTERS**: The relay attaches the target to the origin's pairing with these.
///
/// **BUG THIS CATCHES**: Would catch the token not being attached when a session exists.
#[tokio::test]
async fn given_local_session_when_join_pairing_then_query_identifies_pairing() {
    let mut relay = MockRelay::start().await;
    let client = TargetPairingClient::new(relay.options(), local_session_store());

    client.join_pairing("424242", Some("p-1".to_string()));

    let connection = relay.accept().await;
    assert_eq!(connection.query_param("action"), Some("join"));
    assert_eq!(connection.query_param("pairingCode"), Some("424242"));
    assert_eq!(connection.query_param("id"), Some("p-1"));
    assert_eq!(connection.query_param("wallet"), Some("local-token"));
    assert_eq!(client.state().base.status, PairingStatus::Connecting);
}

/// **VALUE**: Verifies relay pings are answered with the pairing id and mark the target paired.
///
/// **WHY THIS MATTERS**: The relay and the origin judge liveness by these pongs.
///
/// **BUG THIS CATCHES**: Would catch pongs missing the payload or never being sent.
#[tokio::test]
async fn given_joined_target_when_pinged_then_replies_pong() {
    let mut relay = MockRelay::start().await;
    let client = TargetPairingClient::new(relay.options(), local_session_store());
    let mut states = client.subscribe();
    client.join_pairing("424242", None);
    let mut connection = relay.accept().await;

    connection
        .send_json(json!({"type": "ping", "payload": {"pairingId": "p-1"}}))
        .await;

    assert_eq!(
        connection.recv_json().await,
        json!({"type": "pong", "payload": {"pairingId": "p-1"}})
    );
    wait_for_status(&mut states, PairingStatus::Paired).await;
}

/// **VALUE**: Verifies a second join while a channel is open is ignored.
///
/// **WHY THIS MATTERS**: Submitting the code twice must leave exactly one relay channel.
///
/// **BUG THIS CATCHES**: Would catch:
/// - connect replacing the live channel with one for the new code
/// - The ignored call touching the status
#[tokio::test]
async fn given_open_channel_when_join_again_then_no_second_channel() {
    // GIVEN: A target joined and answering pings
    let mut relay = MockRelay::start().await;
    let client = TargetPairingClient::new(relay.options(), local_session_store());
    let mut states = client.subscribe();
    client.join_pairing("424242", Some("p-1".to_string()));
    let mut connection = relay.accept().await;
    connection
        .send_json(json!({"type": "ping", "payload": {"pairingId": "p-1"}}))
        .await;
    connection.recv_json().await;
    wait_for_status(&mut states, PairingStatus::Paired).await;
    let before = client.state();

    // WHEN: Joining again
    client.join_pairing("999999", None);

    // THEN: No second channel and nothing changed
    assert!(!relay.has_connection_within(Duration::from_millis(300)).await);
    assert!(client.is_connected());
    assert_eq!(client.state(), before);
    assert_eq!(client.state().base.status, PairingStatus::Paired);
}

/// **VALUE**: Verifies garbage frames are dropped without ending the channel.
///
/// **WHY THIS MATTERS**: One bad frame from a newer relay must not unpair the device.
///
/// **BUG THIS CATCHES**: Would catch decode errors tearing the reader down.
#[tokio::test]
async fn given_malformed_frames_when_received_then_channel_keeps_working() {
    let mut relay = MockRelay::start().await;
    let client = TargetPairingClient::new(relay.options(), local_session_store());
    client.join_pairing("424242", None);
    let mut connection = relay.accept().await;

    connection.send_text("definitely not json").await;
    connection
        .send_json(json!({"type": "pairing-initiated", "payload": {}}))
        .await;
    connection
        .send_json(json!({"type": "ping", "payload": {"pairingId": "p-1"}}))
        .await;

    let pong = connection.recv_json().await;
    assert_eq!(pong["type"], "pong");
    assert!(client.is_connected());
}

/// **VALUE**: Verifies manual approval of a signature request.
///
/// **WHY THIS MATTERS**: Without a signer the UI decides, using the pending list.
///
/// **BUG THIS CATCHES**: Would catch:
/// - The request not appearing in state with its partner name
/// - The response missing the pairing id
/// - The entry staying pending after the answer
#[tokio::test]
async fn given_pending_request_when_manually_signed_then_response_sent_and_entry_removed() {
    let mut relay = MockRelay::start().await;
    let client = TargetPairingClient::new(relay.options(), local_session_store());
    let mut states = client.subscribe();
    client.join_pairing("424242", None);
    let mut connection = relay.accept().await;

    connection.send_json(signature_request("r-1", "0x0a0b")).await;

    let state = wait_for_state(&mut states, |state| {
        state.pending_signature_requests.contains_key("r-1")
    })
    .await;
    let pending = &state.pending_signature_requests["r-1"];
    assert_eq!(pending.request.as_bytes(), &[0x0a, 0x0b]);
    assert_eq!(pending.from.as_deref(), Some("Laptop"));
    assert_eq!(state.base.status, PairingStatus::Paired);

    let signed = SignatureOutcome::Signed(HexBytes::new(vec![0x99]));
    assert!(client.send_signature_response("r-1", signed));

    assert_eq!(
        connection.recv_json().await,
        json!({
            "type": "signature-response",
            "payload": {"pairingId": "p-1", "id": "r-1", "signature": "0x99"}
        })
    );
    assert!(client.pending_signature_requests().is_empty());
}

/// **VALUE**: Verifies answering an unknown id is refused.
///
/// **WHY THIS MATTERS**: Double-clicking "approve" must not send two responses.
///
/// **BUG THIS CATCHES**: Would catch responses being sent for ids that were never pending.
#[tokio::test]
async fn given_unknown_id_when_responding_then_nothing_is_sent() {
    let mut relay = MockRelay::start().await;
    let client = TargetPairingClient::new(relay.options(), local_session_store());
    client.join_pairing("424242", None);
    let mut connection = relay.accept().await;

    let sent = client.send_signature_response("nope", SignatureOutcome::Rejected("no".to_string()));

    assert!(!sent);
    assert!(connection.recv_json_within(Duration::from_millis(200)).await.is_none());
}

/// **VALUE**: Verifies an installed signer answers automatically and only once per request.
///
/// **WHY THIS MATTERS**: The relay re-delivers pending requests after a reconnect;
/// prompting the authenticator twice would confuse the user.
///
/// **BUG THIS CATCHES**: Would catch re-delivered requests being handed to the signer again.
#[tokio::test]
async fn given_signer_when_request_redelivered_then_signed_once() {
    let mut relay = MockRelay::start().await;
    let client = TargetPairingClient::new(relay.options(), local_session_store());
    let signer = Arc::new(ReversingSigner::default());
    client.set_signer(signer.clone());
    client.join_pairing("424242", None);
    let mut connection = relay.accept().await;

    connection.send_json(signature_request("r-1", "0x010203")).await;
    connection.send_json(signature_request("r-1", "0x010203")).await;

    let response = connection.recv_json().await;
    assert_eq!(response["type"], "signature-response");
    assert_eq!(response["payload"]["signature"], "0x030201");
    assert!(connection.recv_json_within(Duration::from_millis(200)).await.is_none());
    assert_eq!(signer.calls.load(Ordering::SeqCst), 1);
}

/// **VALUE**: Verifies a failing signer is relayed as a rejection.
///
/// **WHY THIS MATTERS**: The origin needs the reason instead of waiting for a timeout.
///
/// **BUG THIS CATCHES**: Would catch signer errors being swallowed.
#[tokio::test]
async fn given_declining_signer_when_request_arrives_then_reject_is_sent() {
    let mut relay = MockRelay::start().await;
    let client = TargetPairingClient::new(relay.options(), local_session_store());
    client.set_signer(Arc::new(DecliningSigner));
    client.join_pairing("424242", None);
    let mut connection = relay.accept().await;

    connection.send_json(signature_request("r-9", "0x00")).await;

    assert_eq!(
        connection.recv_json().await,
        json!({
            "type": "signature-reject",
            "payload": {"pairingId": "p-1", "id": "r-9", "reason": "user cancelled"}
        })
    );
}

/// **VALUE**: Verifies reconnect resumes with the local token and cleanup clears pending requests.
///
/// **WHY THIS MATTERS**: After a restart the target resumes without a code, and stale
/// requests from the old channel must not linger in the UI.
///
/// **BUG THIS CATCHES**: Would catch reconnect sending a join action or cleanup leaving entries.
#[tokio::test]
async fn given_local_session_when_reconnect_then_resumes_and_cleanup_resets_state() {
    let mut relay = MockRelay::start().await;
    let client = TargetPairingClient::new(relay.options(), local_session_store());
    let mut states = client.subscribe();

    client.reconnect();
    let mut connection = relay.accept().await;
    assert_eq!(connection.query_param("wallet"), Some("local-token"));
    assert_eq!(connection.query_param("action"), None);

    connection.send_json(signature_request("r-1", "0x01")).await;
    wait_for_state(&mut states, |state| !state.pending_signature_requests.is_empty()).await;

    connection.close_with(1000, "relay restart").await;

    let state = wait_for_status(&mut states, PairingStatus::Idle).await;
    assert!(state.pending_signature_requests.is_empty());
    assert!(!client.is_connected());
}
