use crate::relay_tests::helpers::{MockRelay, TEST_WAIT, wait_for_state, wait_for_status};

use pairing_core::connection::PairingStatus;
use pairing_core::error::connection::ConnectionError;
use pairing_core::error::signature::SignatureError;
use pairing_core::origin::{OriginPairingClient, PairingSuccessCallback};
use pairing_core::session::{InMemorySessionStore, Session, SessionKind, SessionStore};

use common::RedactedToken;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::oneshot;

fn origin_client(relay: &MockRelay) -> OriginPairingClient {
    OriginPairingClient::new(relay.options(), Arc::new(InMemorySessionStore::new()))
}

fn distant_session_store() -> Arc<InMemorySessionStore> {
    Arc::new(InMemorySessionStore::with_session(Session::new(
        "0xabc",
        RedactedToken::new("distant-token"),
        SessionKind::DistantWebauthn,
    )))
}

/// **VALUE**: Verifies the full initiate flow up to a named partner.
///
/// **WHY THIS MATTERS**: This is what the user sees: a code, then the partner's device name.
///
/// **BUG THIS CATCHES**: Would catch:
/// - The initiate action missing from the query
/// - `pairing-initiated` not exposing the code
/// - `partner-connected` not moving the status to paired
#[tokio::test]
async fn given_relay_when_initiate_pairing_then_code_and_partner_are_published() {
    // GIVEN: A relay and an origin client
    let mut relay = MockRelay::start().await;
    let client = origin_client(&relay);

    // WHEN: The origin initiates and the relay issues a code
    client.initiate_pairing(Some("sso-1".to_string()), None);
    let mut connection = relay.accept().await;
    assert_eq!(connection.query_param("action"), Some("initiate"));
    assert_eq!(connection.query_param("ssoId"), Some("sso-1"));

    connection
        .send_json(json!({
            "type": "pairing-initiated",
            "payload": {"pairingId": "p-1", "pairingCode": "424242"}
        }))
        .await;

    // THEN: The code is available while still connecting
    let pairing = client.wait_for_pairing().await.expect("code issued");
    assert_eq!(pairing.id, "p-1");
    assert_eq!(pairing.code, "424242");
    assert_eq!(client.state().base.status, PairingStatus::Connecting);

    // WHEN: The target joins
    connection
        .send_json(json!({
            "type": "partner-connected",
            "payload": {"pairingId": "p-1", "deviceName": "Phone"}
        }))
        .await;

    // THEN: The origin is paired with the partner's name
    let mut states = client.subscribe();
    let state = wait_for_status(&mut states, PairingStatus::Paired).await;
    assert_eq!(state.base.partner_device_name.as_deref(), Some("Phone"));
}

/// **VALUE**: Verifies a signature request round trip.
///
/// **WHY THIS MATTERS**: Remote signing is the whole point of pairing.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Responses not correlated by request id
/// - Hex payloads mangled on either leg
/// - The pending count not returning to zero
#[tokio::test]
async fn given_paired_origin_when_target_signs_then_request_resolves_with_signature() {
    // GIVEN: A connected origin
    let mut relay = MockRelay::start().await;
    let client = origin_client(&relay);
    client.initiate_pairing(None, None);
    let mut connection = relay.accept().await;

    // WHEN: A signature is requested
    let requester = client.clone();
    let request = tokio::spawn(async move {
        requester
            .send_signature_request(vec![0x01, 0x02], Some(json!({"purpose": "login"})))
            .await
    });

    let frame = connection.recv_json().await;
    assert_eq!(frame["type"], "signature-request");
    assert_eq!(frame["payload"]["request"], "0x0102");
    assert_eq!(frame["payload"]["context"], json!({"purpose": "login"}));
    let id = frame["payload"]["id"].as_str().expect("request id").to_string();

    let mut states = client.subscribe();
    wait_for_state(&mut states, |state| state.pending_signature_requests == 1).await;

    connection
        .send_json(json!({
            "type": "signature-response",
            "payload": {"pairingId": "p-1", "id": id, "signature": "0xbeef"}
        }))
        .await;

    // THEN: The caller receives the signature and nothing stays pending
    let signature = request.await.expect("task").expect("signed");
    assert_eq!(signature.as_bytes(), &[0xbe, 0xef]);
    assert_eq!(client.pending_signature_requests(), 0);
    wait_for_state(&mut states, |state| state.pending_signature_requests == 0).await;
}

/// **VALUE**: Verifies a target refusal reaches the caller with its reason.
///
/// **WHY THIS MATTERS**: Without it the caller would wait until the timeout.
///
/// **BUG THIS CATCHES**: Would catch `signature-reject` being dropped as unknown.
#[tokio::test]
async fn given_pending_request_when_target_rejects_then_caller_gets_rejected() {
    let mut relay = MockRelay::start().await;
    let client = origin_client(&relay);
    client.initiate_pairing(None, None);
    let mut connection = relay.accept().await;

    let requester = client.clone();
    let request =
        tokio::spawn(async move { requester.send_signature_request(vec![0xff], None).await });
    let frame = connection.recv_json().await;
    let id = frame["payload"]["id"].as_str().expect("request id").to_string();

    connection
        .send_json(json!({
            "type": "signature-reject",
            "payload": {"pairingId": "p-1", "id": id, "reason": "user declined"}
        }))
        .await;

    match request.await.expect("task") {
        Err(SignatureError::Rejected { reason, .. }) => assert_eq!(reason, "user declined"),
        other => panic!("Expected Rejected, got {other:?}"),
    }
}

/// **VALUE**: Verifies responses for unknown ids are ignored.
///
/// **WHY THIS MATTERS**: The relay may replay responses after a reconnect.
///
/// **BUG THIS CATCHES**: Would catch:
/// - A stale response resolving the wrong request
/// - A stale response promoting a connecting origin to paired
#[tokio::test]
async fn given_stale_response_when_received_then_live_request_still_pending() {
    let mut relay = MockRelay::start().await;
    let client = origin_client(&relay);
    client.initiate_pairing(None, None);
    let mut connection = relay.accept().await;
    let status_before = client.state().base.status;
    assert_eq!(status_before, PairingStatus::Connecting);

    let requester = client.clone();
    let request =
        tokio::spawn(async move { requester.send_signature_request(vec![0x01], None).await });
    let frame = connection.recv_json().await;
    let id = frame["payload"]["id"].as_str().expect("request id").to_string();

    // WHEN: A response for some other id arrives
    connection
        .send_json(json!({
            "type": "signature-response",
            "payload": {"pairingId": "p-1", "id": "stale-id", "signature": "0x00"}
        }))
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // THEN: The live request and the status are untouched
    assert!(!request.is_finished());
    assert_eq!(client.pending_signature_requests(), 1);
    assert_eq!(client.state().base.status, status_before);
    assert_eq!(client.state().base.partner_device_name, None);

    // THEN: The live request still resolves normally
    connection
        .send_json(json!({
            "type": "signature-response",
            "payload": {"pairingId": "p-1", "id": id, "signature": "0x02"}
        }))
        .await;
    let signature = request.await.expect("task").expect("signed");
    assert_eq!(signature.as_bytes(), &[0x02]);
}

/// **VALUE**: Verifies requests fail fast without a channel.
///
/// **WHY THIS MATTERS**: Callers should not wait two minutes for a request that was never sent.
///
/// **BUG THIS CATCHES**: Would catch the request being parked in the arena anyway.
#[tokio::test]
async fn given_no_channel_when_signature_requested_then_returns_not_connected() {
    let relay = MockRelay::start().await;
    let client = origin_client(&relay);

    let result = client.send_signature_request(vec![0x01], None).await;

    assert!(matches!(result, Err(SignatureError::NotConnected { .. })));
    assert_eq!(client.pending_signature_requests(), 0);
    assert_eq!(client.state().pending_signature_requests, 0);
}

/// **VALUE**: Verifies disconnect releases every in-flight request.
///
/// **WHY THIS MATTERS**: A caller blocked on a signature must learn the channel is gone.
///
/// **BUG THIS CATCHES**: Would catch cleanup resetting state without rejecting pending requests.
#[tokio::test]
async fn given_pending_request_when_disconnect_then_caller_gets_connection_lost() {
    let mut relay = MockRelay::start().await;
    let client = origin_client(&relay);
    client.initiate_pairing(None, None);
    let mut connection = relay.accept().await;

    let requester = client.clone();
    let request =
        tokio::spawn(async move { requester.send_signature_request(vec![0x01], None).await });
    connection.recv_json().await;

    client.disconnect();

    let result = tokio::time::timeout(TEST_WAIT, request)
        .await
        .expect("request settled")
        .expect("task");
    assert!(matches!(result, Err(SignatureError::ConnectionLost { .. })));
    assert_eq!(client.state().base.status, PairingStatus::Idle);
    assert!(!client.is_connected());
    connection.expect_closed().await;
}

/// **VALUE**: Verifies unanswered requests time out and leave nothing behind.
///
/// **WHY THIS MATTERS**: A target that never answers must not leak arena entries.
///
/// **BUG THIS CATCHES**: Would catch the timeout path skipping arena removal.
#[tokio::test]
async fn given_silent_target_when_signature_requested_then_times_out() {
    let mut relay = MockRelay::start().await;
    let options = relay.options_with(|config| {
        config.timeouts.signature = Duration::from_millis(200);
    });
    let client = OriginPairingClient::new(options, Arc::new(InMemorySessionStore::new()));
    client.initiate_pairing(None, None);
    let mut connection = relay.accept().await;

    let result = client.send_signature_request(vec![0x01], None).await;
    connection.recv_json().await;

    assert!(matches!(result, Err(SignatureError::Timeout { .. })));
    assert_eq!(client.pending_signature_requests(), 0);
    assert_eq!(client.state().pending_signature_requests, 0);
}

/// **VALUE**: Verifies a second initiate while a channel is open is ignored entirely.
///
/// **WHY THIS MATTERS**: Double-clicking "pair" must not open two relay channels,
/// and the ignored call must not hijack the first caller's success callback.
///
/// **BUG THIS CATCHES**: Would catch:
/// - connect replacing the live channel
/// - The status or pairing code changing on the ignored call
/// - The ignored call's callback replacing the first one
#[tokio::test]
async fn given_open_channel_when_initiate_again_then_no_second_channel() {
    // GIVEN: An origin with an issued code and a success callback
    let mut relay = MockRelay::start().await;
    let client = origin_client(&relay);
    let (first_tx, first_rx) = oneshot::channel();
    let first_callback: PairingSuccessCallback = Box::new(move || {
        let _ = first_tx.send(());
    });
    client.initiate_pairing(None, Some(first_callback));
    let mut connection = relay.accept().await;
    connection
        .send_json(json!({
            "type": "pairing-initiated",
            "payload": {"pairingId": "p-1", "pairingCode": "424242"}
        }))
        .await;
    client.wait_for_pairing().await.expect("code issued");
    let before = client.state();

    // WHEN: Initiating again with another callback
    let (second_tx, mut second_rx) = oneshot::channel();
    let second_callback: PairingSuccessCallback = Box::new(move || {
        let _ = second_tx.send(());
    });
    client.initiate_pairing(None, Some(second_callback));

    // THEN: No second channel, and the state is exactly as before
    assert!(!relay.has_connection_within(Duration::from_millis(300)).await);
    assert!(client.is_connected());
    assert_eq!(client.state(), before);

    // WHEN: The pairing completes
    connection
        .send_json(json!({
            "type": "authenticated",
            "payload": {
                "token": "session-token",
                "wallet": {"address": "0xabc", "type": "distant-webauthn"}
            }
        }))
        .await;

    // THEN: Only the first callback runs
    tokio::time::timeout(TEST_WAIT, first_rx)
        .await
        .expect("first callback fired")
        .expect("first callback sender kept");
    assert!(matches!(
        second_rx.try_recv(),
        Err(oneshot::error::TryRecvError::Closed)
    ));
}

/// **VALUE**: Verifies the initiate channel carries no keepalive pings.
///
/// **WHY THIS MATTERS**: Nobody can answer a ping before the target joins, and the
/// relay refuses pings from an unauthenticated socket. Pinging here would fail a
/// healthy pairing while the user is still typing the code.
///
/// **BUG THIS CATCHES**: Would catch keepalive starting on initiate and wiping the code.
#[tokio::test]
async fn given_initiated_pairing_when_waiting_for_partner_then_no_pings_are_sent() {
    // GIVEN: Fast keepalive with a small budget
    let mut relay = MockRelay::start().await;
    let options = relay.options_with(|config| {
        config.keepalive.interval = Duration::from_millis(50);
        config.keepalive.max_missed_pongs = 2;
    });
    let client = OriginPairingClient::new(options, Arc::new(InMemorySessionStore::new()));
    client.initiate_pairing(None, None);
    let mut connection = relay.accept().await;

    // WHEN: The relay issues a code and no partner joins for many intervals
    connection
        .send_json(json!({
            "type": "pairing-initiated",
            "payload": {"pairingId": "p-1", "pairingCode": "424242"}
        }))
        .await;
    client.wait_for_pairing().await.expect("code issued");

    // THEN: Nothing is sent and the code stays on display
    assert!(connection.recv_json_within(Duration::from_millis(400)).await.is_none());
    let state = client.state();
    assert_eq!(state.base.status, PairingStatus::Connecting);
    assert_eq!(state.pairing.map(|pairing| pairing.code).as_deref(), Some("424242"));
    assert!(client.is_connected());
}

/// **VALUE**: Verifies keepalive pings, pong handling and the missed-pong budget.
///
/// **WHY THIS MATTERS**: A half-open socket is only detected by missing pongs.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Pongs not resetting the missed counter
/// - A silent relay never failing the channel
#[tokio::test]
async fn given_keepalive_when_relay_stops_answering_then_fails_to_retry_error() {
    // GIVEN: A resumed origin with fast keepalive and a small budget
    let mut relay = MockRelay::start().await;
    let options = relay.options_with(|config| {
        config.keepalive.interval = Duration::from_millis(50);
        config.keepalive.max_missed_pongs = 2;
    });
    let client = OriginPairingClient::new(options, distant_session_store());
    let mut states = client.subscribe();
    client.reconnect();
    let mut connection = relay.accept().await;
    assert_eq!(connection.query_param("wallet"), Some("distant-token"));

    // WHEN: The first ping is answered
    let ping = connection.recv_json().await;
    assert_eq!(ping, json!({"type": "ping"}));
    connection
        .send_json(json!({"type": "pong", "payload": {"pairingId": "p-1"}}))
        .await;

    // THEN: The origin considers itself paired
    wait_for_status(&mut states, PairingStatus::Paired).await;

    // WHEN: The relay goes quiet
    // THEN: The channel is failed once the budget is spent
    wait_for_status(&mut states, PairingStatus::RetryError).await;
    assert!(!client.is_connected());
    connection.expect_closed().await;
}

/// **VALUE**: Verifies relay rejection codes land in retry-error and plain closes in idle.
///
/// **WHY THIS MATTERS**: Only a rejection should prompt the user to retry.
///
/// **BUG THIS CATCHES**: Would catch close codes being ignored.
#[tokio::test]
async fn given_relay_close_when_code_varies_then_status_reflects_rejection() {
    let mut relay = MockRelay::start().await;
    let client = origin_client(&relay);
    let mut states = client.subscribe();

    // WHEN: The relay refuses the pairing
    client.initiate_pairing(None, None);
    let mut connection = relay.accept().await;
    connection.close_with(4004, "pairing not found").await;

    // THEN: Retry error
    wait_for_status(&mut states, PairingStatus::RetryError).await;
    assert!(!client.is_connected());

    // WHEN: A later channel is closed normally
    client.initiate_pairing(None, None);
    let mut connection = relay.accept().await;
    wait_for_status(&mut states, PairingStatus::Connecting).await;
    connection.close_with(1000, "bye").await;

    // THEN: Back to idle
    wait_for_status(&mut states, PairingStatus::Idle).await;
}

/// **VALUE**: Verifies an unreachable relay ends in retry-error.
///
/// **WHY THIS MATTERS**: The UI must not spin in "connecting" forever.
///
/// **BUG THIS CATCHES**: Would catch open failures leaving the channel slot occupied.
#[tokio::test]
async fn given_unreachable_relay_when_initiate_then_retry_error() {
    let relay = MockRelay::start().await;
    let options = relay.options_with(|config| {
        config.relay.url = "ws://127.0.0.1:9/pairing/ws".to_string();
        config.timeouts.connect_retry = Duration::ZERO;
    });
    let client = OriginPairingClient::new(options, Arc::new(InMemorySessionStore::new()));
    let mut states = client.subscribe();

    client.initiate_pairing(None, None);

    wait_for_status(&mut states, PairingStatus::RetryError).await;
    assert!(!client.is_connected());
    assert!(matches!(
        client.wait_for_pairing().await,
        Err(ConnectionError::Closed { .. })
    ));
}

/// **VALUE**: Verifies `authenticated` stores the session, reconnects with it and
/// fires the callback.
///
/// **WHY THIS MATTERS**: This hand-over turns a one-off pairing into a persistent one.
///
/// **BUG THIS CATCHES**: Would catch:
/// - The session never reaching the store
/// - The follow-up channel missing the wallet token
/// - The success callback not running
#[tokio::test]
async fn given_authenticated_when_received_then_session_stored_and_channel_resumed() {
    // GIVEN: An origin mid-pairing with a success callback
    let mut relay = MockRelay::start().await;
    let store = Arc::new(InMemorySessionStore::new());
    let sessions: Arc<dyn SessionStore> = store.clone();
    let options = relay.options_with(|config| {
        config.timeouts.reconnect_delay = Duration::from_millis(50);
    });
    let client = OriginPairingClient::new(options, sessions);

    let (done_tx, done_rx) = oneshot::channel();
    let on_success: PairingSuccessCallback = Box::new(move || {
        let _ = done_tx.send(());
    });
    client.initiate_pairing(None, Some(on_success));
    let mut first = relay.accept().await;

    // WHEN: The relay hands over the session
    first
        .send_json(json!({
            "type": "authenticated",
            "payload": {
                "token": "session-token",
                "wallet": {"address": "0xabc", "type": "distant-webauthn", "pairingId": "p-1"},
                "sdkJwt": "sdk-token"
            }
        }))
        .await;

    // THEN: The callback fires and the session is stored
    tokio::time::timeout(TEST_WAIT, done_rx)
        .await
        .expect("callback fired")
        .expect("callback sender kept");
    let session = store.current().expect("session stored");
    assert_eq!(session.address, "0xabc");
    assert_eq!(session.kind, SessionKind::DistantWebauthn);
    assert_eq!(session.token.expose(), "session-token");
    assert!(store.sdk_token().is_some());

    // THEN: The first channel closes and a resumed one opens with the token
    first.expect_closed().await;
    let resumed = relay.accept().await;
    assert_eq!(resumed.query_param("wallet"), Some("session-token"));
    assert_eq!(resumed.query_param("action"), None);
    assert!(client.is_connected());
}
