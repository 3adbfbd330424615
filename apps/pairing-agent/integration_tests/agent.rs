use pairing_agent::agent::run;
use pairing_agent::error::AgentError;
use pairing_agent::settings::{AgentRole, AgentSettings};

use pairing_core::config::PairingConfig;
use pairing_core::protocol::HexBytes;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// End-to-end runs of the agent against an in-process relay
// ============================================================================

const TEST_WAIT: Duration = Duration::from_secs(5);

async fn bind_relay() -> (TcpListener, PairingConfig) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind relay");
    let port = listener.local_addr().expect("local addr").port();

    let mut config = PairingConfig::default();
    config.relay.url = format!("ws://127.0.0.1:{port}/pairing/ws");
    config.timeouts.connect_retry = Duration::from_secs(1);
    config.timeouts.pairing_code = Duration::from_secs(2);

    (listener, config)
}

/// **VALUE**: Tests the target role end to end: join, receive a request, answer
/// with the static signature.
///
/// **WHY THIS MATTERS**: This is the closest we get to a real device without an authenticator.
/// It wires settings, registry, signer and shutdown together.
///
/// **BUG THIS CATCHES**: Would catch:
/// - The signer not being installed before the join
/// - Shutdown leaving the channel open
#[tokio::test]
async fn given_target_settings_when_request_arrives_then_static_signature_is_returned() {
    // GIVEN: A relay and target settings
    let (listener, config) = bind_relay().await;
    let settings = AgentSettings {
        role: AgentRole::Target {
            code: "424242".to_string(),
            pairing_id: None,
        },
        session: None,
        static_signature: HexBytes::new(vec![0x5e, 0x11]),
    };
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let relay = async move {
        let (stream, _) = listener.accept().await.expect("agent connects");
        let mut socket = accept_async(stream).await.expect("handshake");

        // WHEN: The relay forwards a signature request
        socket
            .send(Message::text(
                json!({
                    "type": "signature-request",
                    "payload": {"pairingId": "p-1", "id": "r-1", "request": "0x01"}
                })
                .to_string(),
            ))
            .await
            .expect("send request");

        // THEN: The agent answers with its static signature
        let response: Value = loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    break serde_json::from_str(text.as_str()).expect("json");
                }
                Some(Ok(_)) => continue,
                other => panic!("Channel ended early: {other:?}"),
            }
        };

        let _ = stop_tx.send(());

        // AND: Shutdown closes the channel
        let closed = tokio::time::timeout(TEST_WAIT, async {
            while let Some(Ok(frame)) = socket.next().await {
                if frame.is_close() {
                    break;
                }
            }
        })
        .await;
        assert!(closed.is_ok(), "Agent did not close the channel");
        response
    };

    let agent = run(&config, settings, async {
        let _ = stop_rx.await;
    });

    let (result, response) = tokio::time::timeout(TEST_WAIT, async { tokio::join!(agent, relay) })
        .await
        .expect("agent and relay finish");

    assert!(result.is_ok(), "Agent run failed: {result:?}");
    assert_eq!(
        response,
        json!({
            "type": "signature-response",
            "payload": {"pairingId": "p-1", "id": "r-1", "signature": "0x5e11"}
        })
    );
}

/// **VALUE**: Tests that an origin whose relay never issues a code gives up with an error.
///
/// **WHY THIS MATTERS**: An operator waiting for a code needs a clear failure, not a hang.
///
/// **BUG THIS CATCHES**: Would catch `wait_for_pairing` ignoring its timeout.
#[tokio::test]
async fn given_silent_relay_when_origin_runs_then_returns_core_error() {
    let (listener, config) = bind_relay().await;
    let settings = AgentSettings {
        role: AgentRole::Origin { session_hint: None },
        session: None,
        static_signature: HexBytes::default(),
    };

    let relay = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("agent connects");
        let mut socket = accept_async(stream).await.expect("handshake");
        while let Some(Ok(_)) = socket.next().await {}
    });

    let result = tokio::time::timeout(TEST_WAIT, run(&config, settings, std::future::pending()))
        .await
        .expect("agent gives up in time");

    assert!(matches!(result, Err(AgentError::Core { .. })), "{result:?}");
    relay.abort();
}
