//! Test helpers for relay integration tests.
//!
//! This module provides a scripted relay:
//! - Accepting client channels and capturing their query string
//! - Sending/receiving JSON envelopes
//! - Closing with relay application codes
//! - Waiting on observable client state

use pairing_core::config::PairingConfig;
use pairing_core::connection::{ClientOptions, PairingStatus, RoleState};

use std::collections::HashMap;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{WebSocketStream, accept_hdr_async};

/// Upper bound for anything a test waits on.
pub const TEST_WAIT: Duration = Duration::from_secs(5);

/// Scripted relay listening on an ephemeral localhost port.
pub struct MockRelay {
    pub url: String,
    connections: mpsc::UnboundedReceiver<RelayConnection>,
}

/// One client channel as seen by the relay.
pub struct RelayConnection {
    pub query: HashMap<String, String>,
    socket: WebSocketStream<TcpStream>,
}

impl MockRelay {
    pub async fn start() -> MockRelay {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock relay");
        let port = listener.local_addr().expect("local addr").port();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let mut uri = None;
                let capture_uri = |request: &Request,
                                   response: Response|
                 -> Result<Response, ErrorResponse> {
                    uri = Some(request.uri().clone());
                    Ok(response)
                };
                let accepted = accept_hdr_async(stream, capture_uri).await;

                let Ok(socket) = accepted else {
                    continue;
                };
                let query = uri
                    .and_then(|uri| uri.query().map(str::to_string))
                    .map(|query| {
                        url::form_urlencoded::parse(query.as_bytes())
                            .into_owned()
                            .collect()
                    })
                    .unwrap_or_default();

                if tx.send(RelayConnection { query, socket }).is_err() {
                    break;
                }
            }
        });

        MockRelay {
            url: format!("ws://127.0.0.1:{port}/pairing/ws"),
            connections: rx,
        }
    }

    /// Next client channel; panics if none arrives in time.
    pub async fn accept(&mut self) -> RelayConnection {
        tokio::time::timeout(TEST_WAIT, self.connections.recv())
            .await
            .expect("No client connected to mock relay")
            .expect("Mock relay stopped")
    }

    /// Whether another client channel arrives within `window`.
    pub async fn has_connection_within(&mut self, window: Duration) -> bool {
        matches!(
            tokio::time::timeout(window, self.connections.recv()).await,
            Ok(Some(_))
        )
    }

    /// Client options pointing at this relay with a long keepalive.
    pub fn options(&self) -> ClientOptions {
        self.options_with(|_| {})
    }

    pub fn options_with(&self, tweak: impl FnOnce(&mut PairingConfig)) -> ClientOptions {
        let mut config = PairingConfig::default();
        config.relay.url = self.url.clone();
        config.keepalive.interval = Duration::from_secs(3600);
        config.timeouts.connect_retry = Duration::from_secs(1);
        tweak(&mut config);
        ClientOptions::try_from(&config).expect("test config is valid")
    }
}

impl RelayConnection {
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub async fn send_json(&mut self, value: Value) {
        self.send_text(value.to_string()).await;
    }

    pub async fn send_text(&mut self, text: impl Into<String>) {
        self.socket
            .send(Message::text(text.into()))
            .await
            .expect("Failed to send frame");
    }

    /// Next JSON frame from the client, skipping control frames.
    pub async fn recv_json(&mut self) -> Value {
        tokio::time::timeout(TEST_WAIT, self.next_json())
            .await
            .expect("No frame received from client")
            .expect("Client closed the channel")
    }

    /// Next JSON frame within `window`, `None` on silence or close.
    pub async fn recv_json_within(&mut self, window: Duration) -> Option<Value> {
        tokio::time::timeout(window, self.next_json())
            .await
            .ok()
            .flatten()
    }

    /// Wait until the client closes the channel.
    pub async fn expect_closed(&mut self) {
        let closed = tokio::time::timeout(TEST_WAIT, async {
            while self.next_json().await.is_some() {}
        })
        .await;
        assert!(closed.is_ok(), "Client did not close the channel");
    }

    pub async fn close_with(&mut self, code: u16, reason: &str) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        let _ = self.socket.close(Some(frame)).await;
    }

    async fn next_json(&mut self) -> Option<Value> {
        while let Some(frame) = self.socket.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    return Some(
                        serde_json::from_str(text.as_str()).expect("Client sent invalid JSON"),
                    );
                }
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => {}
            }
        }
        None
    }
}

/// Wait until the observed state reaches `status`.
pub async fn wait_for_status<S: RoleState>(
    receiver: &mut watch::Receiver<S>,
    status: PairingStatus,
) -> S {
    let reached = receiver.wait_for(|state| state.status() == status);
    let state = tokio::time::timeout(TEST_WAIT, reached)
        .await
        .unwrap_or_else(|_| panic!("Client never reached {status:?}"))
        .expect("Client dropped");
    state.clone()
}

/// Wait until `predicate` holds for the observed state.
pub async fn wait_for_state<S: RoleState>(
    receiver: &mut watch::Receiver<S>,
    predicate: impl FnMut(&S) -> bool,
) -> S {
    let state = tokio::time::timeout(TEST_WAIT, receiver.wait_for(predicate))
        .await
        .expect("Client state never matched")
        .expect("Client dropped");
    state.clone()
}
