use crate::connection::handler::RoleHandler;
use crate::error::connection::ConnectionError;
use crate::protocol::MessageTag;

use common::ErrorLocation;

use std::sync::Weak;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

type RelaySocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a channel task stopped on its own.
#[derive(Debug)]
pub(crate) enum ChannelEnd {
    /// Relay sent a close frame (code and reason) or the stream ended.
    Closed(Option<(u16, String)>),
    /// The socket could not be opened within the retry budget.
    OpenFailed(ConnectionError),
    /// Read or write failed mid-session.
    Errored(ConnectionError),
}

/// Body of the per-channel task.
///
/// Returns silently when `shutdown` fires: whoever dropped the sender already
/// cleaned up.
pub(crate) async fn run<H: RoleHandler>(
    url: Url,
    connect_retry: Duration,
    generation: u64,
    handler: Weak<H>,
    mut outbound: mpsc::UnboundedReceiver<H::Outbound>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let socket = tokio::select! {
        opened = open_socket(&url, connect_retry) => opened,
        _ = &mut shutdown => {
            debug!("{} channel {generation} abandoned while opening", H::ROLE);
            return;
        }
    };

    let end = match socket {
        Ok(socket) => {
            info!("{} channel {generation} open", H::ROLE);
            match pump::<H>(socket, generation, &handler, &mut outbound, &mut shutdown).await {
                Some(end) => end,
                None => return,
            }
        }
        Err(e) => {
            error!("{} channel {generation} failed to open: {e}", H::ROLE);
            ChannelEnd::OpenFailed(e)
        }
    };

    if let Some(handler) = handler.upgrade() {
        handler.connection().channel_ended(generation, end);
    }
}

/// Shuttle frames until the socket ends. `None` means local shutdown.
async fn pump<H: RoleHandler>(
    socket: RelaySocket,
    generation: u64,
    handler: &Weak<H>,
    outbound: &mut mpsc::UnboundedReceiver<H::Outbound>,
    shutdown: &mut oneshot::Receiver<()>,
) -> Option<ChannelEnd> {
    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            _ = &mut *shutdown => {
                debug!("{} channel {generation} closing on request", H::ROLE);
                if let Err(e) = write.send(Message::Close(None)).await {
                    debug!("{} close frame not delivered: {e}", H::ROLE);
                }
                let _ = write.close().await;
                return None;
            }

            queued = outbound.recv() => {
                let Some(message) = queued else {
                    return None;
                };

                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        let e = ConnectionError::from(e);
                        error!("{} dropping {}: {e}", H::ROLE, message.tag());
                        continue;
                    }
                };

                if let Err(e) = write.send(Message::text(text)).await {
                    return Some(ChannelEnd::Errored(ConnectionError::Send {
                        message: format!("{} frame not written: {e}", message.tag()),
                        location: ErrorLocation::caller(),
                    }));
                }
            }

            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => dispatch(handler, text.as_str()),
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => dispatch(handler, text),
                    Err(_) => warn!("{} dropping non UTF-8 binary frame", H::ROLE),
                },
                Some(Ok(Message::Close(frame))) => {
                    let frame =
                        frame.map(|frame| (u16::from(frame.code), frame.reason.to_string()));
                    return Some(ChannelEnd::Closed(frame));
                }
                // Control frames are answered by tungstenite.
                Some(Ok(_)) => {}
                Some(Err(e)) => return Some(ChannelEnd::Errored(ConnectionError::from(e))),
                None => return Some(ChannelEnd::Closed(None)),
            }
        }
    }
}

fn dispatch<H: RoleHandler>(handler: &Weak<H>, text: &str) {
    if let Some(handler) = handler.upgrade() {
        handler.connection().dispatch(text);
    }
}

async fn open_socket(url: &Url, connect_retry: Duration) -> Result<RelaySocket, ConnectionError> {
    let mut backoff = ExponentialBackoff {
        max_elapsed_time: Some(connect_retry),
        ..Default::default()
    };

    loop {
        match connect_async(url.as_str()).await {
            Ok((socket, _response)) => return Ok(socket),
            Err(e) => match backoff.next_backoff() {
                Some(delay) => {
                    debug!("Relay connect failed ({e}), retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(ConnectionError::Handshake {
                        message: format!("Relay unreachable at {}: {e}", redacted(url)),
                        location: ErrorLocation::caller(),
                    });
                }
            },
        }
    }
}

/// `url` without its query string, which may carry the auth token.
fn redacted(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_query(None);
    url
}
