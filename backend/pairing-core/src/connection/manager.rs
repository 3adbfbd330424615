use crate::config::{KeepaliveConfig, PairingConfig, TimeoutConfig};
use crate::connection::channel::{self, ChannelEnd};
use crate::connection::handler::RoleHandler;
use crate::connection::params::ConnectParams;
use crate::connection::state::{PairingStatus, RoleState};
use crate::error::config::ConfigError;
use crate::protocol::{MessageTag, RelayCloseCode, decode_envelope};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, Weak};
use std::time::Duration;

use log::{debug, info, trace, warn};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use url::Url;

/// Validated settings shared by both pairing clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub relay_url: Url,
    pub keepalive: KeepaliveConfig,
    pub timeouts: TimeoutConfig,
}

impl TryFrom<&PairingConfig> for ClientOptions {
    type Error = ConfigError;

    fn try_from(config: &PairingConfig) -> Result<Self, Self::Error> {
        config.validate()?;

        Ok(Self {
            relay_url: config.relay_url()?,
            keepalive: config.keepalive.clone(),
            timeouts: config.timeouts.clone(),
        })
    }
}

struct ActiveChannel<O> {
    generation: u64,
    outbound: mpsc::UnboundedSender<O>,
    // Dropping this tells the channel task to close the socket.
    _shutdown: oneshot::Sender<()>,
}

/// Owns the single relay channel of one role and its observable state.
pub struct ConnectionManager<H: RoleHandler> {
    relay_url: Url,
    connect_retry: Duration,
    handler: Weak<H>,
    state: watch::Sender<H::State>,
    channel: Mutex<Option<ActiveChannel<H::Outbound>>>,
    keepalive: Mutex<Option<JoinHandle<()>>>,
    generation: AtomicU64,
}

impl<H: RoleHandler> ConnectionManager<H> {
    /// `handler` is the role that owns this manager, usually obtained through
    /// `Arc::new_cyclic`.
    pub fn new(options: &ClientOptions, handler: Weak<H>) -> Self {
        Self {
            relay_url: options.relay_url.clone(),
            connect_retry: options.timeouts.connect_retry,
            handler,
            state: watch::Sender::new(H::State::default()),
            channel: Mutex::new(None),
            keepalive: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Open a channel with `params`.
    ///
    /// Returns `false` without doing anything (beyond a warning) when a
    /// channel is already open. Must be called from within a tokio runtime.
    pub fn connect(&self, params: ConnectParams) -> bool {
        let mut channel = lock(&self.channel);

        if channel.is_some() {
            warn!(
                "{} client already has an open channel, ignoring connect ({params})",
                H::ROLE
            );
            return false;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let url = params.to_url(&self.relay_url);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        info!(
            "{} connecting to {} ({params}) [channel {generation}]",
            H::ROLE,
            self.relay_url
        );

        self.update_state(|state| {
            state.base_mut().transition(PairingStatus::Connecting);
        });

        tokio::spawn(channel::run::<H>(
            url,
            self.connect_retry,
            generation,
            self.handler.clone(),
            outbound_rx,
            shutdown_rx,
        ));

        *channel = Some(ActiveChannel {
            generation,
            outbound: outbound_tx,
            _shutdown: shutdown_tx,
        });
        true
    }

    /// Queue `message` on the open channel.
    ///
    /// Returns `false` when there is no channel; the message is dropped.
    pub fn send(&self, message: H::Outbound) -> bool {
        let channel = lock(&self.channel);

        let Some(active) = channel.as_ref() else {
            debug!(
                "{} client not connected, dropping {}",
                H::ROLE,
                message.tag()
            );
            return false;
        };

        trace!("{} -> {}", H::ROLE, message.tag());
        match active.outbound.send(message) {
            Ok(()) => true,
            Err(e) => {
                debug!(
                    "{} channel {} is gone, dropping {}",
                    H::ROLE,
                    active.generation,
                    e.0.tag()
                );
                false
            }
        }
    }

    /// Whether a channel is open or opening.
    pub fn is_connected(&self) -> bool {
        lock(&self.channel).is_some()
    }

    /// Close the channel (if any) and reset to the initial state.
    pub fn disconnect(&self) {
        if let Some(active) = self.take_channel() {
            info!("{} closing channel {}", H::ROLE, active.generation);
        }
        self.cleanup();
    }

    /// Close the channel and land in `RetryError`.
    ///
    /// Pending work is released exactly as in [`cleanup`](Self::cleanup).
    pub fn fail(&self, reason: &str) {
        warn!("{} connection failed: {reason}", H::ROLE);
        drop(self.take_channel());
        self.reset(PairingStatus::RetryError);
    }

    /// Stop keepalive, release pending work and reset the state to idle.
    ///
    /// Idempotent: a second call just republishes the idle state.
    pub fn cleanup(&self) {
        self.reset(PairingStatus::Idle);
    }

    /// Install the keepalive task, aborting any previous one.
    pub fn start_keepalive(&self, task: JoinHandle<()>) {
        if let Some(previous) = lock(&self.keepalive).replace(task) {
            previous.abort();
        }
    }

    pub fn stop_keepalive(&self) {
        if let Some(task) = lock(&self.keepalive).take() {
            task.abort();
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<H::State> {
        self.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> H::State {
        self.state.borrow().clone()
    }

    /// Mutate the state in place and notify observers.
    ///
    /// `f` runs with the state locked and must not call back into the
    /// manager.
    pub fn update_state<R: Default>(&self, f: impl FnOnce(&mut H::State) -> R) -> R {
        let mut result = None;
        self.state.send_modify(|state| result = Some(f(state)));
        result.unwrap_or_default()
    }

    fn reset(&self, status: PairingStatus) {
        self.stop_keepalive();

        if let Some(handler) = self.handler.upgrade() {
            handler.on_cleanup();
        }

        let mut initial = H::State::default();
        initial.base_mut().status = status;
        self.state.send_replace(initial);
        debug!("{} state reset to {status:?}", H::ROLE);
    }

    fn take_channel(&self) -> Option<ActiveChannel<H::Outbound>> {
        lock(&self.channel).take()
    }

    /// Route one inbound text frame to the role.
    pub(crate) fn dispatch(&self, text: &str) {
        let message = match decode_envelope::<H::Inbound>(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("{} dropping inbound frame: {e}", H::ROLE);
                return;
            }
        };

        let Some(handler) = self.handler.upgrade() else {
            return;
        };

        debug!("{} <- {}", H::ROLE, message.tag());
        let transition = self.update_state(|state| handler.handle_message(message, state));

        if let Some(reply) = transition.reply {
            self.send(reply);
        }
        if let Some(followup) = transition.followup {
            handler.follow_up(followup);
        }
    }

    /// Called by the channel task of `generation` once it stops.
    pub(crate) fn channel_ended(&self, generation: u64, end: ChannelEnd) {
        {
            let mut channel = lock(&self.channel);
            match channel.as_ref() {
                Some(active) if active.generation == generation => {
                    channel.take();
                }
                _ => {
                    debug!("{} channel {generation} ended after being replaced", H::ROLE);
                    return;
                }
            }
        }

        match end {
            ChannelEnd::Closed(Some((code, reason)))
                if RelayCloseCode::from(code).is_rejection() =>
            {
                self.fail(&format!(
                    "relay rejected channel {generation} with {code}: {reason}"
                ));
            }
            ChannelEnd::Closed(frame) => {
                info!(
                    "{} channel {generation} closed by relay ({frame:?})",
                    H::ROLE
                );
                self.cleanup();
            }
            ChannelEnd::OpenFailed(e) => {
                self.fail(&format!("could not open channel {generation}: {e}"));
            }
            ChannelEnd::Errored(e) => {
                warn!("{} channel {generation} errored: {e}", H::ROLE);
                self.cleanup();
            }
        }
    }
}

impl<H: RoleHandler> Drop for ConnectionManager<H> {
    fn drop(&mut self) {
        self.stop_keepalive();
        drop(self.take_channel());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

