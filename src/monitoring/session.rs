//! Session connection manager
//!
//! Owns one logical push connection for a single wallet address:
//! - handshake with an upper bound
//! - periodic liveness probe while connected
//! - fixed-delay reconnect after loss, indefinitely, while the session is wanted
//! - synchronous teardown through `stop()`
//!
//! All state transitions happen under one lock and are refused once the
//! session's cancellation token fires, so a timer or close event that races
//! with `stop()` can never move the session out of `Disconnected`.
//!
//! Reconnects use a fixed delay with no backoff and no cap. That is fine for a
//! single client but needs jittered backoff before reuse across many sessions.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::SessionConfig;
use crate::constants::protocol;
use crate::error::{AppError, AppResult};
use crate::monitoring::transport::{PushChannel, PushConnector};

/// Push connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    /// Check if transition to new state is valid
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Reconnecting)
                | (Connected, Reconnecting)
                | (Reconnecting, Connecting)
                // Teardown or failed initial handshake
                | (_, Disconnected)
        )
    }

    /// Whether a push connection is wanted in this state
    pub fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConnectionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disconnected" => Ok(ConnectionState::Disconnected),
            "connecting" => Ok(ConnectionState::Connecting),
            "connected" => Ok(ConnectionState::Connected),
            "reconnecting" => Ok(ConnectionState::Reconnecting),
            _ => Err(format!("Unknown connection state: {}", s)),
        }
    }
}

/// Events delivered upward to the session owner, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected,
    /// Inbound application text frame
    Message(String),
    /// Initial handshake failed; the session is now `Disconnected`
    HandshakeFailed(String),
    /// Established connection (or a reconnect handshake) failed
    ConnectionLost(String),
    /// Next attempt scheduled after `delay`
    Reconnecting { delay: Duration },
}

/// State shared between the manager handle and its task
struct SessionShared {
    state: Mutex<ConnectionState>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    cancel: CancellationToken,
}

impl SessionShared {
    /// Apply a transition unless stopped or invalid
    fn transition(&self, next: ConnectionState) -> bool {
        let mut state = self.state.lock();
        if self.cancel.is_cancelled() {
            return false;
        }
        if !state.can_transition_to(next) {
            tracing::warn!(from = %*state, to = %next, "Rejected connection state transition");
            return false;
        }
        tracing::debug!(from = %*state, to = %next, "Connection state transition");
        *state = next;
        publish(&self.state_tx, next);
        true
    }

    /// Cancel and force `Disconnected` under the state lock
    fn shutdown(&self) {
        let mut state = self.state.lock();
        self.cancel.cancel();
        *state = ConnectionState::Disconnected;
        publish(&self.state_tx, ConnectionState::Disconnected);
    }

    /// Forward an event unless stopped
    fn emit(&self, events: &mpsc::UnboundedSender<SessionEvent>, event: SessionEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        events.send(event).is_ok()
    }
}

fn publish(tx: &watch::Sender<ConnectionState>, next: ConnectionState) {
    tx.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        *current = next;
        true
    });
}

/// Handle to one push session
///
/// Single use: `connect` opens the session once; after `stop` a new manager
/// is needed. Dropping the handle stops the session.
pub struct SessionConnectionManager {
    config: SessionConfig,
    connector: Arc<dyn PushConnector>,
    shared: Arc<SessionShared>,
    wallet_address: Option<String>,
    task: Option<JoinHandle<()>>,
}

impl SessionConnectionManager {
    pub fn new(
        config: SessionConfig,
        connector: Arc<dyn PushConnector>,
        state_tx: Arc<watch::Sender<ConnectionState>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            connector,
            shared: Arc::new(SessionShared {
                state: Mutex::new(ConnectionState::Disconnected),
                state_tx,
                cancel,
            }),
            wallet_address: None,
            task: None,
        }
    }

    /// Standalone manager with its own state channel
    pub fn standalone(config: SessionConfig, connector: Arc<dyn PushConnector>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self::new(config, connector, Arc::new(state_tx), CancellationToken::new())
    }

    /// Open the session for `wallet_address`
    ///
    /// Moves to `Connecting` before returning; the handshake runs on a spawned
    /// task. Events arrive on the returned receiver in order.
    pub fn connect(
        &mut self,
        wallet_address: &str,
    ) -> AppResult<mpsc::UnboundedReceiver<SessionEvent>> {
        let wallet_address = wallet_address.trim();
        if wallet_address.is_empty() {
            return Err(AppError::Precondition(
                "Wallet address is required".to_string(),
            ));
        }
        if self.task.is_some() || self.shared.cancel.is_cancelled() {
            return Err(AppError::Precondition(
                "Session already used; create a new one".to_string(),
            ));
        }
        if !self.shared.transition(ConnectionState::Connecting) {
            return Err(AppError::Precondition(format!(
                "Cannot connect from state {}",
                self.state()
            )));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.wallet_address = Some(wallet_address.to_string());

        tracing::info!(wallet_address, "Opening push session");

        self.task = Some(tokio::spawn(run_session(
            self.shared.clone(),
            self.connector.clone(),
            self.config.clone(),
            wallet_address.to_string(),
            events_tx,
        )));

        Ok(events_rx)
    }

    /// Tear the session down from any state
    ///
    /// Cancels pending keepalive and reconnect timers before returning. The
    /// channel, if open, is closed by the session task. Safe to call twice.
    pub fn stop(&self) {
        let was_active = self.state().is_active();
        self.shared.shutdown();
        if was_active {
            tracing::info!(
                wallet_address = self.wallet_address.as_deref().unwrap_or_default(),
                "Push session stopped"
            );
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Whether the session is still wanted (stop not called)
    pub fn is_wanted(&self) -> bool {
        !self.shared.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    pub fn wallet_address(&self) -> Option<&str> {
        self.wallet_address.as_deref()
    }

    /// Wait for the session task to exit (after stop or a failed handshake)
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Session task ended abnormally");
            }
        }
    }
}

impl Drop for SessionConnectionManager {
    fn drop(&mut self) {
        if !self.shared.cancel.is_cancelled() {
            self.shared.shutdown();
        }
    }
}

async fn run_session(
    shared: Arc<SessionShared>,
    connector: Arc<dyn PushConnector>,
    config: SessionConfig,
    wallet_address: String,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let delay = config.reconnect_delay();
    let mut is_reconnect = false;

    loop {
        let handshake = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            result = tokio::time::timeout(config.handshake_timeout(), connector.connect(&wallet_address)) => {
                match result {
                    Ok(inner) => inner,
                    Err(_) => Err(AppError::Transport("handshake timed out".to_string())),
                }
            }
        };

        let mut channel = match handshake {
            Ok(channel) => channel,
            Err(e) if !is_reconnect => {
                tracing::warn!(wallet_address = %wallet_address, error = %e, "Push handshake failed");
                if shared.transition(ConnectionState::Disconnected) {
                    shared.emit(&events, SessionEvent::HandshakeFailed(e.to_string()));
                }
                break;
            }
            Err(e) => {
                tracing::warn!(wallet_address = %wallet_address, error = %e, "Reconnect handshake failed");
                shared.emit(&events, SessionEvent::ConnectionLost(e.to_string()));
                if !schedule_reconnect(&shared, &events, delay).await {
                    break;
                }
                continue;
            }
        };

        if !shared.transition(ConnectionState::Connected) {
            channel.close().await;
            break;
        }
        tracing::info!(wallet_address = %wallet_address, "Push channel connected");
        if !shared.emit(&events, SessionEvent::Connected) {
            channel.close().await;
            break;
        }

        let lost = run_connected(&shared, channel.as_mut(), &config, &events).await;
        channel.close().await;

        let Some(reason) = lost else { break };
        tracing::warn!(wallet_address = %wallet_address, reason = %reason, "Push channel lost");
        shared.emit(&events, SessionEvent::ConnectionLost(reason));

        if !schedule_reconnect(&shared, &events, delay).await {
            break;
        }
        is_reconnect = true;
    }

    // Owner went away without stopping; nothing would consume further events
    if events.is_closed() && !shared.cancel.is_cancelled() {
        shared.shutdown();
    }
    tracing::debug!(wallet_address = %wallet_address, "Session task exited");
}

/// Reconnecting, wait out the fixed delay, then Connecting again
///
/// Returns false if stopped at any point.
async fn schedule_reconnect(
    shared: &SessionShared,
    events: &mpsc::UnboundedSender<SessionEvent>,
    delay: Duration,
) -> bool {
    if !shared.transition(ConnectionState::Reconnecting) {
        return false;
    }
    if !shared.emit(events, SessionEvent::Reconnecting { delay }) {
        shared.shutdown();
        return false;
    }

    tokio::select! {
        biased;
        _ = shared.cancel.cancelled() => return false,
        _ = tokio::time::sleep(delay) => {}
    }

    shared.transition(ConnectionState::Connecting)
}

/// Pump one open channel until it is lost (`Some(reason)`) or stopped (`None`)
async fn run_connected(
    shared: &SessionShared,
    channel: &mut dyn PushChannel,
    config: &SessionConfig,
    events: &mpsc::UnboundedSender<SessionEvent>,
) -> Option<String> {
    let period = config.keepalive_interval();
    let mut keepalive = interval_at(Instant::now() + period, period);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => return None,
            _ = keepalive.tick() => {
                if shared.cancel.is_cancelled() {
                    return None;
                }
                if let Err(e) = channel.send_text(protocol::LIVENESS_PROBE).await {
                    return Some(format!("keepalive send failed: {}", e));
                }
                tracing::trace!("Liveness probe sent");
            }
            frame = channel.recv() => match frame {
                Some(Ok(text)) => {
                    if !shared.emit(events, SessionEvent::Message(text)) {
                        return None;
                    }
                }
                Some(Err(e)) => return Some(e.to_string()),
                None => return Some("channel closed".to_string()),
            },
        }
    }
}
