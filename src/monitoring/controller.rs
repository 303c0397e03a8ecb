//! Monitoring controller - the user-facing idle/monitoring state machine
//!
//! Binds one wallet address at a time to a push session, primes the deposit
//! snapshot, and routes session events through the reconciler. Connection
//! state is surfaced outward only through this type.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::config::SessionConfig;
use crate::error::{AppError, AppResult};
use crate::models::{DepositRecord, LiveUpdateEntry, NetworkRecord};
use crate::monitoring::feed::LiveUpdateFeed;
use crate::monitoring::reconciler::{refresh_snapshot, Reconciler};
use crate::monitoring::session::{ConnectionState, SessionConnectionManager, SessionEvent};
use crate::monitoring::transport::PushConnector;
use crate::notifications::{NotificationEvent, Notifier};
use crate::snapshot::{DepositSnapshot, DepositSource};

/// The single active monitoring context
struct ActiveSession {
    generation: u64,
    wallet_address: String,
    cancel: CancellationToken,
    /// `None` while the initial snapshot is being fetched
    manager: Option<SessionConnectionManager>,
    pump: Option<JoinHandle<()>>,
}

impl ActiveSession {
    fn teardown(mut self) {
        self.cancel.cancel();
        if let Some(manager) = self.manager.take() {
            manager.stop();
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

pub struct MonitoringController {
    session_config: SessionConfig,
    connector: Arc<dyn PushConnector>,
    source: Arc<dyn DepositSource>,
    notifier: Notifier,
    default_network: RwLock<Option<NetworkRecord>>,
    feed: Arc<RwLock<LiveUpdateFeed>>,
    snapshot: Arc<RwLock<DepositSnapshot>>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    active: Arc<Mutex<Option<ActiveSession>>>,
    generation: AtomicU64,
    last_address: RwLock<Option<String>>,
}

impl MonitoringController {
    pub fn new(
        session_config: SessionConfig,
        feed_retention: usize,
        connector: Arc<dyn PushConnector>,
        source: Arc<dyn DepositSource>,
        notifier: Notifier,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            session_config,
            connector,
            source,
            notifier,
            default_network: RwLock::new(None),
            feed: Arc::new(RwLock::new(LiveUpdateFeed::new(feed_retention))),
            snapshot: Arc::new(RwLock::new(DepositSnapshot::default())),
            state_tx: Arc::new(state_tx),
            active: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
            last_address: RwLock::new(None),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        connector: Arc<dyn PushConnector>,
        source: Arc<dyn DepositSource>,
        notifier: Notifier,
    ) -> Self {
        Self::new(
            config.session.clone(),
            config.feed.retention,
            connector,
            source,
            notifier,
        )
    }

    /// Establish (or clear) the default network context
    pub fn set_default_network(&self, network: Option<NetworkRecord>) {
        *self.default_network.write() = network;
    }

    pub fn default_network(&self) -> Option<NetworkRecord> {
        self.default_network.read().clone()
    }

    /// Start monitoring `address`, replacing any active session
    ///
    /// Preconditions are checked before any I/O. A failed initial snapshot is
    /// reported but does not prevent the push session from opening.
    pub async fn start(&self, address: &str) -> AppResult<()> {
        let address = address.trim().to_string();
        if address.is_empty() {
            return Err(self.precondition("Please enter a wallet address"));
        }
        if self.default_network.read().is_none() {
            return Err(self.precondition("No blockchain network configured"));
        }

        self.stop();

        let cancel = CancellationToken::new();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        {
            let mut active = self.active.lock();
            *active = Some(ActiveSession {
                generation,
                wallet_address: address.clone(),
                cancel: cancel.clone(),
                manager: None,
                pump: None,
            });
        }

        let previous = self.last_address.write().replace(address.clone());
        self.feed.write().clear();
        if previous.is_some_and(|p| !p.eq_ignore_ascii_case(&address)) {
            self.snapshot.write().clear();
        }

        tracing::info!(wallet_address = %address, "Starting deposit monitoring");
        self.notifier.notify(NotificationEvent::MonitoringStarted {
            wallet_address: address.clone(),
        });

        // Failure already surfaced as a notice
        let _ = refresh_snapshot(
            self.source.as_ref(),
            &address,
            &self.snapshot,
            &self.notifier,
            &cancel,
        )
        .await;

        // Stop (or a newer start) cancels our token before touching `active`
        let mut active = self.active.lock();
        if cancel.is_cancelled() {
            tracing::debug!(wallet_address = %address, "Start superseded before session opened");
            return Ok(());
        }
        let Some(session) = active.as_mut() else {
            return Ok(());
        };

        let mut manager = SessionConnectionManager::new(
            self.session_config.clone(),
            self.connector.clone(),
            self.state_tx.clone(),
            cancel.clone(),
        );
        let events = match manager.connect(&address) {
            Ok(events) => events,
            Err(e) => {
                if let Some(session) = active.take() {
                    session.teardown();
                }
                return Err(e);
            }
        };

        let reconciler = Reconciler::new(
            address.clone(),
            self.source.clone(),
            self.feed.clone(),
            self.snapshot.clone(),
            self.notifier.clone(),
            cancel.clone(),
        );
        let pump = tokio::spawn(pump_events(
            events,
            reconciler,
            self.notifier.clone(),
            cancel,
            self.active.clone(),
            generation,
        ));

        session.manager = Some(manager);
        session.pump = Some(pump);
        Ok(())
    }

    /// Stop monitoring; feed and snapshot stay visible. Safe to call repeatedly.
    pub fn stop(&self) {
        let session = self.active.lock().take();
        match session {
            Some(session) => {
                let wallet_address = session.wallet_address.clone();
                session.teardown();
                tracing::info!(wallet_address = %wallet_address, "Deposit monitoring stopped");
                self.notifier.notify(NotificationEvent::MonitoringStopped);
            }
            None => tracing::debug!("Stop requested with no active session"),
        }
    }

    /// Re-fetch the snapshot for the monitored (or last monitored) address
    pub async fn refresh(&self) -> AppResult<usize> {
        let Some(address) = self.monitored_address() else {
            return Err(self.precondition("No wallet is being monitored"));
        };
        let cancel = self
            .active
            .lock()
            .as_ref()
            .map(|s| s.cancel.clone())
            .unwrap_or_default();

        refresh_snapshot(
            self.source.as_ref(),
            &address,
            &self.snapshot,
            &self.notifier,
            &cancel,
        )
        .await
    }

    pub fn is_monitoring(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<NotificationEvent> {
        self.notifier.subscribe()
    }

    /// Address of the active session, or the last one after stop
    pub fn monitored_address(&self) -> Option<String> {
        self.last_address.read().clone()
    }

    pub fn feed_entries(&self) -> Vec<LiveUpdateEntry> {
        self.feed.read().entries()
    }

    pub fn render_feed(&self) -> Vec<String> {
        self.feed.read().render()
    }

    pub fn deposits(&self) -> Vec<DepositRecord> {
        self.snapshot.read().deposits().to_vec()
    }

    pub fn render_deposits(&self) -> Vec<String> {
        self.snapshot.read().render()
    }

    fn precondition(&self, reason: &str) -> AppError {
        tracing::warn!(reason, "Monitoring precondition failed");
        self.notifier.notify(NotificationEvent::PreconditionFailed {
            reason: reason.to_string(),
        });
        AppError::Precondition(reason.to_string())
    }
}

impl Drop for MonitoringController {
    fn drop(&mut self) {
        if let Some(session) = self.active.lock().take() {
            session.teardown();
        }
    }
}

/// Handle session events in arrival order until stopped
async fn pump_events(
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    mut reconciler: Reconciler,
    notifier: Notifier,
    cancel: CancellationToken,
    active: Arc<Mutex<Option<ActiveSession>>>,
    generation: u64,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        if cancel.is_cancelled() {
            break;
        }

        match event {
            SessionEvent::Connected => notifier.notify(NotificationEvent::Connected),
            SessionEvent::Message(text) => {
                reconciler.handle(&text).await;
            }
            SessionEvent::HandshakeFailed(reason) => {
                notifier.notify(NotificationEvent::HandshakeFailed { reason });
                retire_session(&active, generation);
                break;
            }
            SessionEvent::ConnectionLost(reason) => {
                notifier.notify(NotificationEvent::ConnectionError { reason })
            }
            SessionEvent::Reconnecting { delay } => notifier.notify(NotificationEvent::Reconnecting {
                delay_secs: delay.as_secs(),
            }),
        }
    }

    tracing::debug!(
        wallet_address = %reconciler.wallet_address(),
        "Session event pump exited"
    );
}

/// Drop the active session if it is still the one started as `generation`
///
/// A failed initial handshake ends the session for good, so the controller
/// returns to idle instead of reporting a dead session as monitoring.
fn retire_session(active: &Mutex<Option<ActiveSession>>, generation: u64) {
    let session = {
        let mut guard = active.lock();
        if guard.as_ref().is_some_and(|s| s.generation == generation) {
            guard.take()
        } else {
            None
        }
    };
    let Some(mut session) = session else {
        return;
    };

    // Called from the pump itself; detach instead of aborting
    session.pump = None;
    tracing::info!(
        wallet_address = %session.wallet_address,
        "Initial handshake failed, monitoring ended"
    );
    session.teardown();
}
