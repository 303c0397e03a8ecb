//! Applies classified push messages to the feed and the deposit snapshot
//!
//! Every state-changing event re-pulls the authoritative deposit list exactly
//! once. The push stream is a trigger, never a source of truth, so lost,
//! duplicated or reordered events cannot leave the snapshot stale.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::models::{EventKind, LiveUpdateEntry};
use crate::monitoring::classifier::{classify, Classified};
use crate::monitoring::feed::LiveUpdateFeed;
use crate::notifications::{NotificationEvent, Notifier};
use crate::snapshot::{DepositSnapshot, DepositSource};

/// What happened to one inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Liveness reply or handshake ack
    Ignored,
    /// Unparseable frame
    Dropped,
    /// Entry appended, no reconciliation needed
    Recorded,
    /// Entry appended and the snapshot was re-fetched
    Reconciled { refreshed: bool },
    /// Session was stopped before effects could apply
    Cancelled,
}

/// Per-session reconciler bound to one monitored address
pub struct Reconciler {
    wallet_address: String,
    source: Arc<dyn DepositSource>,
    feed: Arc<RwLock<LiveUpdateFeed>>,
    snapshot: Arc<RwLock<DepositSnapshot>>,
    notifier: Notifier,
    cancel: CancellationToken,
    last_received_at: Option<DateTime<Utc>>,
}

impl Reconciler {
    pub fn new(
        wallet_address: impl Into<String>,
        source: Arc<dyn DepositSource>,
        feed: Arc<RwLock<LiveUpdateFeed>>,
        snapshot: Arc<RwLock<DepositSnapshot>>,
        notifier: Notifier,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            wallet_address: wallet_address.into(),
            source,
            feed,
            snapshot,
            notifier,
            cancel,
            last_received_at: None,
        }
    }

    pub fn wallet_address(&self) -> &str {
        &self.wallet_address
    }

    /// Classify one raw frame and apply its effects
    pub async fn handle(&mut self, raw: &str) -> Disposition {
        if self.cancel.is_cancelled() {
            return Disposition::Cancelled;
        }

        let (kind, event_type, payload) = match classify(raw) {
            Classified::LivenessReply | Classified::HandshakeAck => return Disposition::Ignored,
            Classified::Malformed { .. } => return Disposition::Dropped,
            Classified::Event {
                kind,
                event_type,
                payload,
            } => (kind, event_type, payload),
        };

        let received_at = self.next_timestamp();
        let entry = LiveUpdateEntry {
            kind,
            event_type,
            payload,
            received_at,
        };

        tracing::info!(
            wallet_address = %self.wallet_address,
            event_type = %entry.event_type,
            tx_hash = %entry.payload.tx_hash(),
            "Push event received"
        );

        self.feed.write().append(entry.clone());
        self.announce(&entry);

        if !kind.requires_reconciliation() {
            return Disposition::Recorded;
        }

        match refresh_snapshot(
            self.source.as_ref(),
            &self.wallet_address,
            &self.snapshot,
            &self.notifier,
            &self.cancel,
        )
        .await
        {
            Ok(_) => Disposition::Reconciled { refreshed: true },
            Err(_) if self.cancel.is_cancelled() => Disposition::Cancelled,
            Err(_) => Disposition::Reconciled { refreshed: false },
        }
    }

    /// Arrival time, never earlier than the previous entry's
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let at = match self.last_received_at {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_received_at = Some(at);
        at
    }

    fn announce(&self, entry: &LiveUpdateEntry) {
        let payload = &entry.payload;
        let notice = match entry.kind {
            EventKind::DepositDetected => NotificationEvent::DepositDetected {
                amount: payload.amount(),
            },
            EventKind::DepositCompleted => NotificationEvent::DepositCompleted {
                tx_hash: payload.tx_hash().to_string(),
            },
            EventKind::DepositOrphaned => NotificationEvent::DepositOrphaned {
                tx_hash: payload.tx_hash().to_string(),
            },
            EventKind::ConfirmationUpdate => NotificationEvent::ConfirmationsUpdated {
                confirmations: payload.confirmations(),
                status: payload.status().to_string(),
            },
            EventKind::DepositUpdated | EventKind::Unknown => return,
        };
        self.notifier.notify(notice);
    }
}

/// Fetch the authoritative deposit list and replace the cached snapshot
///
/// On failure the previous snapshot is kept and a notice is raised. If the
/// token is cancelled while the fetch is in flight, the result is discarded.
pub async fn refresh_snapshot(
    source: &dyn DepositSource,
    wallet_address: &str,
    snapshot: &RwLock<DepositSnapshot>,
    notifier: &Notifier,
    cancel: &CancellationToken,
) -> AppResult<usize> {
    let result = source.fetch_deposits(wallet_address).await;

    if cancel.is_cancelled() {
        tracing::debug!(wallet_address, "Discarding snapshot fetched after stop");
        return Err(AppError::Internal("session stopped".to_string()));
    }

    match result {
        Ok(deposits) => {
            let count = deposits.len();
            snapshot.write().replace(deposits);
            tracing::debug!(wallet_address, deposit_count = count, "Snapshot replaced");
            Ok(count)
        }
        Err(e) => {
            tracing::warn!(wallet_address, error = %e, reason = e.reason(), "Snapshot fetch failed");
            let notice = match &e {
                AppError::NotFound(_) => NotificationEvent::WalletNotFound {
                    wallet_address: wallet_address.to_string(),
                },
                other => NotificationEvent::SnapshotFailed {
                    reason: other.to_string(),
                },
            };
            notifier.notify(notice);
            Err(e)
        }
    }
}
