//! User-visible notices for the monitoring session
//!
//! Notices are broadcast to any number of subscribers (CLI printer, tests):
//! - Monitoring started / stopped
//! - Push channel connected, lost, reconnecting
//! - Deposit lifecycle events
//! - Snapshot failures and precondition warnings

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::utils::{format_amount, truncate_address, truncate_hash};

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Success => write!(f, "SUCCESS"),
            AlertLevel::Info => write!(f, "INFO"),
            AlertLevel::Warning => write!(f, "WARNING"),
            AlertLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Notice types
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    MonitoringStarted { wallet_address: String },
    MonitoringStopped,
    Connected,
    ConnectionError { reason: String },
    Reconnecting { delay_secs: u64 },
    HandshakeFailed { reason: String },
    DepositDetected { amount: Decimal },
    DepositCompleted { tx_hash: String },
    DepositOrphaned { tx_hash: String },
    ConfirmationsUpdated { confirmations: u64, status: String },
    SnapshotFailed { reason: String },
    WalletNotFound { wallet_address: String },
    PreconditionFailed { reason: String },
}

impl NotificationEvent {
    /// Get the alert level for this notice
    pub fn level(&self) -> AlertLevel {
        match self {
            NotificationEvent::MonitoringStarted { .. } => AlertLevel::Success,
            NotificationEvent::Connected => AlertLevel::Success,
            NotificationEvent::DepositCompleted { .. } => AlertLevel::Success,
            NotificationEvent::MonitoringStopped => AlertLevel::Info,
            NotificationEvent::DepositDetected { .. } => AlertLevel::Info,
            NotificationEvent::ConfirmationsUpdated { .. } => AlertLevel::Info,
            NotificationEvent::Reconnecting { .. } => AlertLevel::Warning,
            NotificationEvent::DepositOrphaned { .. } => AlertLevel::Warning,
            NotificationEvent::PreconditionFailed { .. } => AlertLevel::Warning,
            NotificationEvent::ConnectionError { .. } => AlertLevel::Error,
            NotificationEvent::HandshakeFailed { .. } => AlertLevel::Error,
            NotificationEvent::SnapshotFailed { .. } => AlertLevel::Error,
            NotificationEvent::WalletNotFound { .. } => AlertLevel::Error,
        }
    }

    /// Format the notice as a one-line message
    pub fn format_message(&self) -> String {
        match self {
            NotificationEvent::MonitoringStarted { wallet_address } => {
                format!("Monitoring started for {}", truncate_address(wallet_address))
            }
            NotificationEvent::MonitoringStopped => "Monitoring stopped".to_string(),
            NotificationEvent::Connected => "Push channel connected".to_string(),
            NotificationEvent::ConnectionError { reason } => {
                format!("Push channel error: {}", reason)
            }
            NotificationEvent::Reconnecting { delay_secs } => format!(
                "Push channel disconnected. Reconnecting in {}s...",
                delay_secs
            ),
            NotificationEvent::HandshakeFailed { reason } => {
                format!("Failed to connect push channel: {}", reason)
            }
            NotificationEvent::DepositDetected { amount } => {
                format!(
                    "New deposit detected: {} {}",
                    format_amount(*amount),
                    crate::constants::AMOUNT_UNIT
                )
            }
            NotificationEvent::DepositCompleted { tx_hash } => {
                format!("Deposit completed: {}", truncate_hash(tx_hash))
            }
            NotificationEvent::DepositOrphaned { tx_hash } => {
                format!("Deposit orphaned (reorg): {}", truncate_hash(tx_hash))
            }
            NotificationEvent::ConfirmationsUpdated {
                confirmations,
                status,
            } => format!(
                "Confirmations updated: {} (Status: {})",
                confirmations, status
            ),
            NotificationEvent::SnapshotFailed { reason } => {
                format!("Failed to load deposits: {}", reason)
            }
            NotificationEvent::WalletNotFound { wallet_address } => {
                format!("Wallet not found: {}", truncate_address(wallet_address))
            }
            NotificationEvent::PreconditionFailed { reason } => reason.clone(),
        }
    }
}

/// Broadcast hub for notices
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<NotificationEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.tx.subscribe()
    }

    /// Broadcast a notice; subscribers decide how to log or display it
    pub fn notify(&self, event: NotificationEvent) {
        // No subscribers is fine
        let _ = self.tx.send(event);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}
