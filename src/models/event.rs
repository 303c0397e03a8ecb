//! Live event models - classified push messages shown in the feed

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::constants::{event_types, AMOUNT_UNIT};
use crate::utils::{format_amount, truncate_hash};

/// Kind of a classified push event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DepositDetected,
    DepositUpdated,
    DepositCompleted,
    DepositOrphaned,
    ConfirmationUpdate,
    /// Unrecognized `type`; kept for visibility, never reconciled
    Unknown,
}

impl EventKind {
    /// Map a wire `type` value to an event kind
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            event_types::DEPOSIT_DETECTED => EventKind::DepositDetected,
            event_types::DEPOSIT_UPDATE => EventKind::DepositUpdated,
            event_types::DEPOSIT_COMPLETED => EventKind::DepositCompleted,
            event_types::DEPOSIT_ORPHANED => EventKind::DepositOrphaned,
            event_types::CONFIRMATION_UPDATE => EventKind::ConfirmationUpdate,
            _ => EventKind::Unknown,
        }
    }

    /// Whether this event implies backend state changed and the snapshot must be re-pulled
    pub fn requires_reconciliation(&self) -> bool {
        !matches!(self, EventKind::Unknown)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::DepositDetected => write!(f, "deposit detected"),
            EventKind::DepositUpdated => write!(f, "deposit update"),
            EventKind::DepositCompleted => write!(f, "deposit completed"),
            EventKind::DepositOrphaned => write!(f, "deposit orphaned"),
            EventKind::ConfirmationUpdate => write!(f, "confirmation update"),
            EventKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Normalized event fields
///
/// Every field is optional on the wire. Accessors return the empty/zero default.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventPayload {
    pub tx_hash: Option<String>,
    pub amount: Option<Decimal>,
    pub confirmations: Option<u64>,
    pub status: Option<String>,
    pub block_number: Option<u64>,
    pub wallet_address: Option<String>,
}

impl EventPayload {
    pub fn tx_hash(&self) -> &str {
        self.tx_hash.as_deref().unwrap_or_default()
    }

    pub fn amount(&self) -> Decimal {
        self.amount.unwrap_or(Decimal::ZERO)
    }

    pub fn confirmations(&self) -> u64 {
        self.confirmations.unwrap_or(0)
    }

    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or_default()
    }

    /// Display line listing only the fields that were present
    pub fn summary(&self) -> String {
        let mut details = Vec::new();

        if let Some(hash) = self.tx_hash.as_deref().filter(|h| !h.is_empty()) {
            details.push(format!("TX: {}", truncate_hash(hash)));
        }
        if let Some(amount) = self.amount {
            details.push(format!("Amount: {} {}", format_amount(amount), AMOUNT_UNIT));
        }
        if let Some(confirmations) = self.confirmations {
            details.push(format!("Confirmations: {}", confirmations));
        }
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            details.push(format!("Status: {}", status));
        }

        details.join(" • ")
    }
}

/// One entry in the live update feed. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveUpdateEntry {
    pub kind: EventKind,
    /// The `type` string as received
    pub event_type: String,
    pub payload: EventPayload,
    /// Client-assigned arrival time, non-decreasing within a session
    pub received_at: DateTime<Utc>,
}

impl LiveUpdateEntry {
    pub fn new(
        event_type: impl Into<String>,
        payload: EventPayload,
        received_at: DateTime<Utc>,
    ) -> Self {
        let event_type = event_type.into();
        Self {
            kind: EventKind::from_type(&event_type),
            event_type,
            payload,
            received_at,
        }
    }

    /// Heading shown for the entry (`deposit_detected` -> `deposit detected`)
    pub fn label(&self) -> String {
        if self.event_type.is_empty() {
            return self.kind.to_string();
        }
        self.event_type.replace('_', " ")
    }

    /// Display line: `HH:MM:SS label - details`
    pub fn render(&self) -> String {
        let details = self.payload.summary();
        let time = self.received_at.format("%H:%M:%S");
        if details.is_empty() {
            format!("{} {}", time, self.label())
        } else {
            format!("{} {} - {}", time, self.label(), details)
        }
    }
}
