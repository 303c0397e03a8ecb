//! Deposit models - the backend's record of an observed deposit

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::{deserialize_utc, format_amount, truncate_hash};

/// Deposit lifecycle status as reported by the backend
///
/// ```text
/// PENDING -> CONFIRMING -> COMPLETED
///     |           |
///     +-----------+--> ORPHANED (reorg)
///     +--> FAILED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    /// Seen in a block, not yet confirming
    Pending,
    /// Accumulating confirmations
    Confirming,
    /// Required confirmations reached
    Completed,
    /// Rejected by the backend
    Failed,
    /// Invalidated by a chain reorganization
    Orphaned,
}

impl DepositStatus {
    /// Check if no further transitions are expected
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DepositStatus::Completed | DepositStatus::Failed | DepositStatus::Orphaned
        )
    }
}

impl std::fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepositStatus::Pending => write!(f, "pending"),
            DepositStatus::Confirming => write!(f, "confirming"),
            DepositStatus::Completed => write!(f, "completed"),
            DepositStatus::Failed => write!(f, "failed"),
            DepositStatus::Orphaned => write!(f, "orphaned"),
        }
    }
}

impl std::str::FromStr for DepositStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(DepositStatus::Pending),
            "confirming" => Ok(DepositStatus::Confirming),
            "completed" => Ok(DepositStatus::Completed),
            "failed" => Ok(DepositStatus::Failed),
            "orphaned" => Ok(DepositStatus::Orphaned),
            _ => Err(format!("Unknown deposit status: {}", s)),
        }
    }
}

/// Deposit record returned by `GET /deposits/wallet/{walletId}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositRecord {
    pub id: Uuid,
    pub wallet_id: Uuid,
    #[serde(default)]
    pub blockchain_network_id: Option<Uuid>,
    pub tx_hash: String,
    pub amount: Decimal,
    #[serde(default)]
    pub confirmations: u64,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub from_address: Option<String>,
    pub status: DepositStatus,
    #[serde(deserialize_with = "deserialize_utc")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_utc")]
    pub updated_at: DateTime<Utc>,
}

impl DepositRecord {
    /// One-line display form
    pub fn summary(&self) -> String {
        let block = self
            .block_number
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".to_string());
        let mut line = format!(
            "{} [{}] Amount: {} {} • Confirmations: {} • Block: {} • Detected: {}",
            truncate_hash(&self.tx_hash),
            self.status,
            format_amount(self.amount),
            crate::constants::AMOUNT_UNIT,
            self.confirmations,
            block,
            self.created_at.format("%b %-d %H:%M"),
        );
        if self.status == DepositStatus::Completed {
            line.push_str(&format!(" • Confirmed: {}", self.updated_at.format("%b %-d %H:%M")));
        }
        line
    }
}
