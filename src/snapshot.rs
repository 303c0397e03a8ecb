//! Deposit snapshot fetching and caching
//!
//! The snapshot is the system of record for the monitored wallet. Every
//! fetch fully replaces the cached set; nothing is merged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::backend::BackendClient;
use crate::error::{AppError, AppResult};
use crate::models::DepositRecord;
use crate::registry::WalletRegistry;

/// Source of authoritative deposit lists
#[async_trait]
pub trait DepositSource: Send + Sync {
    /// Fetch all deposits for the wallet with this address
    async fn fetch_deposits(&self, wallet_address: &str) -> AppResult<Vec<DepositRecord>>;
}

/// Resolves an address through the wallet registry, then pulls its deposits
pub struct SnapshotFetcher {
    client: BackendClient,
    registry: Arc<WalletRegistry>,
}

impl SnapshotFetcher {
    pub fn new(client: BackendClient, registry: Arc<WalletRegistry>) -> Self {
        Self { client, registry }
    }
}

#[async_trait]
impl DepositSource for SnapshotFetcher {
    async fn fetch_deposits(&self, wallet_address: &str) -> AppResult<Vec<DepositRecord>> {
        let wallet = self
            .registry
            .resolve(wallet_address)
            .ok_or_else(|| AppError::NotFound(format!("Wallet {}", wallet_address)))?;

        let deposits = self.client.list_wallet_deposits(wallet.id).await?;

        tracing::debug!(
            wallet_address,
            wallet_id = %wallet.id,
            deposit_count = deposits.len(),
            "Deposit snapshot fetched"
        );

        Ok(deposits)
    }
}

/// Cached copy of the last snapshot
#[derive(Debug, Clone, Default)]
pub struct DepositSnapshot {
    deposits: Vec<DepositRecord>,
    fetched_at: Option<DateTime<Utc>>,
}

impl DepositSnapshot {
    /// Replace the cached set unconditionally
    pub fn replace(&mut self, deposits: Vec<DepositRecord>) {
        self.deposits = deposits;
        self.fetched_at = Some(Utc::now());
    }

    pub fn clear(&mut self) {
        self.deposits.clear();
        self.fetched_at = None;
    }

    pub fn deposits(&self) -> &[DepositRecord] {
        &self.deposits
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn is_empty(&self) -> bool {
        self.deposits.is_empty()
    }

    /// Display lines; an empty snapshot renders the empty-state text
    pub fn render(&self) -> Vec<String> {
        if self.deposits.is_empty() {
            return vec!["No deposits found".to_string()];
        }
        self.deposits.iter().map(|d| d.summary()).collect()
    }
}
