//! Read-only wallet registry and default network lookup
//!
//! Wallet registration and network configuration belong to the backend; this
//! module only caches what the backend reports so addresses can be resolved.

use parking_lot::RwLock;
use uuid::Uuid;

use crate::backend::BackendClient;
use crate::error::{AppError, AppResult};
use crate::models::{NetworkRecord, WalletRecord};

/// Cached wallet list for the active user
#[derive(Default)]
pub struct WalletRegistry {
    wallets: RwLock<Vec<WalletRecord>>,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wallets(wallets: Vec<WalletRecord>) -> Self {
        Self {
            wallets: RwLock::new(wallets),
        }
    }

    /// Replace the cached wallet list
    pub fn replace(&self, wallets: Vec<WalletRecord>) {
        *self.wallets.write() = wallets;
    }

    /// Resolve an address (case-insensitive) to its wallet record
    pub fn resolve(&self, address: &str) -> Option<WalletRecord> {
        self.wallets
            .read()
            .iter()
            .find(|w| w.matches_address(address))
            .cloned()
    }

    pub fn wallets(&self) -> Vec<WalletRecord> {
        self.wallets.read().clone()
    }

    pub fn len(&self) -> usize {
        self.wallets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load the wallet list for a user from the backend
    ///
    /// Fails with a precondition error before any I/O when no user is active.
    pub async fn load_for_user(
        &self,
        client: &BackendClient,
        user_id: Option<Uuid>,
    ) -> AppResult<usize> {
        let user_id = user_id
            .ok_or_else(|| AppError::Precondition("No active user selected".to_string()))?;

        let wallets = client.list_user_wallets(user_id).await?;
        let count = wallets.len();
        self.replace(wallets);

        tracing::info!(%user_id, wallet_count = count, "Wallet registry loaded");
        Ok(count)
    }
}

/// Fetch networks and pick the default network context
pub async fn load_default_network(client: &BackendClient) -> AppResult<Option<NetworkRecord>> {
    let networks = client.list_networks().await?;
    let default = NetworkRecord::select_default(&networks).cloned();

    match &default {
        Some(network) => tracing::info!(
            network = %network.name,
            chain_id = network.chain_id,
            confirmations_required = network.confirmations_required,
            "Default network selected"
        ),
        None => tracing::warn!("Backend reports no blockchain networks"),
    }

    Ok(default)
}
