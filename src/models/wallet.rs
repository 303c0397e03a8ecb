//! Wallet models - read-only view of the wallet registry

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wallet record returned by `GET /wallets/user/{userId}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub id: Uuid,
    pub address: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "blockchain_network_id")]
    pub network_id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl WalletRecord {
    /// Case-insensitive address comparison
    pub fn matches_address(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address.trim())
    }

    /// Label if set, otherwise the address
    pub fn display_name(&self) -> &str {
        match &self.label {
            Some(label) if !label.is_empty() => label,
            _ => &self.address,
        }
    }
}
