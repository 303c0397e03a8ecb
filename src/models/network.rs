//! Blockchain network models - the default network context

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Network record returned by `GET /blockchain-networks/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub id: Uuid,
    pub name: String,
    pub chain_id: u64,
    #[serde(default = "default_confirmations_required")]
    pub confirmations_required: u32,
    #[serde(default)]
    pub block_time: Option<f64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_confirmations_required() -> u32 {
    12
}

fn default_active() -> bool {
    true
}

impl NetworkRecord {
    /// Pick the default network: first active one, else the first listed
    pub fn select_default(networks: &[NetworkRecord]) -> Option<&NetworkRecord> {
        networks
            .iter()
            .find(|n| n.is_active)
            .or_else(|| networks.first())
    }
}
