//! Data models for deposits, wallets, networks and live events

pub mod deposit;
pub mod event;
pub mod network;
pub mod wallet;

pub use deposit::{DepositRecord, DepositStatus};
pub use event::{EventKind, EventPayload, LiveUpdateEntry};
pub use network::NetworkRecord;
pub use wallet::WalletRecord;
