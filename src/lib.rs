//! Deposit Watch Library
//!
//! Real-time deposit monitoring client for a single wallet address.
//! This library exposes core modules for testing.

pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod monitoring;
pub mod notifications;
pub mod registry;
pub mod snapshot;
pub mod utils;

// Re-export commonly used types for tests
pub use backend::BackendClient;
pub use config::{AppConfig, ApiConfig, FeedConfig, LoggingConfig, MonitorConfig, SessionConfig};
pub use error::{AppError, AppResult};
pub use models::{
    DepositRecord, DepositStatus, EventKind, EventPayload, LiveUpdateEntry, NetworkRecord,
    WalletRecord,
};
pub use monitoring::{
    classify, Classified, ConnectionState, Disposition, LiveUpdateFeed, MonitoringController,
    PushChannel, PushConnector, Reconciler, SessionConnectionManager, SessionEvent, WsConnector,
};
pub use notifications::{AlertLevel, NotificationEvent, Notifier};
pub use registry::{load_default_network, WalletRegistry};
pub use snapshot::{DepositSnapshot, DepositSource, SnapshotFetcher};
