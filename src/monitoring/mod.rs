//! Real-time deposit monitoring
//!
//! Push session lifecycle, inbound event classification, reconciliation
//! against the deposit snapshot, and the bounded live update feed.

pub mod classifier;
pub mod controller;
pub mod feed;
pub mod reconciler;
pub mod session;
pub mod transport;

pub use classifier::{classify, Classified};
pub use controller::MonitoringController;
pub use feed::{LiveUpdateFeed, EMPTY_FEED_TEXT};
pub use reconciler::{refresh_snapshot, Disposition, Reconciler};
pub use session::{ConnectionState, SessionConnectionManager, SessionEvent};
pub use transport::{PushChannel, PushConnector, WsChannel, WsConnector};
