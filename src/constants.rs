/// Push channel wire protocol literals (shared with the backend)
///
/// These must match the strings the server sends and expects on `/ws/`.
pub mod protocol {
    /// Outbound liveness probe
    pub const LIVENESS_PROBE: &str = "ping";
    /// Inbound liveness reply
    pub const LIVENESS_REPLY: &str = "pong";
    /// Handshake acknowledgement `type`
    pub const CONNECTED: &str = "connected";
    /// Push endpoint path
    pub const PUSH_PATH: &str = "/ws/";
    /// Query parameter carrying the monitored address
    pub const WALLET_ADDRESS_PARAM: &str = "wallet_address";
}

/// Inbound event `type` values
pub mod event_types {
    pub const DEPOSIT_DETECTED: &str = "deposit_detected";
    pub const DEPOSIT_UPDATE: &str = "deposit_update";
    pub const DEPOSIT_COMPLETED: &str = "deposit_completed";
    pub const DEPOSIT_ORPHANED: &str = "deposit_orphaned";
    pub const CONFIRMATION_UPDATE: &str = "confirmation_update";
}

/// Default session timings
pub mod timings {
    /// Keepalive probe interval (seconds)
    pub const KEEPALIVE_INTERVAL_SECS: u64 = 30;
    /// Fixed delay before a reconnect attempt (seconds)
    pub const RECONNECT_DELAY_SECS: u64 = 5;
    /// Upper bound on the push channel handshake (milliseconds)
    pub const HANDSHAKE_TIMEOUT_MS: u64 = 10_000;
    /// Upper bound on a REST request (milliseconds)
    pub const REQUEST_TIMEOUT_MS: u64 = 10_000;
}

/// Number of entries kept by the live update feed
pub const FEED_RETENTION: usize = 10;

/// Decimal places used when displaying amounts
pub const AMOUNT_DISPLAY_DP: u32 = 6;

/// Currency label used in display strings
pub const AMOUNT_UNIT: &str = "ETH";
