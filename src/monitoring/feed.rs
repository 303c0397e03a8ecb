//! Bounded live update feed
//!
//! Display-only log of the most recent classified events. Entries beyond the
//! retention count are discarded permanently; the deposit snapshot remains
//! the system of record.

use std::collections::VecDeque;

use crate::constants::FEED_RETENTION;
use crate::models::LiveUpdateEntry;

/// Text shown when the feed holds no entries
pub const EMPTY_FEED_TEXT: &str = "Waiting for updates...";

/// Most-recent-first ring of live update entries
#[derive(Debug, Clone)]
pub struct LiveUpdateFeed {
    entries: VecDeque<LiveUpdateEntry>,
    retention: usize,
}

impl LiveUpdateFeed {
    /// Create a feed keeping at most `retention` entries (minimum 1)
    pub fn new(retention: usize) -> Self {
        let retention = retention.max(1);
        Self {
            entries: VecDeque::with_capacity(retention),
            retention,
        }
    }

    /// Insert at the head, discarding the oldest entries beyond retention
    pub fn append(&mut self, entry: LiveUpdateEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.retention);
    }

    /// Entries, most recent first
    pub fn entries(&self) -> Vec<LiveUpdateEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&LiveUpdateEntry> {
        self.entries.front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Display lines, most recent first
    pub fn render(&self) -> Vec<String> {
        if self.entries.is_empty() {
            return vec![EMPTY_FEED_TEXT.to_string()];
        }
        self.entries.iter().map(|e| e.render()).collect()
    }
}

impl Default for LiveUpdateFeed {
    fn default() -> Self {
        Self::new(FEED_RETENTION)
    }
}
