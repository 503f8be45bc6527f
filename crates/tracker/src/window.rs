//! Per-source trailing window of observed hits.

use prahari_common::Hit;
use std::collections::BTreeSet;
use std::time::{Duration, Instant, SystemTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HitEntry {
    pub port: u16,
    pub at: Instant,
    pub wall: SystemTime,
}

/// Hits observed from one source address within the active window, oldest
/// first. Owned exclusively by the tracker.
#[derive(Debug, Clone)]
pub struct HostWindow {
    entries: Vec<HitEntry>,
    last_seen: Instant,
}

impl HostWindow {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            entries: Vec::new(),
            last_seen: now,
        }
    }

    /// Drop entries older than `window` relative to `now`.
    pub(crate) fn evict_expired(&mut self, now: Instant, window: Duration) {
        self.entries
            .retain(|e| now.saturating_duration_since(e.at) <= window);
    }

    /// Duplicate delivery check: same (port, timestamp) is an idempotent
    /// no-op.
    pub(crate) fn contains(&self, hit: &Hit) -> bool {
        self.entries
            .iter()
            .any(|e| e.port == hit.port && e.at == hit.at)
    }

    pub(crate) fn push(&mut self, hit: &Hit) {
        self.entries.push(HitEntry {
            port: hit.port,
            at: hit.at,
            wall: hit.wall,
        });
        self.last_seen = hit.at;
    }

    /// Distinct ports currently inside the window, sorted ascending.
    #[must_use]
    pub fn distinct_ports(&self) -> Vec<u16> {
        let set: BTreeSet<u16> = self.entries.iter().map(|e| e.port).collect();
        set.into_iter().collect()
    }

    /// Wall-clock span of the window, `None` while empty.
    #[must_use]
    pub fn span(&self) -> Option<(SystemTime, SystemTime)> {
        let first = self.entries.iter().map(|e| e.wall).min()?;
        let last = self.entries.iter().map(|e| e.wall).max()?;
        Some((first, last))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub(crate) fn last_seen(&self) -> Instant {
        self.last_seen
    }
}
