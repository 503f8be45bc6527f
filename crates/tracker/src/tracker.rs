//! Threshold/window evaluation over the hit stream.

use crate::window::HostWindow;
use prahari_common::{Hit, ScanEvent};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Decides, from a stream of hits, when a source host's behavior
/// constitutes a scan.
pub struct HitTracker {
    port_hit_threshold: u32,
    window: Duration,
    hosts: HashMap<IpAddr, HostWindow>,
}

impl HitTracker {
    /// `port_hit_threshold` is clamped to at least 1; a threshold of 1
    /// fires on every single hit, which was the original detector's only
    /// behavior.
    #[must_use]
    pub fn new(port_hit_threshold: u32, window: Duration) -> Self {
        Self {
            port_hit_threshold: port_hit_threshold.max(1),
            window,
            hosts: HashMap::new(),
        }
    }

    /// Feed one hit; returns a `ScanEvent` when this hit pushes its source
    /// over the distinct-port threshold.
    ///
    /// Eviction is lazy: entries older than the window relative to this
    /// hit's timestamp are dropped before the threshold check. Duplicate
    /// (port, timestamp) deliveries are idempotent no-ops. When an event
    /// fires the host's window is removed entirely, so the same hits can
    /// never retrigger (episode boundary).
    pub fn observe(&mut self, hit: &Hit) -> Option<ScanEvent> {
        let window = self
            .hosts
            .entry(hit.source)
            .or_insert_with(|| HostWindow::new(hit.at));

        window.evict_expired(hit.at, self.window);

        if window.contains(hit) {
            trace!(source = %hit.source, port = hit.port, "duplicate hit ignored");
            return None;
        }

        window.push(hit);

        let ports = window.distinct_ports();
        if (ports.len() as u32) < self.port_hit_threshold {
            trace!(
                source = %hit.source,
                distinct = ports.len(),
                threshold = self.port_hit_threshold,
                "below threshold"
            );
            return None;
        }

        let (first_seen, last_seen) = window
            .span()
            .unwrap_or((hit.wall, hit.wall));
        self.hosts.remove(&hit.source);

        debug!(source = %hit.source, ports = ?ports, "scan threshold crossed");
        Some(ScanEvent::new(hit.source, ports, first_seen, last_seen))
    }

    /// Evict hosts with no observations inside the window (bounded memory).
    /// Complements the lazy per-observation eviction: a host that goes
    /// quiet is still dropped.
    pub fn sweep(&mut self, now: Instant) {
        let before = self.hosts.len();
        let window = self.window;
        self.hosts
            .retain(|_, w| now.saturating_duration_since(w.last_seen()) <= window);
        let evicted = before - self.hosts.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.hosts.len(), "swept idle hosts");
        }
    }

    /// Drop all state; called on detector stop.
    pub fn clear(&mut self) {
        self.hosts.clear();
    }

    /// Number of hosts currently tracked.
    #[inline]
    #[must_use]
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }
}
