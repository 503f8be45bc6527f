//! Core data types for the Prahari scan-detection engine.
//!
//! Timing convention: every observation carries both a monotonic `Instant`
//! (drives window arithmetic, immune to wall-clock adjustments) and a
//! `SystemTime` (serde-friendly, used for reporting). Only the wall-clock
//! side ever crosses a serialization boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant, SystemTime};
use uuid::Uuid;

/// Banner written to an accepted probe connection before it is closed.
/// Informational only; the write is best-effort and carries no protocol
/// meaning.
pub const SCAN_REPLY_BANNER: &[u8] = b"<!>PSD<!>";

/// Lifecycle state of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl DetectorState {
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DetectorState::Stopped => "stopped",
            DetectorState::Starting => "starting",
            DetectorState::Running => "running",
            DetectorState::Stopping => "stopping",
        }
    }
}

impl fmt::Display for DetectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted inbound connection attempt, attributed to a source address
/// and the local port that accepted it.
///
/// Created exactly once per accepted connection, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub source: IpAddr,
    pub port: u16,
    /// Monotonic observation time; all window comparisons use this.
    pub at: Instant,
    /// Wall-clock observation time; feeds event timestamps.
    pub wall: SystemTime,
}

impl Hit {
    /// Record a hit observed right now.
    #[inline]
    #[must_use]
    pub fn new(source: IpAddr, port: u16) -> Self {
        Self {
            source,
            port,
            at: Instant::now(),
            wall: SystemTime::now(),
        }
    }

    /// Builder: override both timestamps (window tests manufacture these).
    #[inline]
    #[must_use]
    pub fn with_timestamps(mut self, at: Instant, wall: SystemTime) -> Self {
        self.at = at;
        self.wall = wall;
        self
    }
}

impl fmt::Display for Hit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> :{}", self.source, self.port)
    }
}

/// A detected scan: one source address touching at least the configured
/// number of distinct ports inside one trailing window.
///
/// Immutable once emitted; at most one per episode for a given source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    pub id: Uuid,
    pub source: IpAddr,
    /// Distinct ports involved, sorted ascending.
    pub ports: Vec<u16>,
    pub first_seen: SystemTime,
    pub last_seen: SystemTime,
}

impl ScanEvent {
    #[inline]
    #[must_use]
    pub fn new(
        source: IpAddr,
        ports: Vec<u16>,
        first_seen: SystemTime,
        last_seen: SystemTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            ports,
            first_seen,
            last_seen,
        }
    }

    #[inline]
    #[must_use]
    pub fn port_count(&self) -> usize {
        self.ports.len()
    }
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scan from {} across {} port(s) {:?}",
            self.source,
            self.ports.len(),
            self.ports
        )
    }
}

/// The four outbound signals the engine delivers to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    Started,
    Stopped,
    Error { message: String },
    ScanDetected { event: ScanEvent },
}

impl Notification {
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Notification::Started => "started",
            Notification::Stopped => "stopped",
            Notification::Error { .. } => "error",
            Notification::ScanDetected { .. } => "scan_detected",
        }
    }
}

/// Detector tuning options.
///
/// Fields are `pub` so the listener and tracker read them without accessor
/// overhead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorOptions {
    /// Local address the listeners bind to.
    pub bind_addr: IpAddr,
    /// Minimum distinct ports a source must touch within one window.
    pub port_hit_threshold: u32,
    /// Trailing window width for threshold evaluation.
    pub window: Duration,
    /// Banner written to accepted connections; `None` disables the write.
    pub banner: Option<Vec<u8>>,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port_hit_threshold: 2,
            window: Duration::from_secs(30),
            banner: Some(SCAN_REPLY_BANNER.to_vec()),
        }
    }
}

impl DetectorOptions {
    /// Paranoid preset: any single connection attempt counts as a scan.
    /// This is the historical default behavior of the original detector.
    #[inline]
    #[must_use]
    pub fn paranoid() -> Self {
        Self {
            port_hit_threshold: 1,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_bind_addr(mut self, addr: IpAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.port_hit_threshold = threshold.max(1);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_banner(mut self, banner: Option<Vec<u8>>) -> Self {
        self.banner = banner;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_creation() {
        let src = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));
        let hit = Hit::new(src, 443);
        assert_eq!(hit.source, src);
        assert_eq!(hit.port, 443);
    }

    #[test]
    fn scan_event_ports() {
        let src = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let now = SystemTime::now();
        let event = ScanEvent::new(src, vec![22, 80, 443], now, now);
        assert_eq!(event.port_count(), 3);
        assert_eq!(event.ports, vec![22, 80, 443]);
    }

    #[test]
    fn notification_kinds() {
        assert_eq!(Notification::Started.kind(), "started");
        let err = Notification::Error {
            message: "boom".to_string(),
        };
        assert_eq!(err.kind(), "error");
    }

    #[test]
    fn options_presets() {
        let opts = DetectorOptions::default();
        assert_eq!(opts.port_hit_threshold, 2);
        assert_eq!(opts.window, Duration::from_secs(30));
        assert_eq!(opts.banner.as_deref(), Some(SCAN_REPLY_BANNER));

        let paranoid = DetectorOptions::paranoid();
        assert_eq!(paranoid.port_hit_threshold, 1);
    }

    #[test]
    fn options_threshold_floor() {
        // 0 would make every empty window fire; clamp to 1
        let opts = DetectorOptions::default().with_threshold(0);
        assert_eq!(opts.port_hit_threshold, 1);
    }

    #[test]
    fn notification_serializes_tagged() {
        let json = serde_json::to_string(&Notification::Started).unwrap();
        assert!(json.contains("\"kind\":\"started\""));
    }
}
