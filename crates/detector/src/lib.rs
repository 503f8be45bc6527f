//! Scan Detector - lifecycle orchestration
//!
//! Wires the listener pool to the hit tracker and exposes the
//! start/stop/status surface plus the four-signal notification stream
//! (`started`, `stopped`, `error`, `scan_detected`) the surrounding
//! application consumes.

mod detector;

pub use detector::ScanDetector;
