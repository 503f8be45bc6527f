//! Prahari Common - Shared types and traits
//!
//! This crate provides the data model, error taxonomy, and component seams
//! used across the Prahari scan-detector workspace.

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{PrahariError, PrahariResult};
pub use traits::{ChannelSink, HitSink};
pub use types::{
    DetectorOptions, DetectorState, Hit, Notification, ScanEvent, SCAN_REPLY_BANNER,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
