//! Hit Tracker - per-source aggregation and scan decision
//!
//! Consumes the stream of accepted-connection hits and decides when one
//! source's behavior constitutes a scan: at least `port_hit_threshold`
//! distinct ports touched within one trailing window. Windows reset when an
//! event fires (episode boundary), so a burst cannot retrigger from the same
//! hits.
//!
//! The tracker is a plain synchronous struct with no interior locking; the
//! detector funnels all hits through a single consumer task, which is the
//! only owner.

mod tracker;
mod window;

pub use tracker::HitTracker;
pub use window::HostWindow;
