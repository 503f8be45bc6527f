//! Output formatting for detections

use anyhow::Result;
use prahari_common::ScanEvent;
use std::time::{SystemTime, UNIX_EPOCH};

/// Print one detection in the specified format
pub fn print_event(event: &ScanEvent, format: &str) -> Result<()> {
    // Normalize format string
    let format = format.trim().to_lowercase();
    match format.as_str() {
        "json" | "j" => println!("{}", serde_json::to_string(event)?),
        "text" | "t" | "" => print_text(event),
        _ => {
            eprintln!(
                "Warning: Unknown format '{}', using default text format",
                format
            );
            print_text(event);
        }
    }
    Ok(())
}

fn print_text(event: &ScanEvent) {
    println!(
        "⚠️  {}  (first seen {}s, last seen {}s)  [{}]",
        event,
        unix_secs(event.first_seen),
        unix_secs(event.last_seen),
        event.id
    );
}

fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
