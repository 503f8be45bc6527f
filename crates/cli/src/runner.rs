// runner.rs
use anyhow::{Context, Result};
use std::net::IpAddr;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::output::print_event;
use prahari_common::{DetectorOptions, Notification};
use prahari_detector::ScanDetector;
use prahari_ports::PortSet;

pub async fn run_watch(
    ports: String,
    threshold: u32,
    window: u64,
    bind: IpAddr,
    no_banner: bool,
    output_format: String,
) -> Result<()> {
    let port_set = PortSet::parse(&ports).context("Invalid port list")?;
    if port_set.is_empty() {
        warn!("Empty port list: the detector will run but monitor nothing");
    }

    let options = build_options(threshold, window, bind, no_banner);

    info!("Starting detector...");
    info!("Ports: {} ({} total)", port_set, port_set.len());
    info!("Threshold: {} distinct port(s)", options.port_hit_threshold);
    info!("Window: {}s", options.window.as_secs());
    info!("Bind address: {}", options.bind_addr);

    let (detector, mut notifications) = ScanDetector::new(port_set, options);
    detector
        .start()
        .await
        .context("Failed to start the detector")?;

    // Drain notifications until Ctrl-C
    loop {
        tokio::select! {
            maybe = notifications.recv() => match maybe {
                Some(notification) => handle_notification(notification, &output_format)?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, shutting down");
                break;
            }
        }
    }

    detector.stop().await.context("Failed to stop the detector")?;

    // Report whatever arrived between the interrupt and the teardown
    while let Ok(notification) = notifications.try_recv() {
        handle_notification(notification, &output_format)?;
    }
    Ok(())
}

fn handle_notification(notification: Notification, output_format: &str) -> Result<()> {
    match notification {
        Notification::Started => info!("Monitoring started"),
        Notification::Stopped => info!("Monitoring stopped"),
        Notification::Error { message } => error!("Detector error: {}", message),
        Notification::ScanDetected { event } => print_event(&event, output_format)?,
    }
    Ok(())
}

fn build_options(threshold: u32, window: u64, bind: IpAddr, no_banner: bool) -> DetectorOptions {
    let mut options = DetectorOptions::default()
        .with_bind_addr(bind)
        .with_threshold(threshold)
        .with_window(Duration::from_secs(window.max(1)));
    if no_banner {
        options = options.with_banner(None);
    }
    options
}
