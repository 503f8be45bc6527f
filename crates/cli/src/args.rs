use clap::{Parser, Subcommand};
use std::net::IpAddr;

#[derive(Parser)]
#[command(name = "prahari")]
#[command(version = "0.1.0")]
#[command(about = "A host-based TCP port-scan detector", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Listen on a set of ports and report sources that probe them
    Watch {
        /// Ports to monitor. Example: 21,22,23,80
        #[arg(short, long, required = true)]
        ports: String,

        /// Distinct ports a source must touch within the window to count
        /// as a scan (1 = alert on every connection)
        #[arg(short = 't', long, default_value = "2")]
        threshold: u32,

        /// Window width in seconds
        #[arg(short, long, default_value = "30")]
        window: u64,

        /// Local address to bind the listeners to
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: IpAddr,

        /// Do not write the informational banner to accepted connections
        #[arg(long)]
        no_banner: bool,

        /// Output format for detections: text, json
        #[arg(short, long, default_value = "text")]
        output_format: String,
    },
}
