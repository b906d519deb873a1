use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(about = "Balloon fleet telemetry and hazard correlation.")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the fleet payload over HTTP
    Http {
        #[arg(env = "FLEET_SERVER_ADDRESS", default_value = "127.0.0.1:3000")]
        address: std::net::SocketAddr,
    },
    /// Run one aggregation and print the payload as JSON
    Snapshot {
        #[arg(long)]
        pretty: bool,
    },
}
