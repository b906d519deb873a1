use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};

mod atmosphere;
mod cli;
mod config;
mod fleet;
mod geodesy;
mod hazards;
mod http_fetch;
mod proximity;
mod server;
mod snapshots;
mod stats;
mod trajectories;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Cli::parse();
    let config = config::Config::from_env()?;
    let engine = fleet::FleetEngine::new(http_fetch::ReqwestFetch::new()?, config.sources());

    match args.cmd {
        Command::Http { address } => {
            let cache = server::FleetCache::new(engine, config.cache_ttl(), config.request_deadline());
            server::run(address, cache).await;
        }
        Command::Snapshot { pretty } => {
            let payload = tokio::time::timeout(config.request_deadline(), engine.aggregate())
                .await
                .context("Aggregation exceeded the request deadline")??;
            let json = if pretty {
                serde_json::to_string_pretty(&payload)?
            } else {
                serde_json::to_string(&payload)?
            };
            println!("{}", json);
        }
    }

    Ok(())
}
