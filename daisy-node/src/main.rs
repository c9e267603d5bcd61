// Copyright © Daisy Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::Parser;
use daisy_config::NodeConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "daisy-node", about = "A deterministic side-chain over a MerkleDAG")]
struct Args {
    /// Path to a YAML config file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run as the chain leader (overrides the config file).
    #[arg(long, conflicts_with = "follower")]
    leader: bool,

    /// Run as a follower (overrides the config file).
    #[arg(long)]
    follower: bool,

    /// Serve the REST façade.
    #[arg(long)]
    api: bool,

    /// Port for the REST façade.
    #[arg(long)]
    api_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    if args.leader {
        config.run_leader = true;
        config.run_follower = false;
    }
    if args.follower {
        config.run_follower = true;
        config.run_leader = false;
    }
    if args.api {
        config.run_api = true;
    }
    if let Some(api_port) = args.api_port {
        config.api_port = api_port;
    }

    let _node = daisy_node::start(config).await?;

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}
