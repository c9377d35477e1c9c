//! Reputation & trust core node binary.
//!
//! Starts a node with a replayable RocksDB event log and a JSON-RPC
//! server, then runs the periodic scheduler (authority recompute, path
//! cache sweep, anomaly scan, subscription sweep) until interrupted.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use reputrust_node::rpc::start_rpc_server;
use reputrust_node::{Node, NodeConfig};
use tracing::{error, info};

/// Reputrust node: reputation and trust core for pay-per-request agent networks.
#[derive(Parser, Debug)]
#[command(
    name = "reputrust-node",
    version,
    about = "Reputation and trust core node with RocksDB event log and JSON-RPC server"
)]
struct Args {
    /// Data directory for the event log and config.
    #[arg(long, default_value = None)]
    data_dir: Option<PathBuf>,

    /// RPC server bind address.
    #[arg(long, default_value = "127.0.0.1")]
    rpc_bind: String,

    /// RPC server port.
    #[arg(long, default_value_t = reputrust_node::config::DEFAULT_RPC_PORT)]
    rpc_port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json").
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Seconds between authority (PageRank) recompute passes.
    #[arg(long)]
    authority_interval_secs: Option<u64>,

    /// Seconds between trust-path cache sweeps.
    #[arg(long)]
    path_sweep_interval_secs: Option<u64>,

    /// Seconds between anomaly scans.
    #[arg(long)]
    anomaly_interval_secs: Option<u64>,

    /// Seconds between subscription-expiration sweeps.
    #[arg(long)]
    subscription_sweep_interval_secs: Option<u64>,
}

impl Args {
    /// Layer `from_env()` first so env vars can seed defaults, then the
    /// explicit CLI flags take the final word.
    fn into_config(self) -> anyhow::Result<NodeConfig> {
        let mut config = NodeConfig::from_env()?;

        let default_data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reputrust");
        config.data_dir = self.data_dir.unwrap_or(default_data_dir);
        config.rpc_bind = self.rpc_bind;
        config.rpc_port = self.rpc_port;
        config.log_level = self.log_level;
        config.log_format = self.log_format;

        if let Some(secs) = self.authority_interval_secs {
            config.authority_recompute_interval_secs = secs;
        }
        if let Some(secs) = self.path_sweep_interval_secs {
            config.path_cache_sweep_interval_secs = secs;
        }
        if let Some(secs) = self.anomaly_interval_secs {
            config.anomaly_scan_interval_secs = secs;
        }
        if let Some(secs) = self.subscription_sweep_interval_secs {
            config.subscription_sweep_interval_secs = secs;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = match args.into_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            process::exit(1);
        }
    };

    init_logging(&config.log_level, &config.log_format);

    info!("Reputrust node v{}", env!("CARGO_PKG_VERSION"));
    info!("data_dir: {:?}", config.data_dir);
    info!("rpc_addr: {}", config.rpc_addr());

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        error!("failed to create data_dir: {}", e);
        process::exit(1);
    }

    let node = match Node::new(config.clone()).await {
        Ok(n) => n,
        Err(e) => {
            error!("failed to start node: {}", e);
            process::exit(1);
        }
    };

    info!("node initialized, event log replayed");

    let rpc_handle = match start_rpc_server(&config.rpc_addr(), node.clone()).await {
        Ok(handle) => {
            info!("RPC server listening on {}", config.rpc_addr());
            handle
        }
        Err(e) => {
            error!("failed to start RPC server: {}", e);
            process::exit(1);
        }
    };

    info!("reputrust node running (Ctrl+C to stop)");

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        info!("received Ctrl+C, shutting down...");
    };

    tokio::select! {
        _ = node.run() => {
            info!("node event loop exited");
        }
        _ = shutdown_signal => {
            info!("shutdown signal received");
        }
    }

    rpc_handle.stop().ok();
    info!("RPC server stopped");
    info!("reputrust node shutdown complete");
}

/// Initialize tracing subscriber with the given log level and output format.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
