//! Node configuration: struct defaults plus an `from_env()` override layer
//! ahead of CLI flags.

use std::path::PathBuf;

use anyhow::Context;
use reputrust_core::constants::ANOMALY_PASS_INTERVAL_SECS;

/// Default JSON-RPC port.
pub const DEFAULT_RPC_PORT: u16 = 8645;

/// Default cadence for the trust-path cache sweep, in seconds.
pub const DEFAULT_PATH_CACHE_SWEEP_INTERVAL_SECS: u64 = 60;

/// Default cadence for the authority (PageRank) recompute pass, in seconds.
pub const DEFAULT_AUTHORITY_RECOMPUTE_INTERVAL_SECS: u64 = 30;

/// Default cadence for the subscription-expiration sweep, in seconds.
pub const DEFAULT_SUBSCRIPTION_SWEEP_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Root directory for all persistent data.
    pub data_dir: PathBuf,
    /// IP address for the JSON-RPC server to bind to.
    pub rpc_bind: String,
    /// Port for the JSON-RPC server.
    pub rpc_port: u16,
    /// Log level filter string (e.g. "info", "debug", "reputrust_node=trace").
    pub log_level: String,
    /// "pretty" or "json".
    pub log_format: String,
    pub authority_recompute_interval_secs: u64,
    pub path_cache_sweep_interval_secs: u64,
    pub anomaly_scan_interval_secs: u64,
    pub subscription_sweep_interval_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reputrust");

        Self {
            data_dir,
            rpc_bind: "127.0.0.1".to_string(),
            rpc_port: DEFAULT_RPC_PORT,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            authority_recompute_interval_secs: DEFAULT_AUTHORITY_RECOMPUTE_INTERVAL_SECS,
            path_cache_sweep_interval_secs: DEFAULT_PATH_CACHE_SWEEP_INTERVAL_SECS,
            anomaly_scan_interval_secs: ANOMALY_PASS_INTERVAL_SECS,
            subscription_sweep_interval_secs: DEFAULT_SUBSCRIPTION_SWEEP_INTERVAL_SECS,
        }
    }
}

impl NodeConfig {
    /// Path to the RocksDB event-log directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("nodedata")
    }

    /// Socket address string for the RPC server.
    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.rpc_bind, self.rpc_port)
    }

    /// Layer environment-variable overrides on top of the defaults. CLI
    /// flags are expected to layer on top of this in turn.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("REPUTRUST_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(bind) = std::env::var("REPUTRUST_RPC_BIND") {
            config.rpc_bind = bind;
        }
        if let Ok(port) = std::env::var("REPUTRUST_RPC_PORT") {
            config.rpc_port = port
                .parse()
                .context("REPUTRUST_RPC_PORT must be a valid port number")?;
        }
        if let Ok(level) = std::env::var("REPUTRUST_LOG_LEVEL") {
            config.log_level = level;
        }
        if let Ok(format) = std::env::var("REPUTRUST_LOG_FORMAT") {
            config.log_format = format;
        }
        if let Ok(secs) = std::env::var("REPUTRUST_AUTHORITY_INTERVAL_SECS") {
            config.authority_recompute_interval_secs = secs
                .parse()
                .context("REPUTRUST_AUTHORITY_INTERVAL_SECS must be an integer")?;
        }
        if let Ok(secs) = std::env::var("REPUTRUST_ANOMALY_INTERVAL_SECS") {
            config.anomaly_scan_interval_secs = secs
                .parse()
                .context("REPUTRUST_ANOMALY_INTERVAL_SECS must be an integer")?;
        }

        Ok(config)
    }
}
