//! Dashboard Configuration

use anyhow::{Context, Result};
use chain_reader::{LOCAL_TOKEN_CONTRACT, LOCAL_VOTING_CONTRACT};
use dashboard_server::DEFAULT_HTTP_ADDR;
use leaderboard::DEFAULT_LOOKBACK_BLOCKS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Dashboard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// EVM JSON-RPC endpoint
    pub rpc_url: String,
    /// Governance token contract (also records the chancellor)
    pub token_contract: String,
    /// Voting contract (emits `Registered` / `Voted`)
    pub voting_contract: String,
    /// Network identity; queried from the node when absent
    pub chain_id: Option<u64>,
    /// HTTP bind address (serve mode)
    pub http_addr: String,
    /// Directory holding the leaderboard cache
    pub data_dir: PathBuf,
    /// Blocks read behind the head on each refresh
    pub lookback_blocks: u64,
    /// Wait after a reported transaction before refreshing
    pub confirmation_delay_ms: u64,
    /// Periodic staleness check in serve mode (0 = off)
    pub poll_interval_secs: u64,
    /// Refresh automatically after reported transactions
    pub on_demand_update: bool,
    /// Per-request RPC timeout
    pub rpc_timeout_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            token_contract: LOCAL_TOKEN_CONTRACT.to_string(),
            voting_contract: LOCAL_VOTING_CONTRACT.to_string(),
            chain_id: None,
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            data_dir: PathBuf::from("./data"),
            lookback_blocks: DEFAULT_LOOKBACK_BLOCKS,
            confirmation_delay_ms: 3_000,
            poll_interval_secs: 30,
            on_demand_update: true,
            rpc_timeout_secs: 30,
        }
    }
}

impl DashboardConfig {
    /// Read a JSON config file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {:?}", path))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {:?}", path))?;
        Ok(config)
    }

    /// Location of the sled cache inside the data directory
    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join("leaderboard-cache")
    }
}
