//! DAObi Dashboard
//!
//! Faction leaderboard for the DAObi governance contracts.
//! Serves the leaderboard over HTTP, or prints it once from the command line.
//! The last computed leaderboard is cached on disk and survives restarts.

use anyhow::{Context, Result};
use chain_reader::{Address, ChainReader, JsonRpcChainReader, ParticipantProfile, RpcReaderConfig};
use clap::{Parser, ValueEnum};
use dashboard_server::{DashboardServer, DEFAULT_HTTP_ADDR};
use leaderboard::{
    FactionSource, LeaderboardView, SledCacheStore, StalenessPolicy, SystemClock, ViewConfig,
    DEFAULT_LOOKBACK_BLOCKS, LOCAL_CHAIN_ID,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod render;

use config::DashboardConfig;

/// Run mode
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Serve the leaderboard over HTTP and keep it fresh
    Serve,
    /// Print the leaderboard once
    Show,
    /// Print one participant's profile
    Profile,
}

/// DAObi faction leaderboard
#[derive(Parser, Debug)]
#[command(name = "daobi-dashboard")]
#[command(about = "Faction leaderboard for the DAObi governance contracts", long_about = None)]
struct Args {
    /// Run mode
    #[arg(long, value_enum, default_value = "serve")]
    mode: Mode,

    /// EVM JSON-RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:8545")]
    rpc_url: String,

    /// Governance token contract address
    #[arg(long, default_value = chain_reader::LOCAL_TOKEN_CONTRACT)]
    token_contract: String,

    /// Voting contract address
    #[arg(long, default_value = chain_reader::LOCAL_VOTING_CONTRACT)]
    voting_contract: String,

    /// Chain id (queried from the node when omitted)
    #[arg(long)]
    chain_id: Option<u64>,

    /// HTTP bind address (serve mode)
    #[arg(long, default_value = DEFAULT_HTTP_ADDR)]
    http_addr: String,

    /// Data directory for the leaderboard cache
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Blocks read behind the head on each refresh
    #[arg(long, default_value_t = DEFAULT_LOOKBACK_BLOCKS)]
    lookback_blocks: u64,

    /// Delay before refreshing after a reported transaction
    #[arg(long, default_value = "3000")]
    confirmation_delay_ms: u64,

    /// Staleness check interval in serve mode (0 = off)
    #[arg(long, default_value = "30")]
    poll_interval_secs: u64,

    /// Do not refresh after reported transactions
    #[arg(long)]
    no_on_demand_update: bool,

    /// Participant address (profile mode)
    #[arg(long)]
    address: Option<String>,

    /// Per-request RPC timeout
    #[arg(long, default_value = "30")]
    rpc_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// JSON config file; replaces the flag values above
    #[arg(long)]
    config: Option<PathBuf>,
}

impl From<&Args> for DashboardConfig {
    fn from(args: &Args) -> Self {
        Self {
            rpc_url: args.rpc_url.clone(),
            token_contract: args.token_contract.clone(),
            voting_contract: args.voting_contract.clone(),
            chain_id: args.chain_id,
            http_addr: args.http_addr.clone(),
            data_dir: args.data_dir.clone(),
            lookback_blocks: args.lookback_blocks,
            confirmation_delay_ms: args.confirmation_delay_ms,
            poll_interval_secs: args.poll_interval_secs,
            on_demand_update: !args.no_on_demand_update,
            rpc_timeout_secs: args.rpc_timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match &args.config {
        Some(path) => DashboardConfig::load(path)?,
        None => DashboardConfig::from(&args),
    };

    match args.mode {
        Mode::Serve => run_serve(config).await,
        Mode::Show => run_show(config).await,
        Mode::Profile => run_profile(config, args.address.as_deref()).await,
    }
}

fn build_reader(config: &DashboardConfig) -> Result<Arc<JsonRpcChainReader>> {
    let token: Address = config
        .token_contract
        .parse()
        .with_context(|| format!("invalid token contract {}", config.token_contract))?;
    let voting: Address = config
        .voting_contract
        .parse()
        .with_context(|| format!("invalid voting contract {}", config.voting_contract))?;

    let reader_config = RpcReaderConfig::new(&config.rpc_url, token, voting)
        .with_request_timeout(Duration::from_secs(config.rpc_timeout_secs));
    Ok(Arc::new(JsonRpcChainReader::new(reader_config)?))
}

/// Configured chain id, else the node's; an unreachable node gets the short TTL
async fn resolve_chain_id(config: &DashboardConfig, reader: &dyn ChainReader) -> u64 {
    if let Some(id) = config.chain_id {
        return id;
    }
    match reader.chain_id().await {
        Ok(id) => {
            tracing::info!("Connected to chain {}", id);
            id
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                fallback = LOCAL_CHAIN_ID,
                "Could not query chain id (pass --chain-id to pin it)"
            );
            LOCAL_CHAIN_ID
        }
    }
}

/// Open the cache and assemble the view
async fn build_view(
    config: &DashboardConfig,
    reader: Arc<dyn ChainReader>,
) -> Result<(LeaderboardView, Arc<SledCacheStore>)> {
    std::fs::create_dir_all(&config.data_dir)?;
    let cache = Arc::new(SledCacheStore::open(config.cache_path())?);

    let chain_id = resolve_chain_id(config, reader.as_ref()).await;
    let staleness = StalenessPolicy::default();
    tracing::info!("  Cache TTL: {:?}", staleness.ttl(chain_id));

    let view_config = ViewConfig {
        chain_id,
        staleness,
        confirmation_delay: Duration::from_millis(config.confirmation_delay_ms),
        on_demand_update: config.on_demand_update,
    };
    let source = FactionSource::new(reader).with_lookback(config.lookback_blocks);
    let view = LeaderboardView::new(source, cache.clone(), Arc::new(SystemClock), view_config);
    Ok((view, cache))
}

/// Serve the leaderboard until Ctrl+C
async fn run_serve(config: DashboardConfig) -> Result<()> {
    tracing::info!("Starting DAObi dashboard");
    tracing::info!("  RPC: {}", config.rpc_url);
    tracing::info!("  Voting contract: {}", config.voting_contract);
    tracing::info!("  HTTP: {}", config.http_addr);
    tracing::info!("  Data directory: {:?}", config.data_dir);

    let reader = build_reader(&config)?;
    let (view, cache) = build_view(&config, reader.clone()).await?;

    // Mount in the background so the server answers with cached data meanwhile
    let mount_view = view.clone();
    let mount = tokio::spawn(async move {
        let outcome = mount_view.mount().await;
        tracing::info!(?outcome, "Leaderboard mounted");
    });

    let ticker = if config.poll_interval_secs > 0 {
        let ticker_view = view.clone();
        let period = Duration::from_secs(config.poll_interval_secs);
        Some(tokio::spawn(async move {
            ticker_view.watch_staleness(period).await;
        }))
    } else {
        None
    };

    tracing::info!("Press Ctrl+C to stop.");

    let server = DashboardServer::new(view.clone(), reader);
    if let Err(e) = server.run(&config.http_addr, shutdown_signal()).await {
        tracing::error!("Dashboard server error: {}", e);
    }

    tracing::info!("Shutting down...");

    view.unmount();
    mount.abort();
    if let Some(ticker) = ticker {
        ticker.abort();
    }

    if let Err(e) = cache.flush() {
        tracing::error!("Failed to flush cache: {}", e);
    }

    tracing::info!("Dashboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
    }
}

/// Print the leaderboard once
async fn run_show(config: DashboardConfig) -> Result<()> {
    let reader = build_reader(&config)?;
    let (view, cache) = build_view(&config, reader).await?;

    let outcome = view.mount().await;
    tracing::debug!(?outcome, "Leaderboard loaded");
    view.unmount();
    cache.flush()?;

    print!("{}", render::render_factions(&view.snapshot()));
    Ok(())
}

/// Print one participant's profile
async fn run_profile(config: DashboardConfig, address: Option<&str>) -> Result<()> {
    let address: Address = address
        .context("--address is required in profile mode")?
        .parse()
        .context("invalid --address")?;

    let reader = build_reader(&config)?;
    let profile = ParticipantProfile::fetch(reader.as_ref(), &address).await?;

    print!("{}", render::render_profile(&profile));
    Ok(())
}
