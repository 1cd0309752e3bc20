//! Ethereum JSON-RPC implementation of [`ChainReader`]
//!
//! Talks to any EVM node over HTTP through an alloy provider. Contract calls
//! go through the generated bindings; event logs come from `eth_getLogs`,
//! queried in chunks so public endpoints do not reject wide ranges.

use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, Filter};
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use std::future::IntoFuture;
use std::time::Duration;

use crate::contracts::{IDaobiToken, IDaobiVoteContract};
use crate::error::ChainError;
use crate::reader::ChainReader;
use crate::types::{BlockRange, ContractKind, EventKind, LogRecord};

/// Token contract of the local development deployment
pub const LOCAL_TOKEN_CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

/// Voting contract of the local development deployment
pub const LOCAL_VOTING_CONTRACT: &str = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512";

/// Maximum blocks per `eth_getLogs` request
pub const LOG_QUERY_CHUNK_SIZE: u64 = 5000;

/// Default per-request timeout
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`JsonRpcChainReader`]
#[derive(Debug, Clone)]
pub struct RpcReaderConfig {
    /// HTTP JSON-RPC endpoint
    pub rpc_url: String,
    /// Governance token contract
    pub token_contract: Address,
    /// Voting credential contract
    pub voting_contract: Address,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Maximum blocks per log query
    pub log_chunk_size: u64,
}

impl RpcReaderConfig {
    pub fn new(rpc_url: &str, token_contract: Address, voting_contract: Address) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            token_contract,
            voting_contract,
            request_timeout: DEFAULT_RPC_TIMEOUT,
            log_chunk_size: LOG_QUERY_CHUNK_SIZE,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// [`ChainReader`] backed by an HTTP JSON-RPC endpoint
pub struct JsonRpcChainReader {
    provider: DynProvider,
    config: RpcReaderConfig,
}

impl JsonRpcChainReader {
    /// Create a reader; no request is made until the first query
    pub fn new(config: RpcReaderConfig) -> Result<Self, ChainError> {
        let url: Url = config
            .rpc_url
            .parse()
            .map_err(|e| ChainError::InvalidEndpoint(format!("{}: {}", config.rpc_url, e)))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();

        tracing::info!(
            rpc_url = %config.rpc_url,
            token = %config.token_contract,
            voting = %config.voting_contract,
            "Chain reader configured"
        );

        Ok(Self { provider, config })
    }

    pub fn config(&self) -> &RpcReaderConfig {
        &self.config
    }

    fn token(&self) -> IDaobiToken::IDaobiTokenInstance<DynProvider> {
        IDaobiToken::new(self.config.token_contract, self.provider.clone())
    }

    fn voting(&self) -> IDaobiVoteContract::IDaobiVoteContractInstance<DynProvider> {
        IDaobiVoteContract::new(self.config.voting_contract, self.provider.clone())
    }

    /// Run one request under the configured timeout
    async fn timed<F, T, E>(&self, request: F) -> Result<T, ChainError>
    where
        F: IntoFuture<Output = Result<T, E>>,
        ChainError: From<E>,
    {
        match tokio::time::timeout(self.config.request_timeout, request).await {
            Ok(result) => result.map_err(ChainError::from),
            Err(_) => Err(ChainError::Timeout),
        }
    }

    async fn get_logs_chunk(
        &self,
        event: EventKind,
        range: BlockRange,
    ) -> Result<Vec<LogRecord>, ChainError> {
        let filter = Filter::new()
            .address(self.config.voting_contract)
            .event_signature(event.topic())
            .from_block(BlockNumberOrTag::Number(range.from))
            .to_block(BlockNumberOrTag::Number(range.to));

        let logs = self.timed(self.provider.get_logs(&filter)).await?;
        Ok(logs.into_iter().filter_map(LogRecord::from_rpc).collect())
    }
}

#[async_trait]
impl ChainReader for JsonRpcChainReader {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.timed(self.provider.get_chain_id()).await
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        self.timed(self.provider.get_block_number()).await
    }

    async fn event_logs(
        &self,
        event: EventKind,
        range: BlockRange,
    ) -> Result<Vec<LogRecord>, ChainError> {
        let mut all = Vec::new();
        for chunk in range.chunks(self.config.log_chunk_size) {
            let logs = self.get_logs_chunk(event, chunk).await?;
            tracing::debug!(
                event = %event,
                from = chunk.from,
                to = chunk.to,
                count = logs.len(),
                "Fetched log chunk"
            );
            all.extend(logs);
        }
        // Chunks arrive in ascending order; keep (block, index) order explicit
        all.sort_by_key(|l| (l.block_number, l.log_index));
        Ok(all)
    }

    async fn status(&self, address: &Address) -> Result<bool, ChainError> {
        let voting = self.voting();
        self.timed(voting.checkStatus(*address).call()).await
    }

    async fn chancellor(&self) -> Result<Address, ChainError> {
        let token = self.token();
        self.timed(token.chancellor().call()).await
    }

    async fn balance_of(
        &self,
        contract: ContractKind,
        address: &Address,
    ) -> Result<U256, ChainError> {
        match contract {
            ContractKind::Token => {
                let token = self.token();
                self.timed(token.balanceOf(*address).call()).await
            }
            ContractKind::Voting => {
                let voting = self.voting();
                self.timed(voting.balanceOf(*address).call()).await
            }
        }
    }

    async fn assess_votes(&self, address: &Address) -> Result<U256, ChainError> {
        let voting = self.voting();
        let votes = self.timed(voting.assessVotes(*address).call()).await?;
        Ok(U256::from(votes))
    }

    async fn ballot_of(&self, address: &Address) -> Result<Address, ChainError> {
        let voting = self.voting();
        self.timed(voting.seeBallot(*address).call()).await
    }

    async fn stake_amount(&self) -> Result<U256, ChainError> {
        let voting = self.voting();
        self.timed(voting.stake_amount().call()).await
    }
}
