//! The read-only ledger capability the rest of the workspace depends on

use async_trait::async_trait;

use crate::error::ChainError;
use alloy::primitives::{Address, U256};

use crate::types::{BlockRange, ContractKind, EventKind, LogRecord};

/// Read-only queries against the token and voting contracts.
///
/// Implementations must return logs in ledger order (block, then log index)
/// and must treat an empty result as an empty vector rather than an error.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Network identity (EIP-155 chain id)
    async fn chain_id(&self) -> Result<u64, ChainError>;

    /// Current head block number
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// Logs for one voting-contract event over an inclusive block range
    async fn event_logs(
        &self,
        event: EventKind,
        range: BlockRange,
    ) -> Result<Vec<LogRecord>, ChainError>;

    /// Whether the participant is currently serving (not recused or banished)
    async fn status(&self, address: &Address) -> Result<bool, ChainError>;

    /// The current chancellor as recorded by the token contract
    async fn chancellor(&self) -> Result<Address, ChainError>;

    /// `balanceOf(address)` on the given contract
    async fn balance_of(
        &self,
        contract: ContractKind,
        address: &Address,
    ) -> Result<U256, ChainError>;

    /// Votes currently assigned to a participant
    async fn assess_votes(&self, address: &Address) -> Result<U256, ChainError>;

    /// Who the participant currently votes for
    async fn ballot_of(&self, address: &Address) -> Result<Address, ChainError>;

    /// Token amount that must be staked to mint a voting credential
    async fn stake_amount(&self) -> Result<U256, ChainError>;
}
